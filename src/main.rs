use std::sync::Arc;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use trendfeed::adapters::ReqwestHttpClient;
use trendfeed::config::{BackendConfig, FeedOptions};
use trendfeed::feed::{FeedController, FeedState};
use trendfeed::logging;
use trendfeed::provider::SupabaseFeedProvider;
use trendfeed::realtime::{FeedRealtime, RealtimeSnapshot};
use trendfeed::recommendations::{Recommendations, DEFAULT_RECOMMENDATION_LIMIT};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: trendfeed <user-id>

Environment:
  SUPABASE_URL           project URL
  SUPABASE_ANON_KEY      public anon key
  SUPABASE_ACCESS_TOKEN  signed-in user's JWT (optional)
  RUST_LOG               log filter (default: trendfeed=info)";

fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("trendfeed {}", VERSION);
        return Ok(());
    }
    if std::env::args().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    color_eyre::install()?;
    logging::init_tracing();

    let user_id = std::env::args()
        .nth(1)
        .filter(|arg| !arg.trim().is_empty())
        .ok_or_else(|| eyre!("missing user id\n\n{}", USAGE))?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(user_id))
}

async fn run(user_id: String) -> Result<()> {
    let backend = BackendConfig::from_env().wrap_err("reading backend configuration")?;
    let provider = Arc::new(SupabaseFeedProvider::new(
        ReqwestHttpClient::new(),
        backend.clone(),
    ));

    let controller = FeedController::new(provider.clone(), FeedOptions::default());
    let mut feed_rx = controller.subscribe();
    controller.set_user(Some(user_id.clone())).await;
    log_feed(&controller.state());

    let recommendations = Recommendations::mount(
        provider,
        Some(user_id.clone()),
        DEFAULT_RECOMMENDATION_LIMIT,
    )
    .await;
    let recs = recommendations.state();
    match recs.error {
        Some(error) => warn!(error = %error, "Recommendations unavailable"),
        None => info!(count = recs.recommendations.len(), "Recommendations loaded"),
    }

    let realtime = match FeedRealtime::connect(&backend, &user_id).await {
        Ok(realtime) => Some(realtime),
        Err(e) => {
            warn!(error = %e, "Realtime unavailable, polling only");
            None
        }
    };
    let mut realtime_rx = realtime.as_ref().map(FeedRealtime::watch);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = feed_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = feed_rx.borrow_and_update().clone();
                if !state.is_busy() {
                    log_feed(&state);
                }
            }
            changed = next_snapshot(realtime_rx.as_mut()) => match changed {
                Some(snapshot) => log_realtime(&snapshot),
                None => {
                    warn!("Realtime listener stopped");
                    realtime_rx = None;
                }
            },
        }
    }

    drop(realtime);
    controller.set_user(None).await;
    Ok(())
}

/// Next realtime snapshot, `None` once the listener is gone. Pends forever
/// without a listener.
async fn next_snapshot(rx: Option<&mut watch::Receiver<RealtimeSnapshot>>) -> Option<RealtimeSnapshot> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

fn log_feed(state: &FeedState) {
    if let Some(error) = &state.error {
        warn!(error = %error, posts = state.posts.len(), "Feed error");
    }
    if let Some(composition) = state.feed_composition() {
        info!(
            posts = state.posts.len(),
            mutual_friends = composition.mutual_friends,
            following = composition.following,
            own = composition.own,
            trending = composition.trending,
            competitions = composition.competitions,
            has_more = state.has_more,
            "Feed composition"
        );
    }
}

fn log_realtime(snapshot: &RealtimeSnapshot) {
    match snapshot.updates.first() {
        Some(latest) => info!(
            connected = snapshot.connected,
            buffered = snapshot.updates.len(),
            latest = %latest.id,
            "Realtime update"
        ),
        None => info!(connected = snapshot.connected, "Realtime status"),
    }
}
