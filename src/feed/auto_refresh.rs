//! Periodic background refresh bound to an explicit lifetime.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// A running refresh timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct AutoRefresh {
    handle: JoinHandle<()>,
    period: Duration,
}

impl AutoRefresh {
    /// Call `tick` every `period`, first after one full period. The timer
    /// ends on its own when `tick` returns `None`, e.g. because its owner
    /// is gone. Ticks never overlap; a slow tick delays the next one.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Option<Fut> + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match tick() {
                    Some(work) => work.await,
                    None => break,
                }
            }
            debug!("Auto-refresh timer ended");
        });
        Self { handle, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {}
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(period: Duration, limit: Option<usize>) -> (AutoRefresh, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let timer = AutoRefresh::spawn(period, move || {
            if limit.is_some_and(|max| counter.load(Ordering::SeqCst) >= max) {
                return None;
            }
            let counter = counter.clone();
            Some(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        (timer, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let (_timer, ticks) = counting(Duration::from_secs(60), None);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticks() {
        let (timer, ticks) = counting(Duration::from_secs(10), None);
        tokio::time::sleep(Duration::from_secs(11)).await;
        timer.stop();

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ends_when_tick_declines() {
        let (timer, ticks) = counting(Duration::from_secs(1), Some(2));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!timer.is_running());
        assert_eq!(timer.period(), Duration::from_secs(1));
    }
}
