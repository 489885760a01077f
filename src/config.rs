//! Configuration types.
//!
//! [`BackendConfig`] locates the hosted backend; [`FeedOptions`] tunes the
//! feed controller. Both use the builder pattern.

use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the backend project URL.
pub const ENV_URL: &str = "SUPABASE_URL";
/// Environment variable holding the public anon key.
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
/// Optional environment variable holding a signed-in user's access token.
pub const ENV_ACCESS_TOKEN: &str = "SUPABASE_ACCESS_TOKEN";

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("Invalid backend URL '{0}': expected http:// or https://")]
    InvalidUrl(String),

    #[error("Page limit must be at least 1")]
    ZeroLimit,
}

/// Where the backend lives and how to authenticate against it.
///
/// # Example
///
/// ```ignore
/// use trendfeed::config::BackendConfig;
///
/// let config = BackendConfig::new("https://abc.supabase.co", "anon-key")?
///     .with_access_token("eyJ...");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Project URL without trailing slash
    pub url: String,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
    /// Signed-in user's JWT; the anon key is used as bearer when absent
    pub access_token: Option<String>,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        Ok(Self {
            url,
            anon_key: anon_key.into(),
            access_token: None,
        })
    }

    /// Set the signed-in user's access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Read `SUPABASE_URL`, `SUPABASE_ANON_KEY` and, if set,
    /// `SUPABASE_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = non_empty_var(ENV_URL).ok_or(ConfigError::MissingVar(ENV_URL))?;
        let key = non_empty_var(ENV_ANON_KEY).ok_or(ConfigError::MissingVar(ENV_ANON_KEY))?;
        let config = Self::new(url, key)?;
        Ok(match non_empty_var(ENV_ACCESS_TOKEN) {
            Some(token) => config.with_access_token(token),
            None => config,
        })
    }

    /// Base of the table API, e.g. `https://abc.supabase.co/rest/v1`.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    /// Realtime socket URL with the API key and protocol version attached.
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.url.clone()
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base,
            urlencoding::encode(&self.anon_key)
        )
    }

    /// Token sent in `Authorization: Bearer`.
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Feed controller tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOptions {
    /// Page size (default: 20)
    pub limit: usize,
    /// Auto-refresh period (default: 60s)
    pub refresh_interval: Duration,
    /// Periodically refresh while a user is signed in (default: true)
    pub auto_refresh: bool,
    /// Warm the provider cache when a user signs in (default: true)
    pub preload: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            auto_refresh: true,
            preload: true,
        }
    }
}

impl FeedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size. Zero is rejected.
    pub fn with_limit(mut self, limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        self.limit = limit;
        Ok(self)
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn with_preload(mut self, enabled: bool) -> Self {
        self.preload = enabled;
        self
    }

    /// Auto-refresh runs only when enabled with a non-zero period.
    pub fn auto_refresh_period(&self) -> Option<Duration> {
        (self.auto_refresh && !self.refresh_interval.is_zero()).then_some(self.refresh_interval)
    }
}
