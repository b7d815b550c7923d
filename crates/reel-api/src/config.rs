//! Runtime configuration, read from the environment at startup.

use std::env;
use std::time::Duration;

use crate::middleware::rate_limit::RateLimitConfig;

/// How often the rate limiter sweeps idle clients.
pub const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Deployment environment name, surfaced by the healthcheck.
    pub environment: String,
    /// TCP port to bind.
    pub port: u16,
    /// Rate limiter settings.
    pub limiter: RateLimitConfig,
    /// Origins allowed for cross-origin requests.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            port: 4000,
            limiter: RateLimitConfig::default(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            environment: env::var("REEL_ENV").unwrap_or_else(|_| "dev".to_string()),
            port: parsed("PORT").unwrap_or(4000),
            limiter: RateLimitConfig {
                enabled: parsed("LIMITER_ENABLED").unwrap_or(defaults.enabled),
                rps: parsed("LIMITER_RPS").unwrap_or(defaults.rps),
                burst: parsed("LIMITER_BURST").unwrap_or(defaults.burst),
                idle_after: defaults.idle_after,
            },
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| raw.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.parse().ok())
}
