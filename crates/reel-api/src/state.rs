//! Shared application state handed to every handler.

use std::sync::Arc;

use reel_core::{CatalogStore, MemoryStore, PermissionStore, TokenStore, UserStore};

use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer};
use crate::middleware::{ApiMetrics, RateLimiter};
use crate::tasks::TaskTracker;

/// Everything a handler needs, cloneable per request. The store fields are
/// trait objects so tests and the binary can wire different backends.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub mailer: Arc<dyn Mailer>,
    pub metrics: ApiMetrics,
    pub tasks: TaskTracker,
    pub limiter: RateLimiter,
}

impl AppState {
    /// Build state over a single in-memory store backing all four store
    /// roles, with a logging mailer.
    pub fn new(config: AppConfig) -> Self {
        Self::with_mailer(config, Arc::new(LogMailer::new()))
    }

    /// Like [`AppState::new`], with the delivery collaborator injectable.
    pub fn with_mailer(config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(config.limiter.clone());
        Self {
            config: Arc::new(config),
            users: store.clone(),
            tokens: store.clone(),
            permissions: store.clone(),
            catalog: store,
            mailer,
            metrics: ApiMetrics::new(),
            tasks: TaskTracker::new(),
            limiter,
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use chrono::Utc;
    use reel_core::{password, User};
    use uuid::Uuid;

    use super::*;

    /// Password shared by all seeded test accounts.
    pub const TEST_PASSWORD: &str = "pa55word1234";

    pub fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            name: "Alice Example".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            activated: true,
        }
    }

    /// Fresh state with one activated account holding `catalog:read`.
    pub async fn seeded_state() -> (AppState, User) {
        let state = AppState::new(AppConfig::default());
        let mut user = test_user();
        user.password_hash = password::hash(TEST_PASSWORD).unwrap();
        state.users.insert_user(&user).await.unwrap();
        state.permissions.grant(user.id, &["catalog:read"]).await.unwrap();
        (state, user)
    }
}
