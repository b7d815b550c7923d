//! # Storage Contracts
//!
//! Typed CRUD contracts the API layer collaborates with. Persistence itself
//! is out of scope here: implementations may be in-memory ([`crate::memory`])
//! or a real database, but the not-found / conflict signals are part of the
//! contract either way.
//!
//! Callers impose deadlines with `tokio::time::timeout`; implementations must
//! stay cancel-safe (no lock held across await).

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{Filters, Metadata, Movie};
use crate::identity::{Permissions, User};
use crate::token::{Token, TokenScope};

/// Storage outcomes the API layer classifies exactly once at its boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The row looked up by id (or token digest) does not exist, is expired,
    /// or carries the wrong scope.
    #[error("record not found")]
    NotFound,
    /// A versioned update affected zero rows: the resource vanished or the
    /// observed version is stale. Deliberately indistinguishable.
    #[error("edit conflict")]
    EditConflict,
    /// Uniqueness violation on the email column.
    #[error("duplicate email")]
    DuplicateEmail,
    /// Anything else the backend reports. The message is logged server-side
    /// and never shown to clients.
    #[error("storage failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Duplicate email → [`StoreError::DuplicateEmail`].
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Update an existing user row by id. Missing → [`StoreError::NotFound`].
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Resolve the owner of an unexpired token with the given digest and
    /// scope. Unknown digest, expired token, or wrong scope all yield
    /// [`StoreError::NotFound`] — never a different identity.
    async fn get_for_token(&self, scope: TokenScope, hash: [u8; 32]) -> Result<User, StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, token: &Token) -> Result<(), StoreError>;

    /// Delete every token of `scope` owned by `user_id`, regardless of
    /// expiry. Deleting zero rows is not an error.
    async fn delete_all_for_user(&self, scope: TokenScope, user_id: Uuid)
        -> Result<(), StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn permissions_for_user(&self, user_id: Uuid) -> Result<Permissions, StoreError>;

    async fn grant(&self, user_id: Uuid, codes: &[&str]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a new entry, assigning its id and setting `version` to 1.
    async fn insert_movie(&self, movie: &mut Movie) -> Result<(), StoreError>;

    async fn get_movie(&self, id: i64) -> Result<Movie, StoreError>;

    /// List entries whose title contains `title` (case-insensitive), ordered
    /// by id, paginated by `filters`. Metadata counts all matching rows.
    async fn list_movies(
        &self,
        title: &str,
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata), StoreError>;

    /// Versioned update: precondition `(id, expected_version)`. Zero rows
    /// affected → [`StoreError::EditConflict`]. On success the stored
    /// version increments and the updated entry is returned.
    async fn update_movie(&self, movie: &Movie, expected_version: i32)
        -> Result<Movie, StoreError>;

    /// Id-only delete. Missing → [`StoreError::NotFound`].
    async fn delete_movie(&self, id: i64) -> Result<(), StoreError>;
}
