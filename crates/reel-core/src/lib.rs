//! # reel-core — Domain Layer for the Reel Catalogue API
//!
//! HTTP-free building blocks shared by the API service:
//!
//! - [`token`] — opaque bearer credentials (random plaintext + SHA-256 digest)
//! - [`identity`] — users, the anonymous sentinel, and permission sets
//! - [`password`] — argon2id password hashing and verification
//! - [`validator`] — field-level validation collecting a `field → message` map
//! - [`catalog`] — versioned catalogue entries and their pagination filters
//! - [`store`] — storage contracts with typed not-found/conflict signals
//! - [`memory`] — in-memory implementation of every storage contract
//!
//! Nothing in this crate knows about axum, requests, or status codes.
//! The API layer classifies [`store::StoreError`] values exactly once at
//! its boundary.

pub mod catalog;
pub mod identity;
pub mod memory;
pub mod password;
pub mod store;
pub mod token;
pub mod validator;

pub use catalog::{Filters, Metadata, Movie, Runtime};
pub use identity::{Identity, Permissions, User};
pub use memory::MemoryStore;
pub use store::{CatalogStore, PermissionStore, StoreError, TokenStore, UserStore};
pub use token::{Token, TokenScope};
pub use validator::Validator;
