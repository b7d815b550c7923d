//! # In-Memory Store
//!
//! One implementation of every storage contract, backed by
//! `parking_lot::RwLock` maps. Locks are non-poisonable and never held
//! across await points; every read-modify-write (notably the versioned
//! catalogue update) runs as one unit under a single write lock.
//!
//! State is process-local and lost on restart, which is fine for tests and
//! single-node deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::catalog::{Filters, Metadata, Movie};
use crate::identity::{Permissions, User};
use crate::store::{CatalogStore, PermissionStore, StoreError, TokenStore, UserStore};
use crate::token::{Token, TokenScope};

#[derive(Debug, Clone)]
struct TokenRow {
    hash: [u8; 32],
    user_id: Uuid,
    expiry: DateTime<Utc>,
    scope: TokenScope,
}

/// In-memory backing store for users, tokens, permissions, and the catalogue.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tokens: RwLock<Vec<TokenRow>>,
    permissions: RwLock<HashMap<Uuid, Vec<String>>>,
    movies: RwLock<HashMap<i64, Movie>>,
    next_movie_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_movie_id: AtomicI64::new(1),
            ..Self::default()
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_for_token(&self, scope: TokenScope, hash: [u8; 32]) -> Result<User, StoreError> {
        let now = Utc::now();
        let user_id = self
            .tokens
            .read()
            .iter()
            .find(|row| row.hash == hash && row.scope == scope && row.expiry > now)
            .map(|row| row.user_id)
            .ok_or(StoreError::NotFound)?;
        self.users
            .read()
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, token: &Token) -> Result<(), StoreError> {
        self.tokens.write().push(TokenRow {
            hash: token.hash,
            user_id: token.user_id,
            expiry: token.expiry,
            scope: token.scope,
        });
        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: Uuid,
    ) -> Result<(), StoreError> {
        self.tokens
            .write()
            .retain(|row| !(row.scope == scope && row.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn permissions_for_user(&self, user_id: Uuid) -> Result<Permissions, StoreError> {
        Ok(self
            .permissions
            .read()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect())
    }

    async fn grant(&self, user_id: Uuid, codes: &[&str]) -> Result<(), StoreError> {
        let mut permissions = self.permissions.write();
        let granted = permissions.entry(user_id).or_default();
        for code in codes {
            if !granted.iter().any(|c| c == code) {
                granted.push((*code).to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_movie(&self, movie: &mut Movie) -> Result<(), StoreError> {
        movie.id = self.next_movie_id.fetch_add(1, Ordering::Relaxed);
        movie.created_at = Utc::now();
        movie.version = 1;
        self.movies.write().insert(movie.id, movie.clone());
        Ok(())
    }

    async fn get_movie(&self, id: i64) -> Result<Movie, StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        self.movies
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_movies(
        &self,
        title: &str,
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata), StoreError> {
        let needle = title.to_lowercase();
        let mut matches: Vec<Movie> = self
            .movies
            .read()
            .values()
            .filter(|m| needle.is_empty() || m.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        // Primary order from the safelisted sort value, id ascending as the
        // tiebreak either way.
        let descending = filters.sort_descending();
        matches.sort_by(|a, b| {
            let primary = match filters.sort_column() {
                "title" => a.title.cmp(&b.title),
                "year" => a.year.cmp(&b.year),
                "runtime" => a.runtime.cmp(&b.runtime),
                _ => a.id.cmp(&b.id),
            };
            let primary = if descending { primary.reverse() } else { primary };
            primary.then(a.id.cmp(&b.id))
        });

        let total = matches.len();
        let page: Vec<Movie> = matches
            .into_iter()
            .skip(filters.offset())
            .take(filters.limit())
            .collect();

        Ok((
            page,
            Metadata::calculate(total, filters.page, filters.page_size),
        ))
    }

    async fn update_movie(
        &self,
        movie: &Movie,
        expected_version: i32,
    ) -> Result<Movie, StoreError> {
        // Check-and-swap under one write lock: the vanished-row and
        // stale-version cases are both zero rows affected, so both are
        // conflicts.
        let mut movies = self.movies.write();
        let existing = movies.get_mut(&movie.id).ok_or(StoreError::EditConflict)?;
        if existing.version != expected_version {
            return Err(StoreError::EditConflict);
        }
        existing.title = movie.title.clone();
        existing.year = movie.year;
        existing.runtime = movie.runtime;
        existing.genres = movie.genres.clone();
        existing.version += 1;
        Ok(existing.clone())
    }

    async fn delete_movie(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }
        match self.movies.write().remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}
