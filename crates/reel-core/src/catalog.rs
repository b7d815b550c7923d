//! # Catalogue Entries
//!
//! Movies are the versioned resource guarded by optimistic locking: every
//! successful update increments `version`, and an update must present the
//! version it last observed or receive an edit conflict from the store.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::validator::{unique, Validator};

/// Runtime in minutes. Travels over the wire as the string `"<n> mins"`,
/// in both directions; a bare number or any other shape is rejected on
/// input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.strip_suffix(" mins")
            .and_then(|n| n.parse::<i32>().ok())
            .map(Runtime)
            .ok_or_else(|| DeError::custom("invalid runtime format"))
    }
}

/// A catalogue entry. `version` starts at 1 on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
    pub version: i32,
}

impl Movie {
    /// Apply a partial update, leaving absent fields untouched.
    pub fn apply_partial(
        &mut self,
        title: Option<String>,
        year: Option<i32>,
        runtime: Option<Runtime>,
        genres: Option<Vec<String>>,
    ) {
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(year) = year {
            self.year = year;
        }
        if let Some(runtime) = runtime {
            self.runtime = runtime;
        }
        if let Some(genres) = genres {
            self.genres = genres;
        }
    }
}

pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= 500,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(movie.year >= 1888, "year", "must be greater than 1888");
    v.check(
        movie.year <= Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(movie.runtime.minutes() != 0, "runtime", "must be provided");
    v.check(
        movie.runtime.minutes() > 0,
        "runtime",
        "must be a positive integer",
    );

    v.check(!movie.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        movie.genres.len() <= 5,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        unique(&movie.genres),
        "genres",
        "must not contain duplicate values",
    );
}

// ── Listing filters ─────────────────────────────────────────────────────────

/// Sort values a listing accepts: a column name, optionally prefixed with
/// `-` for descending order. Anything else fails validation before it
/// reaches a store.
pub const SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

/// Pagination and sort parameters for catalogue listings.
#[derive(Debug, Clone)]
pub struct Filters {
    pub page: usize,
    pub page_size: usize,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: "id".to_string(),
        }
    }
}

impl Filters {
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page >= 1, "page", "must be greater than zero");
        v.check(self.page <= 10_000_000, "page", "must be a maximum of 10 million");
        v.check(self.page_size >= 1, "page_size", "must be greater than zero");
        v.check(self.page_size <= 100, "page_size", "must be a maximum of 100");
        v.check(
            SORT_SAFELIST.contains(&self.sort.as_str()),
            "sort",
            "invalid sort value",
        );
    }

    /// The column to order by, descending marker stripped.
    pub fn sort_column(&self) -> &str {
        self.sort.strip_prefix('-').unwrap_or(&self.sort)
    }

    pub fn sort_descending(&self) -> bool {
        self.sort.starts_with('-')
    }

    pub fn limit(&self) -> usize {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }
}

/// Pagination metadata for a listing response. `total_records` is the true
/// filtered row count, so it stays correct when results span multiple pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: usize,
    pub page_size: usize,
    pub first_page: usize,
    pub last_page: usize,
    pub total_records: usize,
}

impl Metadata {
    pub fn calculate(total_records: usize, page: usize, page_size: usize) -> Metadata {
        if total_records == 0 {
            return Metadata::default();
        }
        Metadata {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size),
            total_records,
        }
    }
}
