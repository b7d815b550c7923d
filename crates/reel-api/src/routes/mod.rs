//! HTTP handlers, grouped by resource.

pub mod movies;
pub mod ops;
pub mod tokens;
pub mod users;
