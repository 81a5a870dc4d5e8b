//! Database layer for media-dl
//!
//! Handles SQLite persistence for host preferences that survive restarts.
//! Job state itself is never persisted.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`preferences`] - Last-used destination and stream selection

use sqlx::sqlite::SqlitePool;

mod migrations;
mod preferences;

pub use preferences::Selection;

/// Database handle for media-dl
pub struct Database {
    pool: SqlitePool,
}
