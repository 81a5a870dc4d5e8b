//! Host preferences: last-used destination and stream selection.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

const LAST_DESTINATION: &str = "last_destination";
const LAST_VIDEO_SELECTOR: &str = "last_video_selector";
const LAST_AUDIO_SELECTOR: &str = "last_audio_selector";

/// Last stream selection made by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Video stream identifier, or `"none"` for audio only
    pub video_selector: String,
    /// Audio stream identifier
    pub audio_selector: String,
}

impl Database {
    /// Destination the user picked last, if any
    pub async fn last_destination(&self) -> Result<Option<String>> {
        self.get_preference(LAST_DESTINATION).await
    }

    /// Remember the destination the user picked
    pub async fn set_last_destination(&self, destination: &str) -> Result<()> {
        self.set_preference(LAST_DESTINATION, destination).await
    }

    /// Stream selection the user made last
    ///
    /// Returns `None` unless both selectors have been stored.
    pub async fn last_selection(&self) -> Result<Option<Selection>> {
        let video = self.get_preference(LAST_VIDEO_SELECTOR).await?;
        let audio = self.get_preference(LAST_AUDIO_SELECTOR).await?;
        Ok(match (video, audio) {
            (Some(video_selector), Some(audio_selector)) => Some(Selection {
                video_selector,
                audio_selector,
            }),
            _ => None,
        })
    }

    /// Remember a stream selection; both selectors are written atomically
    pub async fn set_last_selection(&self, video_selector: &str, audio_selector: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for (key, value) in [
            (LAST_VIDEO_SELECTOR, video_selector),
            (LAST_AUDIO_SELECTOR, audio_selector),
        ] {
            upsert_query(key, value)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to store {}: {}",
                        key, e
                    )))
                })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit selection: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to read preference {}: {}",
                    key, e
                )))
            })
    }

    async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        upsert_query(key, value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to store preference {}: {}",
                    key, e
                )))
            })?;

        Ok(())
    }
}

fn upsert_query<'q>(
    key: &'q str,
    value: &'q str,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO preferences (key, value, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(now)
}
