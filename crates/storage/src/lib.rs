use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::Session;

/// Durable session store: one sqlite file holding a singleton row with the
/// current username and bearer token, the two values the browser front-end
/// this client replaces kept in localStorage.
///
/// The token is stored in clear text. That matches the deployed behavior
/// on purpose; see DESIGN.md before changing it.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_session_table().await?;
        Ok(storage)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_session_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                slot      INTEGER PRIMARY KEY CHECK (slot = 0),
                username  TEXT NOT NULL DEFAULT '',
                token     TEXT NOT NULL,
                saved_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure session table exists")?;
        Ok(())
    }

    /// Returns the persisted session, if any. A row with an empty token
    /// counts as absent; a missing username still yields a degraded session
    /// with an empty username, so an old token remains usable.
    pub async fn load(&self) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT username, token FROM session WHERE slot = 0")
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let token: String = row.get(1);
        if token.is_empty() {
            return Ok(None);
        }
        let username: String = row.get(0);
        Ok(Some(Session { username, token }))
    }

    /// Upserts username and token in a single statement, so a reader never
    /// observes one key without the other.
    pub async fn save(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO session (slot, username, token, saved_at) VALUES (0, ?, ?, ?)
             ON CONFLICT(slot) DO UPDATE SET
               username=excluded.username, token=excluded.token, saved_at=excluded.saved_at",
        )
        .bind(&session.username)
        .bind(&session.token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Removes the persisted session. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE slot = 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
