//! Seam between the orchestrator and durable session persistence.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::Session;
use storage::Storage;

/// Where the current session survives process restarts. These are the
/// three operations the browser original performed against localStorage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// In-memory stand-in used when no durable backend is wired up; sessions
/// last for the lifetime of the process only.
#[derive(Default)]
pub struct EphemeralSessionStore {
    session: tokio::sync::Mutex<Option<Session>>,
}

#[async_trait]
impl SessionStore for EphemeralSessionStore {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.session.lock().await.take();
        Ok(())
    }
}

/// Sqlite-backed store used by the desktop app.
pub struct DurableSessionStore {
    store: Storage,
}

impl DurableSessionStore {
    pub async fn initialize(database_url: &str) -> Result<Arc<Self>> {
        let store = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize session storage at '{database_url}'"))?;
        Ok(Arc::new(Self { store }))
    }
}

#[async_trait]
impl SessionStore for DurableSessionStore {
    async fn load(&self) -> Result<Option<Session>> {
        self.store.load().await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.store.save(session).await
    }

    async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
