use std::sync::Arc;

use reqwest::{header::AUTHORIZATION, Client};
use serde_json::Value;
use shared::{
    domain::{ChatMessage, Credentials, Session},
    error::FlowError,
    protocol::{self, LoginRequest, SendMessageRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

mod session_store;
pub use session_store::{DurableSessionStore, EphemeralSessionStore, SessionStore};

/// The three remote endpoints consumed as black boxes.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub messages_url: String,
    pub listing_url: String,
}

/// Snapshot of the orchestrator state the presentation layer renders.
/// `status` and `last_error` are shared scratch fields; whichever flow
/// completes last owns their contents.
#[derive(Default, Debug, Clone)]
pub struct ClientState {
    pub session: Option<Session>,
    pub messages: Vec<ChatMessage>,
    pub status: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SessionChanged(Option<Session>),
    /// The list is only ever replaced wholesale, never patched.
    MessagesReplaced(Vec<ChatMessage>),
    Status(String),
    Error(String),
}

/// Builds the authorization header value. Tokens the auth service already
/// returns fully formed ("Bearer xxx") are passed through unchanged.
pub fn bearer_header(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

/// Orchestrates the three request/response flows against the remote
/// services and reconciles their results into [`ClientState`].
pub struct ChatClient {
    http: Client,
    endpoints: Endpoints,
    store: Arc<dyn SessionStore>,
    inner: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ChatClient {
    pub fn new(endpoints: Endpoints) -> Arc<Self> {
        Self::new_with_store(endpoints, Arc::new(EphemeralSessionStore::default()))
    }

    pub fn new_with_store(endpoints: Endpoints, store: Arc<dyn SessionStore>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            http: Client::new(),
            endpoints,
            store,
            inner: Mutex::new(ClientState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ClientState {
        self.inner.lock().await.clone()
    }

    /// Login flow: validate, authenticate, extract the token, persist the
    /// session, then bring the message list up to date.
    pub async fn login(&self, credentials: Credentials) -> Result<Session, FlowError> {
        match self.login_flow(credentials).await {
            Ok(session) => Ok(session),
            Err(err) => {
                self.record_flow_error(&err).await;
                Err(err)
            }
        }
    }

    async fn login_flow(&self, credentials: Credentials) -> Result<Session, FlowError> {
        let username = credentials.username.trim().to_string();
        if username.is_empty() || credentials.password.trim().is_empty() {
            return Err(FlowError::Validation(
                "username and password are required".to_string(),
            ));
        }

        // The password lives exactly as long as this request body.
        let request = LoginRequest {
            username: username.clone(),
            password: credentials.password,
        };
        let response = self
            .http
            .post(&self.endpoints.auth_url)
            .json(&request)
            .send()
            .await
            .map_err(|err| FlowError::Transport(err.to_string()))?;
        drop(request);

        if !response.status().is_success() {
            return Err(FlowError::Authentication);
        }

        let body: Value = response.json().await.map_err(|_| FlowError::Protocol)?;
        let token = protocol::extract_token(&body).ok_or(FlowError::Protocol)?;

        let session = Session { username, token };
        if let Err(err) = self.store.save(&session).await {
            // The in-memory session still works for this run.
            warn!("failed to persist session: {err}");
        }

        {
            let mut state = self.inner.lock().await;
            state.session = Some(session.clone());
            state.status = Some("authenticated".to_string());
            state.last_error = None;
        }
        info!(username = %session.username, "login succeeded");
        let _ = self
            .events
            .send(ClientEvent::SessionChanged(Some(session.clone())));

        // A session just became active; the login itself stays successful
        // even when this first refresh fails.
        if let Err(err) = self.refresh_messages().await {
            let _ = self.events.send(ClientEvent::Error(format!(
                "initial message refresh failed: {err}"
            )));
        }

        Ok(session)
    }

    /// Send flow: validate, resolve a usable session, post the message,
    /// then run the dependent list refresh.
    pub async fn send_message(&self, content: &str) -> Result<(), FlowError> {
        match self.send_flow(content).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.record_flow_error(&err).await;
                Err(err)
            }
        }
    }

    async fn send_flow(&self, content: &str) -> Result<(), FlowError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(FlowError::Validation("message text is required".to_string()));
        }

        let session = self.active_session().await?;

        let response = self
            .http
            .post(&self.endpoints.messages_url)
            .header(AUTHORIZATION, bearer_header(&session.token))
            .json(&SendMessageRequest::new(&session.username, content))
            .send()
            .await
            .map_err(|err| FlowError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::Submission(body));
        }

        {
            let mut state = self.inner.lock().await;
            state.status = Some("message sent".to_string());
            state.last_error = None;
        }
        let _ = self
            .events
            .send(ClientEvent::Status("message sent".to_string()));

        self.refresh_after_send().await;
        Ok(())
    }

    /// Dependent follow-up of a successful send: exactly one list refresh
    /// attempt. Its failure is surfaced but does not undo the sent status.
    async fn refresh_after_send(&self) {
        if let Err(err) = self.refresh_messages().await {
            let _ = self.events.send(ClientEvent::Error(format!(
                "message sent but list refresh failed: {err}"
            )));
        }
    }

    /// List refresh flow: unauthenticated full read-and-replace. On
    /// failure the previously displayed list is left untouched. Overlapping
    /// refreshes are allowed; the last response to arrive wins.
    pub async fn refresh_messages(&self) -> Result<Vec<ChatMessage>, FlowError> {
        match self.refresh_flow().await {
            Ok(messages) => Ok(messages),
            Err(err) => {
                self.record_flow_error(&err).await;
                Err(err)
            }
        }
    }

    async fn refresh_flow(&self) -> Result<Vec<ChatMessage>, FlowError> {
        let response = self
            .http
            .get(&self.endpoints.listing_url)
            .send()
            .await
            .map_err(|err| FlowError::Fetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(FlowError::Fetch(format!(
                "listing returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| FlowError::Fetch(err.to_string()))?;
        let messages: Vec<ChatMessage> = protocol::message_items(&body)
            .iter()
            .map(protocol::decode_message)
            .collect();

        {
            let mut state = self.inner.lock().await;
            state.messages = messages.clone();
            state.last_error = None;
        }
        let _ = self
            .events
            .send(ClientEvent::MessagesReplaced(messages.clone()));
        Ok(messages)
    }

    /// Pure state reset, no network call. Safe to call when already
    /// logged out.
    pub async fn logout(&self) {
        if let Err(err) = self.store.clear().await {
            warn!("failed to clear persisted session: {err}");
        }
        {
            let mut state = self.inner.lock().await;
            state.session = None;
            state.messages.clear();
            state.status = None;
            state.last_error = None;
        }
        info!("logged out");
        let _ = self.events.send(ClientEvent::SessionChanged(None));
        let _ = self.events.send(ClientEvent::MessagesReplaced(Vec::new()));
    }

    /// Picks up a session persisted by an earlier run. Installing it
    /// mirrors a fresh login, automatic list refresh included.
    pub async fn restore_session(&self) -> Option<Session> {
        let restored = match self.store.load().await {
            Ok(session) => session,
            Err(err) => {
                warn!("session store read failed: {err}");
                None
            }
        };
        let session = restored?;

        {
            let mut state = self.inner.lock().await;
            state.session = Some(session.clone());
        }
        info!(username = %session.username, "restored persisted session");
        let _ = self
            .events
            .send(ClientEvent::SessionChanged(Some(session.clone())));

        if let Err(err) = self.refresh_messages().await {
            let _ = self.events.send(ClientEvent::Error(format!(
                "initial message refresh failed: {err}"
            )));
        }

        Some(session)
    }

    /// In-memory session first; falls back to the durable store so a send
    /// issued right after a restart still succeeds.
    async fn active_session(&self) -> Result<Session, FlowError> {
        if let Some(session) = self.inner.lock().await.session.clone() {
            return Ok(session);
        }

        let restored = match self.store.load().await {
            Ok(session) => session,
            Err(err) => {
                warn!("session store read failed: {err}");
                None
            }
        };
        let Some(session) = restored else {
            return Err(FlowError::Session);
        };

        {
            let mut state = self.inner.lock().await;
            state.session = Some(session.clone());
        }
        let _ = self
            .events
            .send(ClientEvent::SessionChanged(Some(session.clone())));
        Ok(session)
    }

    async fn record_flow_error(&self, err: &FlowError) {
        let text = err.to_string();
        {
            let mut state = self.inner.lock().await;
            state.last_error = Some(text.clone());
        }
        let _ = self.events.send(ClientEvent::Error(text));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
