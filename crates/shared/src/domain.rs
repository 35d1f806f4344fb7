use serde::{Deserialize, Serialize};

/// Login input. Held only for the duration of one login attempt; the
/// password is dropped together with the request once the attempt resolves.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The single authenticated session. At most one exists at a time and its
/// presence is the sole discriminator between the logged-out and logged-in
/// views. Invariant: `token` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub token: String,
}

impl Session {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

/// Display record for one chat message, already normalized from whatever
/// field names the listing service happened to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
    pub timestamp: Option<String>,
    pub id: Option<String>,
}
