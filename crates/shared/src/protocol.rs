use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ChatMessage;

/// Body for the auth endpoint. Field casing is fixed by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
}

/// Body for the message submission endpoint. The deployed service only
/// knows one room, so `Cod_Sala` is always zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(rename = "Cod_Sala")]
    pub room_code: i64,
    #[serde(rename = "Login_Emisor")]
    pub sender_login: String,
    #[serde(rename = "Contenido")]
    pub content: String,
}

impl SendMessageRequest {
    pub const ROOM_CODE: i64 = 0;

    pub fn new(sender_login: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            room_code: Self::ROOM_CODE,
            sender_login: sender_login.into(),
            content: content.into(),
        }
    }
}

/// Shown when the listing payload carries no recognizable sender.
pub const ANONYMOUS_SENDER: &str = "Anónimo";
/// Shown when the listing payload carries no recognizable content.
pub const EMPTY_CONTENT: &str = "(sin texto)";

/// Field names under which the auth service has been observed to return
/// the bearer token, in probe order.
const TOKEN_FIELDS: [&str; 5] = ["token", "Token", "accessToken", "access_token", "jwt"];

const SENDER_FIELDS: [&str; 5] = ["Login_Emisor", "login_emisor", "usuario", "Usuario", "sender"];
const CONTENT_FIELDS: [&str; 5] = ["Contenido", "contenido", "mensaje", "content", "texto"];
const TIMESTAMP_FIELDS: [&str; 4] = ["Fecha", "fecha", "timestamp", "created_at"];
const ID_FIELDS: [&str; 3] = ["Id", "id", "Cod_Mensaje"];

/// Object keys under which the listing service wraps its array, probed
/// when the response body is not an array itself.
const LIST_WRAPPER_FIELDS: [&str; 2] = ["data", "result"];

/// Ordered-fallback token lookup over a login response body. The first
/// non-empty string wins.
pub fn extract_token(body: &Value) -> Option<String> {
    first_string(body, &TOKEN_FIELDS)
}

/// Unwraps the polymorphic listing body: an array is used as-is, an object
/// is probed for a wrapped array, anything else decodes as no messages.
pub fn message_items(body: &Value) -> &[Value] {
    if let Some(items) = body.as_array() {
        return items;
    }
    for field in LIST_WRAPPER_FIELDS {
        if let Some(items) = body.get(field).and_then(Value::as_array) {
            return items;
        }
    }
    &[]
}

/// Normalizes one raw listing element into a display record, tolerating
/// the field-name drift the listing service exhibits.
pub fn decode_message(value: &Value) -> ChatMessage {
    ChatMessage {
        sender: first_string(value, &SENDER_FIELDS)
            .unwrap_or_else(|| ANONYMOUS_SENDER.to_string()),
        content: first_string(value, &CONTENT_FIELDS)
            .unwrap_or_else(|| EMPTY_CONTENT.to_string()),
        timestamp: first_scalar(value, &TIMESTAMP_FIELDS),
        id: first_scalar(value, &ID_FIELDS),
    }
}

fn first_string(value: &Value, fields: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    for field in fields {
        if let Some(text) = object.get(*field).and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Like `first_string` but also accepts numbers, stringified. The listing
/// service returns ids both ways.
fn first_scalar(value: &Value, fields: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    for field in fields {
        match object.get(*field) {
            Some(Value::String(text)) if !text.is_empty() => return Some(text.clone()),
            Some(Value::Number(number)) => return Some(number.to_string()),
            _ => {}
        }
    }
    None
}
