use thiserror::Error;

/// Error kinds surfaced at a flow boundary. None of these are fatal: the
/// orchestrator records a short human-readable text and the user retries.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Required input missing. Raised before any network call is made.
    #[error("{0}")]
    Validation(String),
    /// The auth service answered with a non-success status. The message is
    /// deliberately generic; the response body is not parsed.
    #[error("incorrect username or password")]
    Authentication,
    /// The auth service answered 2xx but no token could be extracted.
    #[error("token missing from response")]
    Protocol,
    /// The submission service answered with a non-success status. Carries
    /// the raw response body text for diagnostics.
    #[error("message submission rejected: {0}")]
    Submission(String),
    /// Non-success status or transport failure while fetching the list.
    #[error("message list fetch failed: {0}")]
    Fetch(String),
    /// An authenticated action was attempted with no usable token, in
    /// memory or in the durable store.
    #[error("not authenticated")]
    Session,
    /// Transport-level failure on auth or submission.
    #[error("request failed: {0}")]
    Transport(String),
}
