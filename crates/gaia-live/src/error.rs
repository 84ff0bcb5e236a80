use thiserror::Error;

/// Errors raised by the live voice session.
#[derive(Debug, Error)]
pub enum LiveError {
    /// No credential was configured.
    #[error("GEMINI_API_KEY environment variable not set")]
    MissingApiKey,

    /// A session is already connecting or connected on this agent.
    #[error("a live session is already active")]
    SessionActive,

    /// No session is open.
    #[error("no live session is open")]
    NotConnected,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server answered setup with something other than `setupComplete`.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server did not acknowledge setup in time.
    #[error("timed out waiting for session setup after {0}s")]
    SetupTimeout(u64),

    /// The session closed before or while the operation ran.
    #[error("live session closed")]
    Closed,

    /// Audio output device failure.
    #[error("audio output error: {0}")]
    Output(String),
}
