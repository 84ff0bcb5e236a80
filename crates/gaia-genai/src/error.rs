use thiserror::Error;

/// Errors returned by the Gemini REST client.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// No credential was configured; raised when a client is built.
    #[error("GEMINI_API_KEY environment variable not set")]
    MissingApiKey,

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `message` is taken from the API's error envelope when present.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx response that carried no usable text or audio.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// Audio payload was not valid base64 PCM16.
    #[error("invalid audio payload: {0}")]
    Audio(String),
}
