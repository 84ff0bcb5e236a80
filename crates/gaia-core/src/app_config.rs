use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// The single AI credential. Absence is only fatal once an AI client is built.
    pub api_key: Option<String>,
    /// Optional YAML roster; the embedded roster is used when unset.
    pub collectors_path: Option<PathBuf>,
    pub gemini_base_url: String,
    pub live_url: String,
    pub text_model: String,
    pub tts_model: String,
    pub live_model: String,
    pub tts_voice: String,
    pub live_voice: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("collectors_path", &self.collectors_path)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("live_url", &self.live_url)
            .field("text_model", &self.text_model)
            .field("tts_model", &self.tts_model)
            .field("live_model", &self.live_model)
            .field("tts_voice", &self.tts_voice)
            .field("live_voice", &self.live_voice)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}
