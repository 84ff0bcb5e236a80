use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let non_empty = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let env = parse_environment(&or_default("GAIA_ENV", "development"))?;
    let log_level = or_default("GAIA_LOG_LEVEL", "info");
    let api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));
    let collectors_path = non_empty("GAIA_COLLECTORS_PATH").map(PathBuf::from);

    let gemini_base_url = or_default("GAIA_GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL);
    let live_url = or_default("GAIA_LIVE_URL", DEFAULT_LIVE_URL);
    let text_model = or_default("GAIA_TEXT_MODEL", "gemini-2.5-flash");
    let tts_model = or_default("GAIA_TTS_MODEL", "gemini-2.5-flash-preview-tts");
    let live_model = or_default(
        "GAIA_LIVE_MODEL",
        "gemini-2.5-flash-native-audio-preview-09-2025",
    );
    let tts_voice = or_default("GAIA_TTS_VOICE", "Kore");
    let live_voice = or_default("GAIA_LIVE_VOICE", "Zephyr");

    let request_timeout_secs = parse_u64("GAIA_REQUEST_TIMEOUT_SECS", "30")?;
    let max_retries = parse_u32("GAIA_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("GAIA_RETRY_BACKOFF_BASE_MS", "500")?;

    Ok(AppConfig {
        env,
        log_level,
        api_key,
        collectors_path,
        gemini_base_url,
        live_url,
        text_model,
        tts_model,
        live_model,
        tts_voice,
        live_voice,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GAIA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
