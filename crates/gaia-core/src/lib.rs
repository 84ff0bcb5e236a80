//! Core logic for the Gaia e-waste assistant.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! configuration loading: the collector roster, distance ranking, the context
//! block injected into prompts, intent classification and prompt assembly.
//! Network adapters live in `gaia-genai` and `gaia-live`.

pub mod app_config;
pub mod chat;
pub mod collectors;
pub mod config;
pub mod context;
pub mod geo;
pub mod intent;
pub mod prompt;
pub mod ranking;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use chat::{ChatMessage, ChatSession, Citation, Role, CHAT_FAILURE_MESSAGE};
pub use collectors::{default_roster, load_collectors, parse_collectors, Collector, Contact, Roster};
pub use config::{load_app_config, load_app_config_from_env};
pub use context::{build_collectors_context, RANKED_HEADER, UNRANKED_HEADER};
pub use geo::{
    distance_km, resolve_location, LocationProvider, LocationState, LocationUnavailable,
    UserLocation, CHAT_LOCATION_ADVISORY, LIVE_LOCATION_ADVISORY,
};
pub use intent::{is_logistics_intent, should_use_location_tool};
pub use prompt::{
    assemble_grounded_request, live_system_instruction, GroundedRequest, ToolSelection,
    DEFAULT_IMAGE_PROMPT, IMAGE_FAILURE_MESSAGE, IMAGE_PROMPT_MISSING_MESSAGE,
};
pub use ranking::{rank_collectors, RankedCollector, RankedRoster};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read collectors file {path}: {source}")]
    CollectorsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse collectors file: {0}")]
    CollectorsFileParse(#[from] serde_yaml::Error),

    #[error("collector validation failed: {0}")]
    Validation(String),
}
