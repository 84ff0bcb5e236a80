//! Gemini REST adapter for the one-shot request shapes: image analysis,
//! tool-grounded chat completion, and text-to-speech.
//!
//! The voice session lives in `gaia-live`, which reuses the wire types and
//! the PCM helpers exported here.

pub mod client;
pub mod error;
pub mod pcm;
pub mod types;

mod retry;

pub use client::{GenAiClient, GenAiConfig, GroundedResponse, SpeechAudio};
pub use error::GenAiError;
pub use retry::is_retriable;
