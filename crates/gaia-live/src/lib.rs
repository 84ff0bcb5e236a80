//! Live voice session against the Gemini bidirectional streaming API.
//!
//! [`LiveSession`] owns the WebSocket and exposes it as a typed event channel.
//! [`VoiceAgent`] drives one session at a time: it feeds microphone frames
//! in, schedules returned speech gaplessly through a [`PlaybackScheduler`],
//! collects transcripts per turn, and tears everything down on every exit path.

pub mod agent;
pub mod error;
pub mod playback;
pub mod protocol;
pub mod session;

pub use agent::{AgentUpdate, AudioCapture, ConnectionState, TurnRecord, VoiceAgent};
pub use error::LiveError;
pub use playback::{AudioOutput, PlaybackScheduler};
pub use session::{AudioChunk, LiveConfig, LiveEvent, LiveSession};
