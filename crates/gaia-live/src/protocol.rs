//! JSON frames exchanged over the live WebSocket.
//!
//! Outbound: one `setup` frame, then any number of `realtimeInput` audio
//! frames. Inbound: `setupComplete` once, then `serverContent` frames carrying
//! model audio, transcripts and turn markers.

use gaia_genai::pcm::{self, INPUT_MIME_TYPE, OUTPUT_SAMPLE_RATE};
use gaia_genai::types::{Content, Enabled, GenerationConfig, InlineData, SpeechConfig};
use serde::{Deserialize, Serialize};

use crate::error::LiveError;
use crate::session::{AudioChunk, LiveEvent};

#[derive(Debug, Serialize)]
struct SetupMessage {
    setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup {
    model: String,
    generation_config: GenerationConfig,
    system_instruction: Content,
    input_audio_transcription: Enabled,
    output_audio_transcription: Enabled,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInputMessage {
    realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
struct RealtimeInput {
    audio: InlineData,
}

/// Qualify a bare model id with the `models/` prefix the live API expects.
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Serialise the session setup frame: audio responses in `voice`, both
/// transcription streams on, and the fixed system instruction.
///
/// # Errors
///
/// Returns [`LiveError::Json`] if serialisation fails.
pub fn setup_frame(model: &str, voice: &str, instruction: &str) -> Result<String, LiveError> {
    let message = SetupMessage {
        setup: Setup {
            model: qualified_model(model),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig::prebuilt(voice)),
            },
            system_instruction: Content::text(instruction),
            input_audio_transcription: Enabled {},
            output_audio_transcription: Enabled {},
        },
    };
    Ok(serde_json::to_string(&message)?)
}

/// Serialise one microphone frame as 16 kHz PCM16 inside a `realtimeInput`.
///
/// # Errors
///
/// Returns [`LiveError::Json`] if serialisation fails.
pub fn audio_frame(samples: &[f32]) -> Result<String, LiveError> {
    let message = RealtimeInputMessage {
        realtime_input: RealtimeInput {
            audio: InlineData {
                mime_type: INPUT_MIME_TYPE.to_string(),
                data: pcm::to_base64(&pcm::encode_f32(samples)),
            },
        },
    };
    Ok(serde_json::to_string(&message)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    server_content: Option<ServerContent>,
    #[serde(default)]
    go_away: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    #[serde(default)]
    model_turn: Option<Content>,
    #[serde(default)]
    input_transcription: Option<Transcription>,
    #[serde(default)]
    output_transcription: Option<Transcription>,
    #[serde(default)]
    turn_complete: bool,
    #[serde(default)]
    interrupted: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Transcription {
    #[serde(default)]
    text: String,
}

/// Parse one inbound frame.
///
/// # Errors
///
/// Returns [`LiveError::Json`] when the frame is not a JSON object.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, LiveError> {
    Ok(serde_json::from_str(text)?)
}

/// Sample rate from a `audio/pcm;rate=N` MIME type, defaulting to 24 kHz.
fn sample_rate_of(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(OUTPUT_SAMPLE_RATE)
}

impl ServerMessage {
    #[must_use]
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    #[must_use]
    pub fn is_go_away(&self) -> bool {
        self.go_away.is_some()
    }

    /// Flatten the frame into events: transcripts, then audio chunks, then
    /// the interruption and turn-complete markers.
    ///
    /// Audio parts that fail to decode are logged and skipped so one bad
    /// chunk does not end the conversation.
    #[must_use]
    pub fn into_events(self) -> Vec<LiveEvent> {
        let Some(content) = self.server_content else {
            return Vec::new();
        };
        let mut events = Vec::new();

        if let Some(t) = content.input_transcription.filter(|t| !t.text.is_empty()) {
            events.push(LiveEvent::InputTranscript(t.text));
        }
        if let Some(t) = content.output_transcription.filter(|t| !t.text.is_empty()) {
            events.push(LiveEvent::OutputTranscript(t.text));
        }

        let inline = content
            .model_turn
            .into_iter()
            .flat_map(|turn| turn.parts)
            .filter_map(|part| part.inline_data);
        for data in inline {
            match pcm::decode_base64_i16(&data.data) {
                Ok(samples) if !samples.is_empty() => {
                    events.push(LiveEvent::Audio(AudioChunk {
                        samples,
                        sample_rate: sample_rate_of(&data.mime_type),
                    }));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, mime = %data.mime_type, "skipping undecodable audio chunk");
                }
            }
        }

        if content.interrupted {
            events.push(LiveEvent::Interrupted);
        }
        if content.turn_complete {
            events.push(LiveEvent::TurnComplete);
        }
        events
    }
}
