//! One WebSocket connection to the live API.

use std::fmt;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use gaia_core::AppConfig;
use gaia_genai::pcm::{self, INPUT_SAMPLE_RATE};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::error::LiveError;
use crate::protocol;

const OUTBOUND_BUFFER: usize = 8;
const EVENT_BUFFER: usize = 64;
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Connection settings for a live session.
#[derive(Clone)]
pub struct LiveConfig {
    pub api_key: String,
    pub url: String,
    pub model: String,
    pub voice: String,
    pub setup_timeout_secs: u64,
}

impl LiveConfig {
    /// # Errors
    ///
    /// Returns [`LiveError::MissingApiKey`] when no credential is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, LiveError> {
        let api_key = config.api_key.clone().ok_or(LiveError::MissingApiKey)?;
        Ok(Self {
            api_key,
            url: config.live_url.clone(),
            model: config.live_model.clone(),
            voice: config.live_voice.clone(),
            setup_timeout_secs: config.request_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{sep}key={}", self.url, self.api_key)
    }
}

impl fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConfig")
            .field("api_key", &"[redacted]")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("setup_timeout_secs", &self.setup_timeout_secs)
            .finish()
    }
}

/// A decoded block of model speech, PCM16 mono.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioChunk {
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        pcm::duration_secs(self.samples.len(), self.sample_rate)
    }
}

/// Everything the server can tell an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Incremental transcript of what the user said.
    InputTranscript(String),
    /// Incremental transcript of what the model is saying.
    OutputTranscript(String),
    Audio(AudioChunk),
    TurnComplete,
    /// The user talked over the model; queued speech is stale.
    Interrupted,
    /// The server closed the connection.
    Closed,
    /// The transport failed.
    Error(String),
}

/// An open live session.
///
/// Frames are written by a background task fed through a bounded channel so
/// the microphone path never awaits the socket directly. Inbound frames are
/// decoded by a second task into [`LiveEvent`]s.
pub struct LiveSession {
    id: Uuid,
    outbound: mpsc::Sender<Message>,
    events: mpsc::Receiver<LiveEvent>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    closed: bool,
}

impl LiveSession {
    /// Connect, send the setup frame and wait for `setupComplete`.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::WebSocket`] when the connection fails,
    /// [`LiveError::SetupTimeout`] when setup is not acknowledged in time,
    /// [`LiveError::Protocol`] when the server announces a disconnect instead
    /// of acknowledging, and [`LiveError::Closed`] when it hangs up during setup.
    pub async fn connect(config: &LiveConfig, system_instruction: &str) -> Result<Self, LiveError> {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, url = %config.url, model = %config.model, "opening live session");

        let (socket, _response) = tokio_tungstenite::connect_async(config.endpoint()).await?;
        let (mut sink, mut stream) = socket.split();

        let setup = protocol::setup_frame(&config.model, &config.voice, system_instruction)?;
        sink.send(Message::text(setup)).await?;

        let wait = Duration::from_secs(config.setup_timeout_secs);
        tokio::time::timeout(wait, async {
            while let Some(frame) = stream.next().await {
                match frame? {
                    Message::Close(_) => return Err(LiveError::Closed),
                    msg => {
                        let Some(text) = frame_text(&msg) else { continue };
                        let message = protocol::decode_server_message(text)?;
                        if message.is_setup_complete() {
                            return Ok(());
                        }
                        if message.is_go_away() {
                            return Err(LiveError::Protocol(
                                "server sent goAway before setupComplete".to_string(),
                            ));
                        }
                    }
                }
            }
            Err(LiveError::Closed)
        })
        .await
        .map_err(|_| LiveError::SetupTimeout(config.setup_timeout_secs))??;
        tracing::info!(session = %id, "live session ready");

        let (outbound, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    tracing::debug!(session = %id, error = %e, "live writer stopped");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let msg = match frame {
                    Ok(Message::Close(reason)) => {
                        tracing::info!(session = %id, ?reason, "live session closed by server");
                        break;
                    }
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::error!(session = %id, error = %e, "live session transport error");
                        let _ = events_tx.send(LiveEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                let Some(text) = frame_text(&msg) else { continue };
                let message = match protocol::decode_server_message(text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(session = %id, error = %e, "ignoring malformed live frame");
                        continue;
                    }
                };
                if message.is_go_away() {
                    tracing::warn!(session = %id, "server announced disconnect");
                }
                for event in message.into_events() {
                    if events_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            let _ = events_tx.send(LiveEvent::Closed).await;
        });

        Ok(Self {
            id,
            outbound,
            events,
            writer,
            reader,
            closed: false,
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed || self.outbound.is_closed()
    }

    /// Queue one microphone frame (float samples at 16 kHz).
    ///
    /// Waits at most one frame's duration for room in the outbound queue; a
    /// frame that cannot be queued in that time is dropped and `Ok(false)` is
    /// returned. Empty frames are not sent.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Closed`] once the session has ended.
    pub async fn send_audio(&self, samples: &[f32]) -> Result<bool, LiveError> {
        if self.is_closed() {
            return Err(LiveError::Closed);
        }
        if samples.is_empty() {
            return Ok(false);
        }
        let frame = protocol::audio_frame(samples)?;
        let period = Duration::from_secs_f64(pcm::duration_secs(samples.len(), INPUT_SAMPLE_RATE));
        match tokio::time::timeout(period, self.outbound.send(Message::text(frame))).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(_)) => Err(LiveError::Closed),
            Err(_) => {
                tracing::debug!(session = %self.id, samples = samples.len(), "dropping audio frame");
                Ok(false)
            }
        }
    }

    /// Next server event; `None` once the session has fully shut down.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }

    /// Send a close frame and stop both background tasks. Safe to call more
    /// than once.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.outbound.try_send(Message::Close(None));
        if tokio::time::timeout(CLOSE_GRACE, &mut self.writer).await.is_err() {
            self.writer.abort();
        }
        self.reader.abort();
        tracing::info!(session = %self.id, "live session closed");
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}

impl fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// JSON payload of a text or binary frame; control frames carry none.
fn frame_text(msg: &Message) -> Option<&str> {
    match msg {
        Message::Text(text) => Some(text.as_str()),
        Message::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}
