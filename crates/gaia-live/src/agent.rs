//! Voice agent: one live session at a time, with transcripts and playback.

use std::sync::Arc;

use gaia_core::{live_system_instruction, LocationState, Roster, LIVE_LOCATION_ADVISORY};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::error::LiveError;
use crate::playback::{AudioOutput, PlaybackScheduler};
use crate::session::{LiveConfig, LiveEvent, LiveSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Closed,
    Error,
}

impl ConnectionState {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// What each side said during one completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnRecord {
    pub user: String,
    pub agent: String,
}

/// Progress notifications for whoever renders the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentUpdate {
    State(ConnectionState),
    UserTranscript(String),
    AgentTranscript(String),
    Turn(TurnRecord),
}

/// A running microphone capture.
pub trait AudioCapture: Send {
    fn stop(&mut self);
}

enum Step {
    Frame(Vec<f32>),
    InputEnded,
    Event(LiveEvent),
    SessionEnded,
    Stop,
}

pub struct VoiceAgent {
    config: LiveConfig,
    roster: Arc<Roster>,
    location: LocationState,
    state: ConnectionState,
    session: Option<LiveSession>,
    output: Option<Box<dyn AudioOutput>>,
    capture: Option<Box<dyn AudioCapture>>,
    scheduler: PlaybackScheduler,
    history: Vec<TurnRecord>,
    pending_user: String,
    pending_agent: String,
    updates: Option<mpsc::UnboundedSender<AgentUpdate>>,
}

impl VoiceAgent {
    #[must_use]
    pub fn new(config: LiveConfig, roster: Arc<Roster>, location: LocationState) -> Self {
        Self {
            config,
            roster,
            location,
            state: ConnectionState::Idle,
            session: None,
            output: None,
            capture: None,
            scheduler: PlaybackScheduler::new(),
            history: Vec::new(),
            pending_user: String::new(),
            pending_agent: String::new(),
            updates: None,
        }
    }

    /// Receive state changes, transcript deltas and completed turns.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<AgentUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.updates = Some(tx);
        rx
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn history(&self) -> &[TurnRecord] {
        &self.history
    }

    /// Advisory to show when geolocation was denied or failed.
    #[must_use]
    pub fn location_advisory(&self) -> Option<&'static str> {
        self.location.is_unavailable().then_some(LIVE_LOCATION_ADVISORY)
    }

    /// Instruction sent at setup, fixed for the whole session.
    #[must_use]
    pub fn system_instruction(&self) -> String {
        live_system_instruction(self.roster.collectors(), self.location.location())
    }

    /// Open a session, taking ownership of the output device and capture.
    ///
    /// Turn history from any previous session is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::SessionActive`] while a session is connecting or
    /// connected. Connection failures tear everything down, leave the agent in
    /// [`ConnectionState::Error`] and are returned.
    pub async fn start(
        &mut self,
        output: Box<dyn AudioOutput>,
        capture: Box<dyn AudioCapture>,
    ) -> Result<(), LiveError> {
        if self.state.is_active() {
            return Err(LiveError::SessionActive);
        }
        self.history.clear();
        self.pending_user.clear();
        self.pending_agent.clear();
        self.scheduler.reset();
        self.output = Some(output);
        self.capture = Some(capture);
        self.set_state(ConnectionState::Connecting);

        let instruction = self.system_instruction();
        match LiveSession::connect(&self.config, &instruction).await {
            Ok(session) => {
                self.session = Some(session);
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "live session failed to open");
                self.cleanup();
                self.set_state(ConnectionState::Error);
                Err(e)
            }
        }
    }

    /// Pump microphone frames up and server events down until the session
    /// ends or `stop` fires. Returns the final state.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::NotConnected`] without an open session, or the
    /// send error that ended it. Every exit path runs [`cleanup`](Self::cleanup).
    pub async fn run(
        &mut self,
        frames: &mut mpsc::Receiver<Vec<f32>>,
        stop: &mut oneshot::Receiver<()>,
    ) -> Result<ConnectionState, LiveError> {
        let mut input_open = true;
        loop {
            let Some(session) = self.session.as_mut() else {
                return if self.state.is_active() {
                    Err(LiveError::NotConnected)
                } else {
                    Ok(self.state)
                };
            };
            let step = tokio::select! {
                frame = frames.recv(), if input_open => frame.map_or(Step::InputEnded, Step::Frame),
                event = session.next_event() => event.map_or(Step::SessionEnded, Step::Event),
                _ = &mut *stop => Step::Stop,
            };

            match step {
                Step::Frame(frame) => {
                    if let Err(e) = session.send_audio(&frame).await {
                        tracing::error!(error = %e, "failed to stream microphone audio");
                        self.cleanup();
                        self.set_state(ConnectionState::Error);
                        return Err(e);
                    }
                }
                Step::InputEnded => {
                    tracing::debug!("microphone input ended");
                    input_open = false;
                }
                Step::Event(event) => self.handle_event(event),
                Step::SessionEnded => self.handle_event(LiveEvent::Closed),
                Step::Stop => {
                    self.stop().await;
                    return Ok(self.state);
                }
            }
        }
    }

    /// End the conversation: close the socket politely, then tear down.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.close().await;
        }
        self.cleanup();
        if self.state != ConnectionState::Error {
            self.set_state(ConnectionState::Closed);
        }
    }

    /// Release capture, output and session. Safe to call any number of times.
    pub fn cleanup(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(mut output) = self.output.take() {
            output.stop_all();
            output.close();
        }
        if let Some(session) = self.session.take() {
            tracing::debug!(session = %session.id(), "releasing live session");
        }
        self.scheduler.reset();
    }

    fn handle_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::InputTranscript(text) => {
                self.pending_user.push_str(&text);
                self.emit(AgentUpdate::UserTranscript(text));
            }
            LiveEvent::OutputTranscript(text) => {
                self.pending_agent.push_str(&text);
                self.emit(AgentUpdate::AgentTranscript(text));
            }
            LiveEvent::Audio(chunk) => {
                if let Some(output) = self.output.as_mut() {
                    let at = self
                        .scheduler
                        .schedule(output.current_time(), chunk.duration_secs());
                    if let Err(e) = output.play_at(&chunk, at) {
                        tracing::warn!(error = %e, "dropping audio chunk");
                    }
                }
            }
            LiveEvent::Interrupted => {
                if let Some(output) = self.output.as_mut() {
                    output.stop_all();
                }
                self.scheduler.reset();
            }
            LiveEvent::TurnComplete => {
                if self.pending_user.is_empty() && self.pending_agent.is_empty() {
                    return;
                }
                let turn = TurnRecord {
                    user: std::mem::take(&mut self.pending_user),
                    agent: std::mem::take(&mut self.pending_agent),
                };
                self.history.push(turn.clone());
                self.emit(AgentUpdate::Turn(turn));
            }
            LiveEvent::Closed => {
                tracing::info!("live session ended");
                self.cleanup();
                self.set_state(ConnectionState::Closed);
            }
            LiveEvent::Error(message) => {
                tracing::error!(%message, "live session failed");
                self.cleanup();
                self.set_state(ConnectionState::Error);
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "voice agent state");
            self.state = state;
            self.emit(AgentUpdate::State(state));
        }
    }

    fn emit(&self, update: AgentUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }
}

impl Drop for VoiceAgent {
    fn drop(&mut self) {
        self.cleanup();
    }
}
