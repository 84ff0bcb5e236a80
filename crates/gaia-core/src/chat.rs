//! In-memory text chat session: ordered history plus the session's location state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collectors::Roster;
use crate::geo::{LocationState, CHAT_LOCATION_ADVISORY};
use crate::prompt::{assemble_grounded_request, GroundedRequest};

/// Reply shown when the AI boundary call fails.
pub const CHAT_FAILURE_MESSAGE: &str = "Desculpe, encontrei um erro. Por favor, tente novamente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A grounding source returned alongside a tool-augmented reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: Option<String>,
}

impl Citation {
    /// Title for display; untitled sources read "Fonte".
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Fonte")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn model(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            citations,
        }
    }
}

/// One chat conversation. History is discarded with the session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    roster: Arc<Roster>,
    location: LocationState,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    #[must_use]
    pub fn new(roster: Arc<Roster>, location: LocationState) -> Self {
        Self {
            roster,
            location,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    #[must_use]
    pub fn location(&self) -> &LocationState {
        &self.location
    }

    /// Advisory to show when geolocation was denied or failed.
    #[must_use]
    pub fn location_advisory(&self) -> Option<&'static str> {
        self.location
            .is_unavailable()
            .then_some(CHAT_LOCATION_ADVISORY)
    }

    /// Record the user's message and assemble the request for it.
    ///
    /// Blank input is ignored and returns `None` without touching history.
    pub fn prepare(&mut self, text: &str) -> Option<GroundedRequest> {
        if text.trim().is_empty() {
            return None;
        }
        self.history.push(ChatMessage::user(text));
        Some(assemble_grounded_request(
            self.roster.collectors(),
            text,
            self.location.location(),
        ))
    }

    pub fn record_reply(&mut self, text: impl Into<String>, citations: Vec<Citation>) {
        self.history.push(ChatMessage::model(text, citations));
    }

    /// Append the generic failure reply; the session stays usable.
    pub fn record_failure(&mut self) {
        self.history
            .push(ChatMessage::model(CHAT_FAILURE_MESSAGE, Vec::new()));
    }
}
