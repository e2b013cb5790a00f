//! Visitor-side chat transcript.

use log::warn;

use crate::api::SupportBackend;
use crate::error::ApiResult;
use crate::models::ChatReply;
use crate::validation::normalize_message;

/// Shown in place of an answer when the chatbot request fails.
pub const APOLOGY: &str = "Sorry, I'm having trouble connecting right now. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Visitor,
    Bot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub speaker: Speaker,
    pub text: String,
    /// Set on bot bubbles that replaced a failed answer
    pub failed: bool,
}

pub struct Transcript {
    session_id: String,
    bubbles: Vec<Bubble>,
    options: Vec<String>,
    options_visible: bool,
    in_flight: bool,
}

impl Transcript {
    pub fn new(session_id: &str, options: Vec<String>) -> Self {
        Transcript {
            session_id: session_id.to_string(),
            bubbles: Vec::new(),
            options,
            options_visible: true,
            in_flight: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    /// Quick options still offered; empty once the visitor has sent anything.
    pub fn options(&self) -> &[String] {
        if self.options_visible {
            &self.options
        } else {
            &[]
        }
    }

    pub fn set_options(&mut self, options: Vec<String>) {
        self.options = options;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Appends the visitor bubble and locks input. Returns the text to post,
    /// or None when the input is blank or a request is already running.
    pub fn begin_send(&mut self, text: &str) -> Option<String> {
        if self.in_flight {
            return None;
        }
        let body = normalize_message(text).ok()?;
        self.options_visible = false;
        self.in_flight = true;
        self.bubbles.push(Bubble { speaker: Speaker::Visitor, text: body.clone(), failed: false });
        Some(body)
    }

    /// Clicking an option sends its label exactly as if it had been typed.
    pub fn click_option(&mut self, index: usize) -> Option<String> {
        if !self.options_visible || self.in_flight {
            return None;
        }
        let label = self.options.get(index)?.clone();
        self.begin_send(&label)
    }

    /// Records the answer (or the apology) and unlocks input.
    pub fn finish(&mut self, result: ApiResult<ChatReply>) {
        self.in_flight = false;
        let bubble = match result {
            Ok(reply) => Bubble { speaker: Speaker::Bot, text: reply.answer, failed: false },
            Err(e) => {
                warn!("Chat request for {} failed: {}", self.session_id, e);
                Bubble { speaker: Speaker::Bot, text: APOLOGY.to_string(), failed: true }
            }
        };
        self.bubbles.push(bubble);
    }

    /// Full round trip against the visitor endpoint.
    pub async fn send(&mut self, backend: &dyn SupportBackend, text: &str) -> bool {
        let Some(body) = self.begin_send(text) else {
            return false;
        };
        let result = backend.post_visitor_message(&self.session_id, &body).await;
        self.finish(result);
        true
    }
}
