//! Admin inquiry desk: the session list poll, the message poll of the
//! selected inquiry, and the replies sent from it.
//!
//! All state is owned by the caller's task. Network work runs on spawned
//! tasks that report back through a channel; `poll_events` drains it.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::conversation::Conversation;
use super::poller::{spawn_poll, PollHandle, PollPolicy};
use super::session_list::SessionList;
use crate::api::SupportBackend;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{ChatSession, Message, SessionStatus};
use crate::storage::{KeyValueStore, SELECTED_SESSION_KEY};
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskSettings {
    pub list_interval: Duration,
    pub message_interval: Duration,
    pub retention: chrono::Duration,
}

impl DeskSettings {
    pub fn from_config(config: &Config) -> Self {
        DeskSettings {
            list_interval: config.list_poll_interval(),
            message_interval: config.message_poll_interval(),
            retention: config.closed_retention(),
        }
    }
}

impl Default for DeskSettings {
    fn default() -> Self {
        DeskSettings::from_config(&Config::default())
    }
}

#[derive(Debug)]
pub enum DeskEvent {
    Sessions(ApiResult<Vec<ChatSession>>),
    Messages {
        session_id: String,
        generation: u64,
        result: ApiResult<Vec<Message>>,
    },
    ReplySent {
        session_id: String,
        local_id: String,
        result: ApiResult<Message>,
    },
    Closed {
        session_id: String,
        result: ApiResult<()>,
    },
    Deleted {
        session_id: String,
        result: ApiResult<()>,
    },
}

pub struct InquiryDesk {
    backend: Arc<dyn SupportBackend>,
    store: Arc<dyn KeyValueStore>,
    settings: DeskSettings,
    sessions: SessionList,
    conversation: Option<Conversation>,
    // Bumped on every selection change; message results from older
    // generations are dropped
    generation: u64,
    list_poll: Option<PollHandle>,
    message_poll: Option<PollHandle>,
    events_tx: mpsc::UnboundedSender<DeskEvent>,
    events_rx: mpsc::UnboundedReceiver<DeskEvent>,
    status_line: Option<String>,
    auth_expired: bool,
}

impl InquiryDesk {
    pub fn new(backend: Arc<dyn SupportBackend>, store: Arc<dyn KeyValueStore>, settings: DeskSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        InquiryDesk {
            backend,
            store,
            settings,
            sessions: SessionList::new(settings.retention),
            conversation: None,
            generation: 0,
            list_poll: None,
            message_poll: None,
            events_tx,
            events_rx,
            status_line: None,
            auth_expired: false,
        }
    }

    /// Starts the session list poll. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.list_poll.as_ref().map(|p| p.is_running()).unwrap_or(false) {
            return;
        }
        self.auth_expired = false;

        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        self.list_poll = Some(spawn_poll(
            "inquiries",
            PollPolicy::every(self.settings.list_interval),
            move || {
                let backend = backend.clone();
                async move { backend.list_sessions(None).await }
            },
            move |result| tx.send(DeskEvent::Sessions(result)).is_ok(),
        ));

        // A selection kept across stop() gets its message poll back
        if !self.is_polling_messages() {
            if let Some(id) = self.conversation.as_ref().map(|c| c.session_id().to_string()) {
                self.open_conversation(&id);
            }
        }
        info!("Inquiry desk started");
    }

    /// Stops every poll. Replies already sent still report back.
    pub fn stop(&mut self) {
        if let Some(poll) = self.list_poll.take() {
            poll.stop();
        }
        self.stop_message_poll();
    }

    pub fn is_polling(&self) -> bool {
        self.list_poll.as_ref().map(|p| p.is_running()).unwrap_or(false)
    }

    pub fn is_polling_messages(&self) -> bool {
        self.message_poll.as_ref().map(|p| p.is_running()).unwrap_or(false)
    }

    fn stop_message_poll(&mut self) {
        if let Some(poll) = self.message_poll.take() {
            poll.stop();
        }
    }

    /// Selects a listed inquiry and starts polling its messages.
    /// Returns false when the id is not in the current list.
    pub fn select(&mut self, session_id: &str) -> bool {
        let already_open = self
            .conversation
            .as_ref()
            .map(|c| c.session_id() == session_id)
            .unwrap_or(false);
        if already_open && self.sessions.selected_id() == Some(session_id) {
            return true;
        }
        if !self.sessions.select(session_id) {
            return false;
        }
        if let Err(e) = self.store.set(SELECTED_SESSION_KEY, session_id) {
            warn!("Could not persist selected inquiry: {}", e);
        }
        self.open_conversation(session_id);
        true
    }

    /// Moves the selection by `offset` rows, wrapping around.
    pub fn select_relative(&mut self, offset: isize) -> bool {
        let len = self.sessions.sessions().len();
        if len == 0 {
            return false;
        }
        let next = match self.sessions.selected_index() {
            Some(idx) => (idx as isize + offset).rem_euclid(len as isize) as usize,
            None if offset < 0 => len - 1,
            None => 0,
        };
        let id = self.sessions.sessions()[next].id.clone();
        self.select(&id)
    }

    pub fn clear_selection(&mut self) {
        self.close_conversation();
        if let Err(e) = self.store.remove(SELECTED_SESSION_KEY) {
            warn!("Could not clear persisted selection: {}", e);
        }
    }

    fn open_conversation(&mut self, session_id: &str) {
        self.stop_message_poll();
        self.generation += 1;
        let status = self.sessions.status_of(session_id).unwrap_or(SessionStatus::Waiting);
        self.conversation = Some(Conversation::new(session_id, status));

        let generation = self.generation;
        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        let fetch_id = session_id.to_string();
        let deliver_id = session_id.to_string();
        self.message_poll = Some(spawn_poll(
            format!("messages:{}", session_id),
            PollPolicy::every(self.settings.message_interval),
            move || {
                let backend = backend.clone();
                let id = fetch_id.clone();
                async move { backend.list_messages(&id).await }
            },
            move |result| {
                tx.send(DeskEvent::Messages { session_id: deliver_id.clone(), generation, result })
                    .is_ok()
            },
        ));
        debug!("Opened inquiry {} (generation {})", session_id, generation);
    }

    fn close_conversation(&mut self) {
        self.stop_message_poll();
        self.generation += 1;
        self.conversation = None;
        self.sessions.clear_selection();
    }

    /// Applies every event that has arrived so far. Returns true if anything
    /// visible changed.
    pub fn poll_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            changed |= self.handle_event(event);
        }
        changed
    }

    /// Waits for the next event and applies it.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    pub fn handle_event(&mut self, event: DeskEvent) -> bool {
        match event {
            DeskEvent::Sessions(Ok(fetched)) => {
                self.apply_sessions(fetched);
                true
            }
            DeskEvent::Sessions(Err(e)) => {
                self.note_auth(&e);
                false
            }
            DeskEvent::Messages { session_id, generation, result } => {
                let current = self
                    .conversation
                    .as_mut()
                    .filter(|c| c.session_id() == session_id && generation == self.generation);
                let Some(conversation) = current else {
                    debug!("Discarding stale messages for {} (generation {})", session_id, generation);
                    return false;
                };
                match result {
                    Ok(messages) => conversation.apply_poll(messages),
                    Err(e) => {
                        self.note_auth(&e);
                        false
                    }
                }
            }
            DeskEvent::ReplySent { session_id, local_id, result } => {
                let conversation = self.conversation.as_mut().filter(|c| c.session_id() == session_id);
                match result {
                    Ok(message) => {
                        if let Some(conversation) = conversation {
                            conversation.confirm(&local_id, message);
                        }
                    }
                    Err(e) => {
                        if let Some(conversation) = conversation {
                            conversation.fail(&local_id);
                        }
                        self.status_line = Some(format!("Reply not sent: {}", e.user_message()));
                        self.note_auth(&e);
                    }
                }
                true
            }
            DeskEvent::Closed { session_id, result } => {
                match result {
                    Ok(()) => {
                        self.sessions.mark_closed(&session_id);
                        if let Some(conversation) = self.conversation.as_mut().filter(|c| c.session_id() == session_id) {
                            conversation.set_status(SessionStatus::Closed);
                        }
                        self.status_line = Some("Inquiry closed".to_string());
                    }
                    Err(e) => {
                        self.status_line = Some(format!("Could not close inquiry: {}", e.user_message()));
                        self.note_auth(&e);
                    }
                }
                true
            }
            DeskEvent::Deleted { session_id, result } => {
                match result {
                    Ok(()) => {
                        let was_open = self.sessions.selected_id() == Some(session_id.as_str());
                        self.sessions.mark_deleted(&session_id);
                        if was_open {
                            self.clear_selection();
                        }
                        self.status_line = Some("Inquiry deleted".to_string());
                    }
                    Err(e) => {
                        self.status_line = Some(format!("Could not delete inquiry: {}", e.user_message()));
                        self.note_auth(&e);
                    }
                }
                true
            }
        }
    }

    fn apply_sessions(&mut self, fetched: Vec<ChatSession>) {
        let update = self.sessions.apply_poll(fetched, Utc::now());
        for id in &update.new_sessions {
            debug!("New inquiry {}", id);
        }

        if update.selection_lost {
            info!("Selected inquiry is no longer listed");
            self.clear_selection();
            self.status_line = Some("The selected inquiry is no longer available".to_string());
            return;
        }

        if let (Some(status), Some(conversation)) = (update.selected_status, self.conversation.as_mut()) {
            if conversation.status() != status {
                conversation.set_status(status);
            }
        }

        if self.sessions.selected_id().is_none() {
            let persisted = match self.store.get(SELECTED_SESSION_KEY) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Could not read persisted selection: {}", e);
                    None
                }
            };
            if let Some(id) = self.sessions.restore_selection(persisted.as_deref()) {
                self.open_conversation(&id);
            }
        }
    }

    fn note_auth(&mut self, error: &ApiError) {
        if error.is_auth() && !self.auth_expired {
            warn!("Admin token rejected, stopping inquiry polls");
            self.auth_expired = true;
            self.stop();
        }
    }

    /// Why a reply cannot be typed right now, if it cannot.
    pub fn reply_blocked(&self) -> Option<ValidationError> {
        match &self.conversation {
            None => Some(ValidationError::NoSessionSelected),
            Some(c) if !c.can_reply() => Some(ValidationError::SessionClosed),
            Some(_) => None,
        }
    }

    /// Appends the reply locally and posts it in the background.
    pub fn send_reply(&mut self, text: &str) -> Result<(), ValidationError> {
        let conversation = self.conversation.as_mut().ok_or(ValidationError::NoSessionSelected)?;
        let local = conversation.push_optimistic(text)?;

        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        let session_id = conversation.session_id().to_string();
        tokio::spawn(async move {
            let result = backend.post_admin_message(&session_id, &local.body).await;
            let _ = tx.send(DeskEvent::ReplySent { session_id, local_id: local.id, result });
        });
        Ok(())
    }

    /// Asks the backend to close the selected inquiry.
    pub fn close_selected(&mut self) -> Result<(), ValidationError> {
        let session_id = self.sessions.selected_id().ok_or(ValidationError::NoSessionSelected)?.to_string();
        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.close_chat(&session_id).await;
            let _ = tx.send(DeskEvent::Closed { session_id, result });
        });
        Ok(())
    }

    /// Deletes the selected inquiry on the backend.
    pub fn delete_selected(&mut self) -> Result<(), ValidationError> {
        let session_id = self.sessions.selected_id().ok_or(ValidationError::NoSessionSelected)?.to_string();
        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.delete_chat(&session_id).await;
            let _ = tx.send(DeskEvent::Deleted { session_id, result });
        });
        Ok(())
    }

    pub fn sessions(&self) -> &SessionList {
        &self.sessions
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn set_status_line(&mut self, text: impl Into<String>) {
        self.status_line = Some(text.into());
    }

    pub fn clear_status_line(&mut self) {
        self.status_line = None;
    }

    /// Set once the backend rejects the admin token; polls are stopped.
    pub fn auth_expired(&self) -> bool {
        self.auth_expired
    }
}
