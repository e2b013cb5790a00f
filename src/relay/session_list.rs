//! Admin-side list of direct inquiries.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::models::{ChatSession, SessionStatus};

/// What a list refresh changed for the caller.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListUpdate {
    /// The selected session is no longer visible
    pub selection_lost: bool,
    /// Status of the selected session after this refresh
    pub selected_status: Option<SessionStatus>,
    /// Sessions that appeared since the previous refresh
    pub new_sessions: Vec<String>,
}

pub struct SessionList {
    sessions: Vec<ChatSession>,
    selected: Option<String>,
    retention: chrono::Duration,
    // Deleted locally; hidden even if a stale poll still returns them
    deleted: HashSet<String>,
    hidden_count: usize,
}

impl SessionList {
    pub fn new(retention: chrono::Duration) -> Self {
        SessionList {
            sessions: Vec::new(),
            selected: None,
            retention,
            deleted: HashSet::new(),
            hidden_count: 0,
        }
    }

    /// Closed sessions idle for longer than the retention window are hidden.
    /// Server data is untouched.
    pub fn is_visible(&self, session: &ChatSession, now: DateTime<Utc>) -> bool {
        if self.deleted.contains(&session.id) {
            return false;
        }
        !(session.status == SessionStatus::Closed && now - session.last_activity > self.retention)
    }

    /// Replaces the list with a fresh fetch, keeping the backend's order.
    pub fn apply_poll(&mut self, fetched: Vec<ChatSession>, now: DateTime<Utc>) -> ListUpdate {
        let previous: HashMap<String, SessionStatus> =
            self.sessions.iter().map(|s| (s.id.clone(), s.status)).collect();

        let total = fetched.len();
        let mut seen = HashSet::new();
        let visible: Vec<ChatSession> = fetched
            .into_iter()
            .filter(|s| seen.insert(s.id.clone()))
            .filter(|s| self.is_visible(s, now))
            .collect();
        self.hidden_count = total - visible.len();

        let mut update = ListUpdate::default();
        for session in &visible {
            match previous.get(&session.id) {
                Some(old) if *old != session.status => {
                    if old.can_transition_to(session.status) {
                        info!("Inquiry {} is now {}", session.id, session.status.label());
                    } else {
                        // Backend is authoritative; accept but note it
                        warn!(
                            "Inquiry {} moved backwards from {} to {}",
                            session.id,
                            old.label(),
                            session.status.label()
                        );
                    }
                }
                Some(_) => {}
                None => update.new_sessions.push(session.id.clone()),
            }
        }

        self.sessions = visible;

        if let Some(selected) = &self.selected {
            match self.sessions.iter().find(|s| &s.id == selected) {
                Some(session) => update.selected_status = Some(session.status),
                None => {
                    debug!("Selected inquiry {} left the list", selected);
                    self.selected = None;
                    update.selection_lost = true;
                }
            }
        }

        update
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Selects a listed session. Returns false for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&ChatSession> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.sessions.iter().position(|s| s.id == id)
    }

    /// Picks the persisted selection if nothing is selected and it is listed.
    pub fn restore_selection(&mut self, persisted: Option<&str>) -> Option<String> {
        if self.selected.is_some() {
            return None;
        }
        let id = persisted?;
        if self.select(id) {
            info!("Restored selection of inquiry {}", id);
            Some(id.to_string())
        } else {
            None
        }
    }

    /// Local view of a close request, until the next poll confirms it.
    pub fn mark_closed(&mut self, id: &str) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.status = SessionStatus::Closed;
            session.last_activity = Utc::now();
        }
    }

    /// Terminal local state: the row is removed and never shown again.
    pub fn mark_deleted(&mut self, id: &str) {
        self.deleted.insert(id.to_string());
        self.sessions.retain(|s| s.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains(id)
    }

    /// Status as the UI should show it, `Deleted` included.
    pub fn status_of(&self, id: &str) -> Option<SessionStatus> {
        if self.deleted.contains(id) {
            return Some(SessionStatus::Deleted);
        }
        self.get(id).map(|s| s.status)
    }

    pub fn count(&self, status: SessionStatus) -> usize {
        self.sessions.iter().filter(|s| s.status == status).count()
    }

    /// Rows filtered out by the last refresh.
    pub fn hidden_count(&self) -> usize {
        self.hidden_count
    }
}
