//! Messages of the selected inquiry, with optimistic admin replies.
//!
//! Server messages are the source of truth and are kept in the order the
//! backend returns them. Replies typed by the admin are shown at once as
//! local entries and dropped again when a poll returns the matching server
//! copy.

use log::debug;
use std::collections::HashSet;

use crate::models::{Message, SenderRole, SessionStatus};
use crate::validation::{normalize_message, ValidationError};

/// Width of the timestamp bucket used to match local and server copies.
pub const DEDUP_BUCKET_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub sender: SenderRole,
    pub body: String,
    pub bucket: i64,
}

impl DedupKey {
    pub fn of(message: &Message) -> Self {
        DedupKey {
            sender: message.sender,
            body: message.body.trim().to_string(),
            bucket: message.sent_at.timestamp().div_euclid(DEDUP_BUCKET_SECS),
        }
    }

    /// Same sender and body, timestamps in the same or a neighbouring bucket.
    /// Clock skew between client and server can push a copy across a
    /// bucket edge.
    pub fn matches(&self, other: &DedupKey) -> bool {
        self.sender == other.sender && self.body == other.body && (self.bucket - other.bucket).abs() <= 1
    }
}

pub struct Conversation {
    session_id: String,
    status: SessionStatus,
    confirmed: Vec<Message>,
    pending: Vec<Message>,
}

impl Conversation {
    pub fn new(session_id: &str, status: SessionStatus) -> Self {
        Conversation {
            session_id: session_id.to_string(),
            status,
            confirmed: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub fn can_reply(&self) -> bool {
        self.status.accepts_replies()
    }

    /// Applies a full message list from the backend. Returns true when the
    /// visible transcript changed.
    pub fn apply_poll(&mut self, fetched: Vec<Message>) -> bool {
        let before: Vec<String> = self.transcript().iter().map(|m| m.id.clone()).collect();
        // Server copies seen earlier already answered for their own reply
        let known: HashSet<String> = self.confirmed.iter().map(|m| m.id.clone()).collect();

        let mut seen = HashSet::new();
        let mut merged: Vec<Message> = fetched
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .map(|mut m| {
                if m.session_id.is_empty() {
                    m.session_id = self.session_id.clone();
                }
                m
            })
            .collect();

        // A reply confirmed by its POST may not be listed yet; history never shrinks
        for old in self.confirmed.drain(..) {
            if seen.insert(old.id.clone()) {
                merged.push(old);
            }
        }
        self.confirmed = merged;

        let mut claimed: Vec<bool> = self.confirmed.iter().map(|m| known.contains(&m.id)).collect();
        let confirmed = &self.confirmed;
        let before_pending = self.pending.len();
        self.pending.retain(|local| {
            let key = DedupKey::of(local);
            let hit = confirmed
                .iter()
                .enumerate()
                .find(|(i, server)| !claimed[*i] && DedupKey::of(server).matches(&key));
            match hit {
                Some((i, _)) => {
                    claimed[i] = true;
                    false
                }
                None => true,
            }
        });
        if self.pending.len() != before_pending {
            debug!(
                "Reconciled {} local replies in {}",
                before_pending - self.pending.len(),
                self.session_id
            );
        }

        let after: Vec<String> = self.transcript().iter().map(|m| m.id.clone()).collect();
        before != after
    }

    /// Server messages followed by replies still waiting for confirmation.
    pub fn transcript(&self) -> Vec<&Message> {
        self.confirmed.iter().chain(self.pending.iter()).collect()
    }

    pub fn len(&self) -> usize {
        self.confirmed.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Appends an admin reply locally. Refused for closed inquiries.
    pub fn push_optimistic(&mut self, text: &str) -> Result<Message, ValidationError> {
        if !self.can_reply() {
            return Err(ValidationError::SessionClosed);
        }
        let body = normalize_message(text)?;
        let local = Message::local(&self.session_id, SenderRole::Admin, &body);
        self.pending.push(local.clone());
        Ok(local)
    }

    /// Swaps a local entry for the server's copy returned by the POST.
    pub fn confirm(&mut self, local_id: &str, mut server: Message) {
        self.pending.retain(|m| m.id != local_id);
        if server.session_id.is_empty() {
            server.session_id = self.session_id.clone();
        }
        if !self.confirmed.iter().any(|m| m.id == server.id) {
            self.confirmed.push(server);
        }
    }

    /// Drops a local entry whose POST failed.
    pub fn fail(&mut self, local_id: &str) -> Option<Message> {
        let idx = self.pending.iter().position(|m| m.id == local_id)?;
        Some(self.pending.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn server_msg(id: &str, sender: SenderRole, body: &str, secs: i64) -> Message {
        Message {
            id: id.to_string(),
            session_id: String::new(),
            sender,
            body: body.to_string(),
            sent_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_transcript_keeps_backend_order() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Active);
        // Backend order wins even when timestamps disagree
        let changed = conv.apply_poll(vec![
            server_msg("2", SenderRole::Visitor, "hello?", 10),
            server_msg("1", SenderRole::Admin, "hi there", 5),
            server_msg("2", SenderRole::Visitor, "hello?", 10),
        ]);
        assert!(changed);
        let ids: Vec<&str> = conv.transcript().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(conv.transcript()[0].session_id, "student_abc");

        assert!(!conv.apply_poll(vec![
            server_msg("2", SenderRole::Visitor, "hello?", 10),
            server_msg("1", SenderRole::Admin, "hi there", 5),
        ]));
    }

    #[test]
    fn test_optimistic_reply_reconciled_once() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Active);
        let local = conv.push_optimistic("  We are on it  ").unwrap();
        assert!(local.is_local());
        assert_eq!(local.body, "We are on it");
        assert_eq!(conv.pending_count(), 1);

        let mut echoed = local.clone();
        echoed.id = "41".to_string();
        echoed.sent_at = local.sent_at + Duration::seconds(3);
        conv.apply_poll(vec![echoed]);

        assert_eq!(conv.pending_count(), 0);
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.transcript()[0].id, "41");
    }

    #[test]
    fn test_identical_replies_need_two_server_copies() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Active);
        let first = conv.push_optimistic("ok").unwrap();
        conv.push_optimistic("ok").unwrap();

        let mut echoed = first.clone();
        echoed.id = "7".to_string();
        conv.apply_poll(vec![echoed]);
        assert_eq!(conv.pending_count(), 1);
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_repeated_reply_survives_poll_of_first_copy() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Active);
        let first = conv.push_optimistic("ok").unwrap();
        let mut server = first.clone();
        server.id = "1".to_string();
        conv.confirm(&first.id, server.clone());

        let second = conv.push_optimistic("ok").unwrap();
        assert_eq!(conv.len(), 2);

        // Only the first copy is listed; the second POST has not landed
        conv.apply_poll(vec![server.clone()]);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.pending_count(), 1);

        // Its failure can still be reported
        let failed = conv.fail(&second.id).unwrap();
        assert_eq!(failed.body, "ok");
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_new_server_copy_still_claims_pending_reply() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Active);
        let first = conv.push_optimistic("ok").unwrap();
        let mut copy_one = first.clone();
        copy_one.id = "1".to_string();
        conv.apply_poll(vec![copy_one.clone()]);
        assert_eq!(conv.pending_count(), 0);

        let second = conv.push_optimistic("ok").unwrap();
        let mut copy_two = second.clone();
        copy_two.id = "2".to_string();
        conv.apply_poll(vec![copy_one, copy_two]);
        assert_eq!(conv.pending_count(), 0);
        let ids: Vec<&str> = conv.transcript().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_neighbour_bucket_matches() {
        let a = DedupKey::of(&server_msg("a", SenderRole::Admin, "x", 29));
        let b = DedupKey::of(&server_msg("b", SenderRole::Admin, "x ", 31));
        let far = DedupKey::of(&server_msg("c", SenderRole::Admin, "x", 125));
        let other_sender = DedupKey::of(&server_msg("d", SenderRole::Visitor, "x", 29));
        assert!(a.matches(&b));
        assert!(!a.matches(&far));
        assert!(!a.matches(&other_sender));
    }

    #[test]
    fn test_closed_conversation_refuses_replies() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Closed);
        assert!(!conv.can_reply());
        assert_eq!(conv.push_optimistic("hello"), Err(ValidationError::SessionClosed));
        assert!(conv.is_empty());

        conv.set_status(SessionStatus::Active);
        assert_eq!(conv.push_optimistic("   "), Err(ValidationError::EmptyMessage));
    }

    #[test]
    fn test_confirm_and_fail() {
        let mut conv = Conversation::new("student_abc", SessionStatus::Waiting);
        let a = conv.push_optimistic("first").unwrap();
        let b = conv.push_optimistic("second").unwrap();

        let server = server_msg("90", SenderRole::Admin, "first", 0);
        conv.confirm(&a.id, server.clone());
        assert_eq!(conv.pending_count(), 1);

        let failed = conv.fail(&b.id).unwrap();
        assert_eq!(failed.body, "second");
        assert!(conv.fail(&b.id).is_none());

        // Confirmed reply survives a poll that does not list it yet
        conv.apply_poll(vec![server_msg("89", SenderRole::Visitor, "help", 0)]);
        let ids: Vec<&str> = conv.transcript().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["89", "90"]);

        // Once listed it is not duplicated
        conv.apply_poll(vec![server_msg("89", SenderRole::Visitor, "help", 0), server]);
        assert_eq!(conv.len(), 2);
    }
}
