//! Per-installation visitor identity.

use log::warn;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::storage::{KeyValueStore, SESSION_ID_KEY};

const SESSION_PREFIX: &str = "student_";

pub fn generate_session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    format!("{}{}", SESSION_PREFIX, suffix)
}

/// Returns the stored visitor session id, creating it on first use.
///
/// Never fails: if the store cannot be read or written a fresh id is
/// returned so that sending a message is never blocked on storage.
pub fn get_or_create_session_id(store: &dyn KeyValueStore) -> String {
    match store.get(SESSION_ID_KEY) {
        Ok(Some(id)) if !id.trim().is_empty() => return id,
        Ok(_) => {}
        Err(e) => {
            warn!("Session id storage unavailable, using a fresh id: {}", e);
            return generate_session_id();
        }
    }

    let id = generate_session_id();
    if let Err(e) = store.set(SESSION_ID_KEY, &id) {
        warn!("Could not persist session id {}: {}", id, e);
    }
    id
}

/// Ids for admin test-chat runs, kept apart from visitor sessions.
pub fn test_chat_session_id() -> String {
    format!("admin_test_{}", uuid::Uuid::new_v4())
}
