use anyhow::Result;
use log::{info, warn};

use crate::models::LoginResponse;
use crate::storage::{KeyValueStore, ACCESS_TOKEN_KEY, ADMIN_EMAIL_KEY};

/// Admin login remembered between runs. Passwords are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLogin {
    pub email: String,
    pub access_token: String,
}

pub fn save_login(store: &dyn KeyValueStore, login: &LoginResponse) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, &login.access_token)?;
    store.set(ADMIN_EMAIL_KEY, &login.user.email)?;
    info!("Login saved for {}", login.user.email);
    Ok(())
}

pub fn load_login(store: &dyn KeyValueStore) -> Result<Option<StoredLogin>> {
    let token = match store.get(ACCESS_TOKEN_KEY)? {
        Some(token) if !token.is_empty() => token,
        _ => return Ok(None),
    };
    let email = store.get(ADMIN_EMAIL_KEY)?.unwrap_or_default();
    Ok(Some(StoredLogin { email, access_token: token }))
}

/// Forgets the token; the email is kept to prefill the next prompt.
pub fn clear_login(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(ACCESS_TOKEN_KEY) {
        warn!("Failed to clear stored token: {}", e);
    }
}

pub fn last_email(store: &dyn KeyValueStore) -> Option<String> {
    store.get(ADMIN_EMAIL_KEY).ok().flatten().filter(|e| !e.is_empty())
}
