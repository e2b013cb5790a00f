use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a direct inquiry as reported by the backend.
///
/// `Deleted` is never sent by the server: it is the local terminal state
/// reached only through an explicit admin delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Active,
    Closed,
    #[serde(skip)]
    Deleted,
}

impl SessionStatus {
    /// Forward transitions of the inquiry state machine.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Waiting, Active) | (Waiting, Closed) | (Active, Closed) => true,
            (Deleted, _) => false,
            (_, Deleted) => true,
            _ => false,
        }
    }

    pub fn accepts_replies(self) -> bool {
        matches!(self, SessionStatus::Waiting | SessionStatus::Active)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
            SessionStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(rename = "session_id")]
    pub id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    #[serde(alias = "user", alias = "student")]
    Visitor,
    Admin,
    #[serde(alias = "bot")]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(rename = "sender_type")]
    pub sender: SenderRole,
    #[serde(rename = "message")]
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Builds a message that only exists on this client until the next poll.
    pub fn local(session_id: &str, sender: SenderRole, body: &str) -> Self {
        Message {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            session_id: session_id.to_string(),
            sender,
            body: body.to_string(),
            sent_at: Utc::now(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.id.starts_with("local-")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickOption {
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

// The backend uses integer primary keys, local entries use strings
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid message id: {}", other))),
    }
}

fn default_active() -> bool {
    true
}

// Replies from the chatbot endpoints

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AdminUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub chunks: Option<u32>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
    pub filename: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentConversation {
    pub question: String,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub total_conversations: u64,
    #[serde(default)]
    pub recent_conversations: Vec<RecentConversation>,
}
