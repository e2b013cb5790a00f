// Direct inquiries: live escalation threads between a visitor and an admin

use log::info;
use reqwest::Method;
use serde_json::json;

use super::{send_json, send_unit, SessionFilter, SupportApi};
use crate::error::ApiResult;
use crate::models::{ChatSession, Message};
use crate::validation::normalize_message;

impl SupportApi {
    /// All direct chats in the backend's order, optionally narrowed by status.
    pub async fn list_sessions(&self, filter: Option<&SessionFilter>) -> ApiResult<Vec<ChatSession>> {
        let sessions: Vec<ChatSession> = send_json(self.authed(Method::GET, "/admin/direct-chats")?).await?;
        Ok(match filter {
            Some(filter) => sessions.into_iter().filter(|s| filter.matches(s)).collect(),
            None => sessions,
        })
    }

    pub async fn list_messages(&self, session_id: &str) -> ApiResult<Vec<Message>> {
        let request = self.authed_segments(Method::GET, &["admin", "direct-chats", session_id, "messages"])?;
        let mut messages: Vec<Message> = send_json(request).await?;
        // Older backends omit the parent id on each row
        for message in messages.iter_mut().filter(|m| m.session_id.is_empty()) {
            message.session_id = session_id.to_string();
        }
        Ok(messages)
    }

    pub async fn post_admin_message(&self, session_id: &str, text: &str) -> ApiResult<Message> {
        let text = normalize_message(text)?;
        let request = self
            .authed_segments(Method::POST, &["admin", "direct-chats", session_id, "messages"])?
            .json(&json!({ "message": text }));
        let mut message: Message = send_json(request).await?;
        if message.session_id.is_empty() {
            message.session_id = session_id.to_string();
        }
        Ok(message)
    }

    /// Asks the backend to move the inquiry to `closed`.
    pub async fn close_chat(&self, session_id: &str) -> ApiResult<()> {
        send_unit(self.authed_segments(Method::POST, &["admin", "direct-chats", session_id, "close"])?).await?;
        info!("Closed direct chat {}", session_id);
        Ok(())
    }

    pub async fn delete_chat(&self, session_id: &str) -> ApiResult<()> {
        send_unit(self.authed_segments(Method::DELETE, &["admin", "direct-chats", session_id])?).await?;
        info!("Deleted direct chat {}", session_id);
        Ok(())
    }
}
