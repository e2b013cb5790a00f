use reqwest::Method;
use serde_json::json;

use super::{send_json, SupportApi};
use crate::error::ApiResult;
use crate::models::ChatReply;
use crate::validation::normalize_message;

impl SupportApi {
    /// Visitor question to the public chatbot endpoint.
    pub async fn post_visitor_message(&self, session_id: &str, text: &str) -> ApiResult<ChatReply> {
        let text = normalize_message(text)?;
        let request = self
            .public(Method::POST, "/chat/student")
            .json(&json!({ "message": text, "session_id": session_id }));
        send_json(request).await
    }

    /// Admin dry run against the same knowledge base, with timing.
    pub async fn test_chat(&self, session_id: &str, text: &str) -> ApiResult<ChatReply> {
        let text = normalize_message(text)?;
        let request = self
            .authed(Method::POST, "/admin/student/test-chat")?
            .json(&json!({ "message": text, "session_id": session_id }));
        send_json(request).await
    }
}
