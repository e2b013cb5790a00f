use reqwest::Method;
use serde_json::json;

use super::{send_json, send_unit, SupportApi};
use crate::error::ApiResult;
use crate::models::QuickOption;
use crate::validation::ValidationError;

impl SupportApi {
    /// Public list used by the visitor chat, inactive entries included.
    pub async fn list_chat_options(&self) -> ApiResult<Vec<QuickOption>> {
        send_json(self.public(Method::GET, "/api/chat-options")).await
    }

    pub async fn create_chat_option(&self, label: &str, order: i64) -> ApiResult<QuickOption> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ValidationError::EmptyLabel.into());
        }
        let request = self
            .authed(Method::POST, "/api/admin/chat-options")?
            .json(&json!({ "label": label, "order": order }));
        send_json(request).await
    }

    pub async fn delete_chat_option(&self, id: i64) -> ApiResult<()> {
        let path = format!("/api/admin/chat-options/{}", id);
        send_unit(self.authed(Method::DELETE, &path)?).await
    }
}
