// REST client for the support backend
// One module per resource family; `SupportBackend` is the seam the relay is written against

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::models::{ChatReply, ChatSession, Message, QuickOption, SessionStatus};

pub mod analytics;
pub mod auth;
pub mod chat;
pub mod direct;
pub mod documents;
pub mod options;

/// Restricts `list_sessions` to some statuses; applied client-side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    pub statuses: Vec<SessionStatus>,
}

impl SessionFilter {
    pub fn open() -> Self {
        SessionFilter { statuses: vec![SessionStatus::Waiting, SessionStatus::Active] }
    }

    pub fn matches(&self, session: &ChatSession) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&session.status)
    }
}

/// Operations the messaging relay needs from the backend.
#[async_trait]
pub trait SupportBackend: Send + Sync {
    async fn list_sessions(&self, filter: Option<&SessionFilter>) -> ApiResult<Vec<ChatSession>>;
    async fn list_messages(&self, session_id: &str) -> ApiResult<Vec<Message>>;
    async fn post_admin_message(&self, session_id: &str, text: &str) -> ApiResult<Message>;
    async fn post_visitor_message(&self, session_id: &str, text: &str) -> ApiResult<ChatReply>;
    async fn close_chat(&self, session_id: &str) -> ApiResult<()>;
    async fn delete_chat(&self, session_id: &str) -> ApiResult<()>;
    async fn list_chat_options(&self) -> ApiResult<Vec<QuickOption>>;
    async fn create_chat_option(&self, label: &str, order: i64) -> ApiResult<QuickOption>;
    async fn delete_chat_option(&self, id: i64) -> ApiResult<()>;
}

#[derive(Clone)]
pub struct SupportApi {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl SupportApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("supportdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(SupportApi {
            http,
            base_url: crate::config::normalize_base_url(base_url),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unauthenticated request.
    pub(crate) fn public(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.http.request(method, self.url(path))
    }

    /// `base/seg/seg` with every segment percent-encoded, for opaque ids.
    pub(crate) fn segment_url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Network(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn bearer_token(&self) -> ApiResult<String> {
        self.token
            .read()
            .ok()
            .and_then(|t| t.clone())
            .ok_or_else(|| ApiError::Auth("not logged in".to_string()))
    }

    /// Request carrying the admin bearer token. Fails locally if not logged in.
    pub(crate) fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let token = self.bearer_token()?;
        Ok(self.public(method, path).bearer_auth(token))
    }

    /// Like `authed`, for paths that embed caller-supplied ids.
    pub(crate) fn authed_segments(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let token = self.bearer_token()?;
        let url = self.segment_url(segments)?;
        debug!("{} {}", method, url.path());
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

/// Sends the request and maps transport and status failures.
pub(crate) async fn send(request: RequestBuilder) -> ApiResult<Response> {
    let response = request.send().await.map_err(|e| {
        warn!("Request failed: {}", e);
        ApiError::Network(e.to_string())
    })?;
    check_status(response).await
}

pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
    let response = send(request).await?;
    let body = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| {
        warn!("Could not decode response body: {} ({})", e, truncate(&body, 200));
        ApiError::Decode(e.to_string())
    })
}

/// For endpoints that answer with a status message we do not need.
pub(crate) async fn send_unit(request: RequestBuilder) -> ApiResult<()> {
    send(request).await.map(|_| ())
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body).unwrap_or_else(|| {
        status.canonical_reason().unwrap_or("request failed").to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Auth(detail)),
        _ => Err(ApiError::Server { status: status.as_u16(), detail }),
    }
}

/// Extracts FastAPI's `detail`, either a string or a list of `{msg}` entries.
pub fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        other => Some(other.to_string()),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl SupportBackend for SupportApi {
    async fn list_sessions(&self, filter: Option<&SessionFilter>) -> ApiResult<Vec<ChatSession>> {
        SupportApi::list_sessions(self, filter).await
    }

    async fn list_messages(&self, session_id: &str) -> ApiResult<Vec<Message>> {
        SupportApi::list_messages(self, session_id).await
    }

    async fn post_admin_message(&self, session_id: &str, text: &str) -> ApiResult<Message> {
        SupportApi::post_admin_message(self, session_id, text).await
    }

    async fn post_visitor_message(&self, session_id: &str, text: &str) -> ApiResult<ChatReply> {
        SupportApi::post_visitor_message(self, session_id, text).await
    }

    async fn close_chat(&self, session_id: &str) -> ApiResult<()> {
        SupportApi::close_chat(self, session_id).await
    }

    async fn delete_chat(&self, session_id: &str) -> ApiResult<()> {
        SupportApi::delete_chat(self, session_id).await
    }

    async fn list_chat_options(&self) -> ApiResult<Vec<QuickOption>> {
        SupportApi::list_chat_options(self).await
    }

    async fn create_chat_option(&self, label: &str, order: i64) -> ApiResult<QuickOption> {
        SupportApi::create_chat_option(self, label, order).await
    }

    async fn delete_chat_option(&self, id: i64) -> ApiResult<()> {
        SupportApi::delete_chat_option(self, id).await
    }
}
