// Common test utilities for integration tests
// Not every test file uses every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::LevelFilter;

use supportdesk::api::{SessionFilter, SupportBackend};
use supportdesk::error::{ApiError, ApiResult};
use supportdesk::models::{ChatReply, ChatSession, Message, QuickOption, SenderRole, SessionStatus};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

pub fn session(id: &str, status: SessionStatus, last_activity: DateTime<Utc>) -> ChatSession {
    ChatSession {
        id: id.to_string(),
        status,
        created_at: last_activity - chrono::Duration::minutes(30),
        last_activity,
        user_ip: None,
    }
}

/// In-memory backend that records every call as `operation:argument`.
#[derive(Default)]
pub struct FakeBackend {
    sessions: Mutex<Vec<ChatSession>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    options: Mutex<Vec<QuickOption>>,
    calls: Mutex<Vec<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    auth_expired: AtomicBool,
    options_down: AtomicBool,
    chat_down: AtomicBool,
    next_id: AtomicI64,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeBackend { next_id: AtomicI64::new(100), ..Default::default() })
    }

    pub fn add_session(&self, id: &str, status: SessionStatus) {
        self.add_session_at(id, status, Utc::now());
    }

    pub fn add_session_at(&self, id: &str, status: SessionStatus, last_activity: DateTime<Utc>) {
        self.sessions.lock().unwrap().push(session(id, status, last_activity));
    }

    pub fn push_message(&self, session_id: &str, sender: SenderRole, body: &str) -> Message {
        let message = Message {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            session_id: session_id.to_string(),
            sender,
            body: body.to_string(),
            sent_at: Utc::now(),
        };
        self.messages
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    /// Drops a session as if another admin deleted it.
    pub fn remove_session(&self, id: &str) {
        self.sessions.lock().unwrap().retain(|s| s.id != id);
    }

    pub fn set_options(&self, options: Vec<QuickOption>) {
        *self.options.lock().unwrap() = options;
    }

    /// Delays every `list_messages` call for one session.
    pub fn delay_messages(&self, session_id: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(session_id.to_string(), delay);
    }

    pub fn expire_auth(&self) {
        self.auth_expired.store(true, Ordering::SeqCst);
    }

    pub fn restore_auth(&self) {
        self.auth_expired.store(false, Ordering::SeqCst);
    }

    pub fn take_options_down(&self) {
        self.options_down.store(true, Ordering::SeqCst);
    }

    pub fn take_chat_down(&self) {
        self.chat_down.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_auth(&self) -> ApiResult<()> {
        if self.auth_expired.load(Ordering::SeqCst) {
            Err(ApiError::Auth("Could not validate credentials".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SupportBackend for FakeBackend {
    async fn list_sessions(&self, filter: Option<&SessionFilter>) -> ApiResult<Vec<ChatSession>> {
        self.record("list_sessions".to_string());
        self.check_auth()?;
        let sessions = self.sessions.lock().unwrap().clone();
        Ok(sessions.into_iter().filter(|s| filter.map(|f| f.matches(s)).unwrap_or(true)).collect())
    }

    async fn list_messages(&self, session_id: &str) -> ApiResult<Vec<Message>> {
        self.record(format!("list_messages:{}", session_id));
        let delay = self.delays.lock().unwrap().get(session_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_auth()?;
        Ok(self.messages.lock().unwrap().get(session_id).cloned().unwrap_or_default())
    }

    async fn post_admin_message(&self, session_id: &str, text: &str) -> ApiResult<Message> {
        self.record(format!("post_admin_message:{}", session_id));
        self.check_auth()?;
        Ok(self.push_message(session_id, SenderRole::Admin, text))
    }

    async fn post_visitor_message(&self, session_id: &str, text: &str) -> ApiResult<ChatReply> {
        self.record(format!("post_visitor_message:{}:{}", session_id, text));
        if self.chat_down.load(Ordering::SeqCst) {
            return Err(ApiError::Server { status: 500, detail: "Internal Server Error".to_string() });
        }
        Ok(ChatReply {
            answer: format!("Answer to: {}", text),
            sources: vec![],
            response_time_ms: Some(420),
            session_id: Some(session_id.to_string()),
        })
    }

    async fn close_chat(&self, session_id: &str) -> ApiResult<()> {
        self.record(format!("close_chat:{}", session_id));
        self.check_auth()?;
        for s in self.sessions.lock().unwrap().iter_mut().filter(|s| s.id == session_id) {
            s.status = SessionStatus::Closed;
            s.last_activity = Utc::now();
        }
        Ok(())
    }

    async fn delete_chat(&self, session_id: &str) -> ApiResult<()> {
        self.record(format!("delete_chat:{}", session_id));
        self.check_auth()?;
        self.sessions.lock().unwrap().retain(|s| s.id != session_id);
        self.messages.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn list_chat_options(&self) -> ApiResult<Vec<QuickOption>> {
        self.record("list_chat_options".to_string());
        if self.options_down.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        Ok(self.options.lock().unwrap().clone())
    }

    async fn create_chat_option(&self, label: &str, order: i64) -> ApiResult<QuickOption> {
        self.record(format!("create_chat_option:{}:{}", label, order));
        self.check_auth()?;
        let option = QuickOption {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            label: label.to_string(),
            order,
            is_active: true,
        };
        self.options.lock().unwrap().push(option.clone());
        Ok(option)
    }

    async fn delete_chat_option(&self, id: i64) -> ApiResult<()> {
        self.record(format!("delete_chat_option:{}", id));
        self.check_auth()?;
        self.options.lock().unwrap().retain(|o| o.id != id);
        Ok(())
    }
}

/// Requests seen by a fake HTTP server, as `METHOD path` lines.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

pub fn request_log() -> RequestLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{}", addr)
}
