// Inquiry desk tests: list and message polling, selection, replies
// Time is paused so poll intervals advance instantly

mod common;
use common::{setup_logging, FakeBackend};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use supportdesk::models::{Message, SenderRole, SessionStatus};
use supportdesk::relay::{DeskEvent, DeskSettings, InquiryDesk};
use supportdesk::storage::{KeyValueStore, MemoryStore, SELECTED_SESSION_KEY};
use supportdesk::validation::ValidationError;

fn settings() -> DeskSettings {
    DeskSettings {
        list_interval: Duration::from_secs(4),
        message_interval: Duration::from_secs(2),
        retention: chrono::Duration::minutes(5),
    }
}

fn desk_with(backend: &Arc<FakeBackend>, store: &Arc<MemoryStore>) -> InquiryDesk {
    InquiryDesk::new(backend.clone(), store.clone(), settings())
}

/// Lets spawned poll tasks run and applies what they delivered.
async fn settle(desk: &mut InquiryDesk, wait: Duration) {
    tokio::time::sleep(wait).await;
    desk.poll_events();
}

#[tokio::test(start_paused = true)]
async fn test_switching_selection_stops_previous_poll() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Waiting);
    backend.add_session("student_b", SessionStatus::Active);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    assert!(desk.process_next().await);
    assert_eq!(desk.sessions().sessions().len(), 2);

    assert!(desk.select("student_a"));
    settle(&mut desk, Duration::from_millis(4_500)).await;
    let a_calls = backend.count("list_messages:student_a");
    assert!(a_calls >= 3, "expected polls at 0s, 2s and 4s, got {}", a_calls);

    assert!(desk.select("student_b"));
    settle(&mut desk, Duration::from_secs(10)).await;

    assert_eq!(backend.count("list_messages:student_a"), a_calls);
    assert!(backend.count("list_messages:student_b") >= 5);
    assert_eq!(desk.conversation().map(|c| c.session_id()), Some("student_b"));
    assert_eq!(store.get(SELECTED_SESSION_KEY).unwrap().as_deref(), Some("student_b"));
}

#[tokio::test(start_paused = true)]
async fn test_list_poll_runs_without_selection() {
    setup_logging();
    let backend = FakeBackend::new();
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    settle(&mut desk, Duration::from_millis(8_500)).await;
    assert_eq!(backend.count("list_sessions"), 3);
    assert!(desk.sessions().sessions().is_empty());

    // New inquiries show up on the next tick
    backend.add_session("student_new", SessionStatus::Waiting);
    settle(&mut desk, Duration::from_secs(4)).await;
    assert_eq!(desk.sessions().sessions().len(), 1);
    assert!(desk.conversation().is_none());

    desk.stop();
    assert!(!desk.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_stale_messages_are_discarded() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Active);
    backend.add_session("student_b", SessionStatus::Active);
    backend.push_message("student_b", SenderRole::Visitor, "question from b");
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;

    desk.select("student_a");
    let generation_a = desk.generation();
    desk.select("student_b");
    assert!(desk.generation() > generation_a);

    // A response for A that was already on its way
    let late = Message {
        id: "1".to_string(),
        session_id: "student_a".to_string(),
        sender: SenderRole::Visitor,
        body: "question from a".to_string(),
        sent_at: Utc::now(),
    };
    let changed = desk.handle_event(DeskEvent::Messages {
        session_id: "student_a".to_string(),
        generation: generation_a,
        result: Ok(vec![late.clone()]),
    });
    assert!(!changed);

    // Right session id but an old generation is dropped as well
    let changed = desk.handle_event(DeskEvent::Messages {
        session_id: "student_b".to_string(),
        generation: generation_a,
        result: Ok(vec![late]),
    });
    assert!(!changed);

    settle(&mut desk, Duration::from_millis(100)).await;
    let conversation = desk.conversation().unwrap();
    assert_eq!(conversation.session_id(), "student_b");
    let bodies: Vec<&str> = conversation.transcript().iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["question from b"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_response_for_previous_session_never_lands() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Active);
    backend.add_session("student_b", SessionStatus::Active);
    backend.push_message("student_a", SenderRole::Visitor, "slow a");
    backend.push_message("student_b", SenderRole::Visitor, "fast b");
    backend.delay_messages("student_a", Duration::from_secs(3));
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;

    desk.select("student_a");
    settle(&mut desk, Duration::from_secs(1)).await;
    desk.select("student_b");
    settle(&mut desk, Duration::from_secs(5)).await;

    let transcript: Vec<String> = desk.conversation().unwrap().transcript().iter().map(|m| m.body.clone()).collect();
    assert_eq!(transcript, vec!["fast b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_selection_is_restored() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Waiting);
    backend.add_session("student_b", SessionStatus::Active);
    backend.push_message("student_b", SenderRole::Visitor, "still there?");
    let store = Arc::new(MemoryStore::new());
    store.set(SELECTED_SESSION_KEY, "student_b").unwrap();
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    assert_eq!(desk.sessions().selected_id(), Some("student_b"));
    assert!(desk.is_polling_messages());

    settle(&mut desk, Duration::from_millis(100)).await;
    assert_eq!(desk.conversation().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_selection_missing_from_list() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Waiting);
    let store = Arc::new(MemoryStore::new());
    store.set(SELECTED_SESSION_KEY, "student_gone").unwrap();
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    assert_eq!(desk.sessions().selected_id(), None);
    assert!(desk.conversation().is_none());
    assert_eq!(backend.count("list_messages:student_gone"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_old_closed_sessions_hidden_without_delete() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_open", SessionStatus::Waiting);
    backend.add_session_at("student_recent", SessionStatus::Closed, Utc::now() - chrono::Duration::minutes(2));
    backend.add_session_at("student_old", SessionStatus::Closed, Utc::now() - chrono::Duration::minutes(6));
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;

    let ids: Vec<&str> = desk.sessions().sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["student_open", "student_recent"]);
    assert_eq!(desk.sessions().hidden_count(), 1);
    assert!(backend.calls().iter().all(|c| !c.starts_with("delete_chat")));
}

#[tokio::test(start_paused = true)]
async fn test_reply_is_optimistic_then_reconciled() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Active);
    backend.push_message("student_a", SenderRole::Visitor, "I need help with enrollment");
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");
    settle(&mut desk, Duration::from_millis(100)).await;

    desk.send_reply("Sure, what do you need?").unwrap();
    {
        let conversation = desk.conversation().unwrap();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.pending_count(), 1);
        assert!(conversation.transcript()[1].is_local());
    }

    // POST result, then the next message poll
    settle(&mut desk, Duration::from_millis(2_100)).await;
    let conversation = desk.conversation().unwrap();
    assert_eq!(conversation.pending_count(), 0);
    let bodies: Vec<&str> = conversation.transcript().iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["I need help with enrollment", "Sure, what do you need?"]);
    assert_eq!(backend.count("post_admin_message:student_a"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_refuses_reply_locally() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Closed);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");

    assert_eq!(desk.send_reply("hello?"), Err(ValidationError::SessionClosed));
    settle(&mut desk, Duration::from_millis(100)).await;
    assert_eq!(backend.count("post_admin_message:student_a"), 0);
    assert!(desk.conversation().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reply_without_selection() {
    setup_logging();
    let backend = FakeBackend::new();
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    assert_eq!(desk.send_reply("hello"), Err(ValidationError::NoSessionSelected));
    assert_eq!(desk.close_selected(), Err(ValidationError::NoSessionSelected));
    assert_eq!(desk.delete_selected(), Err(ValidationError::NoSessionSelected));
}

#[tokio::test(start_paused = true)]
async fn test_close_disables_replies() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Active);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");
    desk.close_selected().unwrap();
    settle(&mut desk, Duration::from_millis(100)).await;

    assert_eq!(backend.count("close_chat:student_a"), 1);
    assert_eq!(desk.conversation().unwrap().status(), SessionStatus::Closed);
    assert_eq!(desk.status_line(), Some("Inquiry closed"));
    assert_eq!(desk.send_reply("one more thing"), Err(ValidationError::SessionClosed));
}

#[tokio::test(start_paused = true)]
async fn test_delete_clears_selection() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Closed);
    backend.add_session("student_b", SessionStatus::Waiting);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");
    desk.delete_selected().unwrap();
    settle(&mut desk, Duration::from_millis(100)).await;

    assert!(desk.conversation().is_none());
    assert_eq!(desk.sessions().selected_id(), None);
    assert_eq!(desk.sessions().status_of("student_a"), Some(SessionStatus::Deleted));
    assert_eq!(store.get(SELECTED_SESSION_KEY).unwrap(), None);
    assert!(!desk.is_polling_messages());

    settle(&mut desk, Duration::from_secs(4)).await;
    let ids: Vec<&str> = desk.sessions().sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["student_b"]);
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_stops_polling() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Waiting);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");

    backend.expire_auth();
    settle(&mut desk, Duration::from_secs(5)).await;

    assert!(desk.auth_expired());
    assert!(!desk.is_polling());
    assert!(!desk.is_polling_messages());

    let calls = backend.calls().len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls().len(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_selected_session_vanishing_clears_selection() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Active);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");
    assert_eq!(store.get(SELECTED_SESSION_KEY).unwrap().as_deref(), Some("student_a"));

    // Removed on the server by someone else
    backend.remove_session("student_a");
    settle(&mut desk, Duration::from_secs(4)).await;

    assert!(desk.conversation().is_none());
    assert_eq!(store.get(SELECTED_SESSION_KEY).unwrap(), None);
    assert_eq!(desk.status_line(), Some("The selected inquiry is no longer available"));
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_login_resumes_selected_poll() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_a", SessionStatus::Active);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    desk.select("student_a");

    backend.expire_auth();
    settle(&mut desk, Duration::from_secs(5)).await;
    assert!(desk.auth_expired());
    assert!(!desk.is_polling_messages());
    desk.stop();

    // Logged in again
    backend.restore_auth();
    backend.push_message("student_a", SenderRole::Visitor, "are you there?");
    desk.start();
    assert!(!desk.auth_expired());
    assert!(desk.is_polling_messages());
    assert_eq!(desk.sessions().selected_id(), Some("student_a"));

    let before = backend.count("list_messages:student_a");
    settle(&mut desk, Duration::from_secs(10)).await;
    assert!(backend.count("list_messages:student_a") >= before + 5);
    let bodies: Vec<String> = desk.conversation().unwrap().transcript().iter().map(|m| m.body.clone()).collect();
    assert_eq!(bodies, vec!["are you there?".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_reply_blocked_reason() {
    setup_logging();
    let backend = FakeBackend::new();
    backend.add_session("student_open", SessionStatus::Waiting);
    backend.add_session("student_done", SessionStatus::Closed);
    let store = Arc::new(MemoryStore::new());
    let mut desk = desk_with(&backend, &store);

    desk.start();
    desk.process_next().await;
    assert_eq!(desk.reply_blocked(), Some(ValidationError::NoSessionSelected));

    desk.select("student_done");
    assert_eq!(desk.reply_blocked(), Some(ValidationError::SessionClosed));

    desk.select("student_open");
    assert_eq!(desk.reply_blocked(), None);
}
