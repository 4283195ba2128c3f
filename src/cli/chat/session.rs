use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use super::conversation_state::{Message, Phase, SessionState};
use crate::support_client::{ChatBackend, ChatError};

pub const SEED_GREETING: &str = "Hi, I'm here to support you. How are you feeling today?";

/// The only error text the user ever sees, whatever went wrong.
pub const USER_FACING_ERROR: &str = "Failed to get response. Please try again.";

/// Notifications sent to subscribers whenever the session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MessageAppended(Message),
    WaitingChanged(bool),
    ErrorRaised(String),
    ErrorCleared,
    /// The message list grew; views should bring the newest entry into sight.
    ScrollToLatest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or a reply was still pending. Nothing changed.
    Rejected,
    Replied,
    Failed,
}

/// Proof that a submission was accepted. Hand it back to
/// [`ChatSession::complete`] once the backend has answered.
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    message: String,
}

impl PendingReply {
    pub fn message(&self) -> &str {
        &self.message
    }
}

pub struct ChatSession {
    state: SessionState,
    in_flight: Option<u64>,
    next_request_id: u64,
    subscribers: Vec<UnboundedSender<SessionEvent>>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_greeting(SEED_GREETING)
    }

    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            state: SessionState::seeded(greeting),
            in_flight: None,
            next_request_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.state.is_waiting_for_reply()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Register an observer. Events are buffered until the receiver drains them.
    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.state.set_pending_input(text.into());
    }

    /// Accept a user message: append it, clear the last error and enter Waiting.
    ///
    /// Returns `None` without touching the state when the trimmed text is empty
    /// or a reply is still pending.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingReply> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.in_flight.is_some() {
            debug!("Ignoring submission while a reply is pending");
            return None;
        }

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(id);

        if self.state.last_error().is_some() {
            self.state.set_last_error(None);
            self.notify(SessionEvent::ErrorCleared);
        }
        self.append(Message::user(text));
        self.state.set_waiting(true);
        self.notify(SessionEvent::WaitingChanged(true));

        Some(PendingReply {
            id,
            message: text.to_string(),
        })
    }

    /// Like [`begin_submit`](Self::begin_submit), taking the text from the draft.
    /// The draft is cleared only if the submission is accepted.
    pub fn begin_submit_pending_input(&mut self) -> Option<PendingReply> {
        let draft = self.state.pending_input().to_string();
        let pending = self.begin_submit(&draft)?;
        self.state.take_pending_input();
        Some(pending)
    }

    /// Resolve the request identified by `pending` and return to Idle.
    pub fn complete(
        &mut self,
        pending: PendingReply,
        outcome: Result<String, ChatError>,
    ) -> SubmitOutcome {
        if self.in_flight != Some(pending.id) {
            debug!("Dropping reply for request {} which is not in flight", pending.id);
            return SubmitOutcome::Rejected;
        }
        self.in_flight = None;

        let result = match outcome {
            Ok(reply) => {
                self.append(Message::assistant(reply));
                SubmitOutcome::Replied
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                self.state.set_last_error(Some(USER_FACING_ERROR.to_string()));
                self.notify(SessionEvent::ErrorRaised(USER_FACING_ERROR.to_string()));
                SubmitOutcome::Failed
            }
        };

        self.state.set_waiting(false);
        self.notify(SessionEvent::WaitingChanged(false));
        result
    }

    /// Submit `text` and wait for the backend to answer.
    pub async fn submit<B>(&mut self, backend: &B, text: &str) -> SubmitOutcome
    where
        B: ChatBackend + ?Sized,
    {
        let Some(pending) = self.begin_submit(text) else {
            return SubmitOutcome::Rejected;
        };
        let outcome = backend.send_message(pending.message()).await;
        self.complete(pending, outcome)
    }

    fn append(&mut self, message: Message) {
        self.state.push(message.clone());
        self.notify(SessionEvent::MessageAppended(message));
        self.notify(SessionEvent::ScrollToLatest);
    }

    fn notify(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::cli::chat::conversation_state::Sender;

    /// Replies with a fixed outcome and records every message it was sent.
    struct MockBackend {
        reply: Option<String>,
        sent: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn send_message(&self, message: &str) -> Result<String, ChatError> {
            self.sent.lock().unwrap().push(message.to_string());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(ChatError::Server {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                }),
            }
        }
    }

    fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_new_session_is_seeded() {
        let session = ChatSession::new();
        assert_eq!(session.messages(), &[Message::assistant(SEED_GREETING)]);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_begin_submit_appends_user_message_immediately() {
        let mut session = ChatSession::new();
        let pending = session.begin_submit("  I feel anxious \n").unwrap();

        assert_eq!(pending.message(), "I feel anxious");
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1], Message::user("I feel anxious"));
        assert!(session.is_waiting_for_reply());
        assert_eq!(session.phase(), Phase::Waiting);
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut session = ChatSession::new();
        for text in ["", "   ", "\t\n"] {
            assert!(session.begin_submit(text).is_none());
        }
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_waiting_for_reply());
    }

    #[tokio::test]
    async fn test_blank_submit_issues_no_request() {
        let backend = MockBackend::replying("unused");
        let mut session = ChatSession::new();

        assert_eq!(session.submit(&backend, "   ").await, SubmitOutcome::Rejected);
        assert!(backend.sent().is_empty());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_second_submit_while_waiting_is_ignored() {
        let mut session = ChatSession::new();
        let _first = session.begin_submit("first").unwrap();

        assert!(session.begin_submit("second").is_none());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), "first");
        assert!(session.is_waiting_for_reply());
    }

    #[test]
    fn test_success_appends_assistant_reply() {
        let mut session = ChatSession::new();
        let pending = session.begin_submit("hello").unwrap();

        let outcome = session.complete(pending, Ok("X".to_string()));

        assert_eq!(outcome, SubmitOutcome::Replied);
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2], Message::assistant("X"));
        assert!(!session.is_waiting_for_reply());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failure_sets_error_without_reply() {
        let backend = MockBackend::failing();
        let mut session = ChatSession::new();

        let outcome = session.submit(&backend, "hello").await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].sender(), Sender::User);
        assert_eq!(session.last_error(), Some(USER_FACING_ERROR));
        assert!(!session.is_waiting_for_reply());
        assert_eq!(backend.sent(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_next_submit_clears_last_error() {
        let mut session = ChatSession::new();
        session.submit(&MockBackend::failing(), "first").await;
        assert!(session.last_error().is_some());

        let pending = session.begin_submit("second").unwrap();
        assert!(session.last_error().is_none());

        session.complete(pending, Ok("ok".to_string()));
        assert!(session.last_error().is_none());
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_anxious_conversation() {
        let backend = MockBackend::replying("I'm sorry to hear that.");
        let mut session = ChatSession::new();
        assert_eq!(session.messages().len(), 1);

        let outcome = session.submit(&backend, "I feel anxious").await;

        assert_eq!(outcome, SubmitOutcome::Replied);
        assert_eq!(
            session.messages(),
            &[
                Message::assistant(SEED_GREETING),
                Message::user("I feel anxious"),
                Message::assistant("I'm sorry to hear that."),
            ]
        );
        assert!(session.last_error().is_none());
        assert!(!session.is_waiting_for_reply());
        assert_eq!(backend.sent(), vec!["I feel anxious".to_string()]);
    }

    #[test]
    fn test_stale_reply_is_dropped() {
        let mut session = ChatSession::new();
        let first = session.begin_submit("first").unwrap();
        let forged = PendingReply {
            id: first.id + 1,
            message: "forged".to_string(),
        };

        assert_eq!(session.complete(forged, Ok("nope".to_string())), SubmitOutcome::Rejected);
        assert!(session.is_waiting_for_reply());
        assert_eq!(session.messages().len(), 2);

        assert_eq!(session.complete(first, Ok("yes".to_string())), SubmitOutcome::Replied);
        assert_eq!(session.messages()[2].text(), "yes");
    }

    #[test]
    fn test_pending_input_cleared_only_on_accept() {
        let mut session = ChatSession::new();
        session.set_pending_input("   ");
        assert!(session.begin_submit_pending_input().is_none());
        assert_eq!(session.state().pending_input(), "   ");

        session.set_pending_input(" draft ");
        let pending = session.begin_submit_pending_input().unwrap();
        assert_eq!(pending.message(), "draft");
        assert!(session.state().pending_input().is_empty());

        session.set_pending_input("next");
        assert!(session.begin_submit_pending_input().is_none());
        assert_eq!(session.state().pending_input(), "next");
    }

    #[test]
    fn test_events_for_successful_exchange() {
        let mut session = ChatSession::new();
        let mut rx = session.subscribe();

        let pending = session.begin_submit("hi").unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::MessageAppended(Message::user("hi")),
                SessionEvent::ScrollToLatest,
                SessionEvent::WaitingChanged(true),
            ]
        );

        session.complete(pending, Ok("hello".to_string()));
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::MessageAppended(Message::assistant("hello")),
                SessionEvent::ScrollToLatest,
                SessionEvent::WaitingChanged(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_events_for_failed_exchange() {
        let mut session = ChatSession::new();
        let mut rx = session.subscribe();

        session.submit(&MockBackend::failing(), "hi").await;
        let events = drain(&mut rx);
        assert_eq!(
            &events[3..],
            &[
                SessionEvent::ErrorRaised(USER_FACING_ERROR.to_string()),
                SessionEvent::WaitingChanged(false),
            ]
        );

        session.begin_submit("again").unwrap();
        assert_eq!(drain(&mut rx)[0], SessionEvent::ErrorCleared);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut session = ChatSession::new();
        let rx = session.subscribe();
        let mut kept = session.subscribe();
        drop(rx);

        session.begin_submit("hi").unwrap();
        assert_eq!(session.subscribers.len(), 1);
        assert!(!drain(&mut kept).is_empty());
    }
}
