use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn in the conversation. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: Sender,
    text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting,
}

/// Everything the transcript needs to draw itself.
///
/// Only `ChatSession` mutates this; everyone else gets a shared reference.
#[derive(Debug, Clone)]
pub struct SessionState {
    messages: Vec<Message>,
    pending_input: String,
    is_waiting_for_reply: bool,
    last_error: Option<String>,
}

impl SessionState {
    pub(super) fn seeded(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
            pending_input: String::new(),
            is_waiting_for_reply: false,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.is_waiting_for_reply
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn phase(&self) -> Phase {
        if self.is_waiting_for_reply {
            Phase::Waiting
        } else {
            Phase::Idle
        }
    }

    pub(super) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(super) fn set_pending_input(&mut self, text: String) {
        self.pending_input = text;
    }

    pub(super) fn take_pending_input(&mut self) -> String {
        std::mem::take(&mut self.pending_input)
    }

    pub(super) fn set_waiting(&mut self, waiting: bool) {
        self.is_waiting_for_reply = waiting;
    }

    pub(super) fn set_last_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }
}
