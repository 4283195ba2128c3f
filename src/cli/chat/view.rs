use std::io::Write;

use color_print::cformat;
use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::terminal::{Clear, ClearType};
use eyre::Result;

use super::conversation_state::{Message, Sender};
use super::session::SessionEvent;

const TITLE: &str = "Mental Health Support Chat";
const USER_LABEL: &str = "You: ";
const ASSISTANT_LABEL: &str = "Support: ";

pub fn render_header() -> String {
    cformat!("<bold><blue>{}</></>\n", TITLE)
}

/// Render one message. Continuation lines are indented under the label.
pub fn render_message(message: &Message) -> String {
    let label = match message.sender() {
        Sender::User => USER_LABEL,
        Sender::Assistant => ASSISTANT_LABEL,
    };
    let indent = " ".repeat(label.len());
    let body = message
        .text()
        .lines()
        .collect::<Vec<_>>()
        .join(&format!("\n{}", indent));

    match message.sender() {
        Sender::User => cformat!("<bold><blue>{}</></>{}\n", label, body),
        Sender::Assistant => cformat!("<bold><green>{}</></>{}\n", label, body),
    }
}

pub fn render_error(text: &str) -> String {
    cformat!("<bold><red>{}</></>\n", text)
}

pub fn render_typing_indicator() -> String {
    cformat!("<dim>Support is typing...</>")
}

/// Draws session events onto a terminal as they arrive.
pub struct TranscriptView {
    echo_user: bool,
    typing_shown: bool,
}

impl TranscriptView {
    /// `echo_user` is off when the line editor already shows what was typed.
    pub fn new(echo_user: bool) -> Self {
        Self {
            echo_user,
            typing_shown: false,
        }
    }

    pub fn render_transcript<W: Write>(&mut self, out: &mut W, messages: &[Message]) -> Result<()> {
        for message in messages {
            write!(out, "{}", render_message(message))?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn apply<W: Write>(&mut self, out: &mut W, event: &SessionEvent) -> Result<()> {
        match event {
            SessionEvent::MessageAppended(message) => {
                if message.sender() == Sender::User && !self.echo_user {
                    return Ok(());
                }
                self.erase_typing_indicator(out)?;
                write!(out, "{}", render_message(message))?;
            }
            SessionEvent::WaitingChanged(true) => {
                write!(out, "{}", render_typing_indicator())?;
                self.typing_shown = true;
                out.flush()?;
            }
            SessionEvent::WaitingChanged(false) => {
                self.erase_typing_indicator(out)?;
                out.flush()?;
            }
            SessionEvent::ErrorRaised(text) => {
                self.erase_typing_indicator(out)?;
                write!(out, "{}", render_error(text))?;
            }
            SessionEvent::ErrorCleared => {}
            SessionEvent::ScrollToLatest => out.flush()?,
        }
        Ok(())
    }

    fn erase_typing_indicator<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.typing_shown {
            out.queue(MoveToColumn(0))?.queue(Clear(ClearType::CurrentLine))?;
            self.typing_shown = false;
        }
        Ok(())
    }
}
