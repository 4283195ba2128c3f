pub mod command;
pub mod conversation_state;
pub mod prompt;
pub mod session;
pub mod view;

use std::io::Write;
use std::process::ExitCode;

use command::Command;
use eyre::Result;
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use session::{ChatSession, SessionEvent, SubmitOutcome};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};
use view::{TranscriptView, render_error, render_header};

use crate::support_client::ChatBackend;

const WELCOME_TEXT: &str = "Type a message and press Enter. /help shows the commands.
";

const HELP_TEXT: &str = "
Mental Health Support Chat

/clear        Start a new conversation
/help         Show this help dialogue
/quit         Quit the application (or type exit)
";

const FAREWELL_TEXT: &str = "Take care! Remember, it's okay to reach out for help when you need it.";

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    backend: Box<dyn ChatBackend>,
    session: ChatSession,
    events: UnboundedReceiver<SessionEvent>,
    view: TranscriptView,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        backend: Box<dyn ChatBackend>,
    ) -> Self {
        let mut session = ChatSession::new();
        let events = session.subscribe();

        Self {
            output,
            input,
            interactive,
            backend,
            session,
            events,
            view: TranscriptView::new(false),
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Handle non-interactive mode (single query)
        if let Some(input) = self.input.take() {
            return self.run_once(&input).await;
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn run_once(&mut self, input: &str) -> Result<ExitCode> {
        let outcome = self.session.submit(self.backend.as_ref(), input).await;

        match outcome {
            SubmitOutcome::Replied => {
                if let Some(reply) = self.session.messages().last() {
                    writeln!(self.output, "{}", reply.text())?;
                }
                Ok(ExitCode::SUCCESS)
            }
            SubmitOutcome::Failed => {
                let error = self.session.last_error().unwrap_or(session::USER_FACING_ERROR);
                write!(self.output, "{}", render_error(error))?;
                Ok(ExitCode::FAILURE)
            }
            SubmitOutcome::Rejected => {
                writeln!(self.output, "Nothing to send.")?;
                Ok(ExitCode::FAILURE)
            }
        }
    }

    fn print_welcome(&mut self) -> Result<()> {
        write!(self.output, "{}", render_header())?;
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        self.view
            .render_transcript(&mut self.output, self.session.messages())?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(None);
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if !self.handle_input(&line).await? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    writeln!(self.output, "{}", FAREWELL_TEXT)?;
                    break;
                }
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle one line of input. Returns `false` once the user asked to leave.
    async fn handle_input(&mut self, input: &str) -> Result<bool> {
        let Some(command) = Command::parse(input) else {
            return Ok(true);
        };

        match command {
            Command::Help => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            Command::Clear => {
                self.session = ChatSession::new();
                self.events = self.session.subscribe();
                info!("Started a new conversation");
                writeln!(self.output, "Conversation cleared.\n")?;
                self.view
                    .render_transcript(&mut self.output, self.session.messages())?;
            }
            Command::Quit => {
                writeln!(self.output, "{}", FAREWELL_TEXT)?;
                return Ok(false);
            }
            Command::Message(text) => {
                self.process_chat_input(&text).await?;
            }
        }

        Ok(true)
    }

    async fn process_chat_input(&mut self, input: &str) -> Result<()> {
        self.session.set_pending_input(input);
        let Some(pending) = self.session.begin_submit_pending_input() else {
            debug!("Submission rejected while {:?}", self.session.phase());
            return Ok(());
        };
        self.render_events()?;

        let outcome = self.backend.send_message(pending.message()).await;
        let outcome = self.session.complete(pending, outcome);
        debug!("Exchange finished: {:?}", outcome);
        self.render_events()?;

        Ok(())
    }

    fn render_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.view.apply(&mut self.output, &event)?;
        }
        Ok(())
    }
}
