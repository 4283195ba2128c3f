#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Quit,
    Message(String),
}

impl Command {
    /// Parse one line of user input. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let command = match trimmed {
            "/help" => Command::Help,
            "/clear" => Command::Clear,
            "/quit" => Command::Quit,
            _ if trimmed.eq_ignore_ascii_case("exit") => Command::Quit,
            _ => Command::Message(trimmed.to_string()),
        };
        Some(command)
    }
}
