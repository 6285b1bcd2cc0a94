use std::fmt;

/// Why a slash line could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommandError {
    Empty,
    Unknown(String),
    MissingCaseNumber,
    Usage(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty command. Try /help"),
            Self::Unknown(name) => write!(f, "unknown command '/{name}'. Try /help"),
            Self::MissingCaseNumber => f.write_str("missing case number. usage: /case <number>"),
            Self::Usage(usage) => write!(f, "usage: {usage}"),
        }
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Case { number: String },
    Schema,
    Reset,
    Clear,
    Steps(Option<bool>),
    Trace,
    Quit,
}

pub(crate) const HELP_TEXT: &str = "Ask about a case by its number, or ask for statistics and CareLine draws a chart.
Answers rely solely on the hotline log; anything outside it may be made up.

Available commands:
  /help              Show this command list
  /case <number>     Look up a case directly in the hotline log
  /schema            Show the columns of the hotline log
  /reset             Start a new conversation
  /clear             Clear the timeline output
  /steps [on|off]    Show or hide assistant tool steps
  /trace             Show path to the current trace file
  /quit              Leave CareLine (also: quit, exit, Ctrl-C)";

/// Parses a line that starts with `/`. The command name is case-insensitive;
/// arguments are trimmed.
pub(crate) fn parse_command(line: &str) -> Result<Command, CommandError> {
    let body = line.trim_end().strip_prefix('/').unwrap_or_default();
    let (name, args) = body
        .split_once(char::is_whitespace)
        .map_or((body, ""), |(name, args)| (name, args.trim()));
    if name.is_empty() {
        return Err(CommandError::Empty);
    }

    let bare = |command: Command, usage: &'static str| {
        if args.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::Usage(usage))
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "help" => bare(Command::Help, "/help"),
        "schema" => bare(Command::Schema, "/schema"),
        "reset" => bare(Command::Reset, "/reset"),
        "clear" => bare(Command::Clear, "/clear"),
        "trace" => bare(Command::Trace, "/trace"),
        "quit" | "exit" => bare(Command::Quit, "/quit"),
        "case" if args.is_empty() => Err(CommandError::MissingCaseNumber),
        "case" => Ok(Command::Case {
            number: args.to_string(),
        }),
        "steps" => match args {
            "" => Ok(Command::Steps(None)),
            "on" => Ok(Command::Steps(Some(true))),
            "off" => Ok(Command::Steps(Some(false))),
            _ => Err(CommandError::Usage("/steps [on|off]")),
        },
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

pub(crate) fn is_command_line(line: &str) -> bool {
    line.starts_with('/')
}

/// Bare `quit` / `exit` typed at the prompt.
pub(crate) fn is_quit_word(line: &str) -> bool {
    matches!(line.trim(), "quit" | "exit")
}
