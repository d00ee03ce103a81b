//! Device terminal: command grammar and transcript.
//!
//! - `command`: parses `ping`, `ipconfig`/`ifconfig`, `help`, `clear`
//! - `session`: the transcript of the currently opened device
//!
//! Execution lives on `Simulator::execute`, which owns the state the
//! commands act on.

pub mod command;
pub mod session;

pub use command::{HELP_LINES, ParseError, TerminalCommand, parse_command};
pub use session::TerminalSession;
