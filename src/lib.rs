//! A framework for writing friendly interactive command interpreters.
//!
//! Applications create a [`Shell`], register [`ShellCommand`]s on it and run
//! it against a [`LineSource`]: the interactive line editor ([`EditorSource`])
//! with history and tab completion, or any buffered reader ([`StreamSource`])
//! such as a script file. Every line is parsed into a command name plus
//! parameters, checked against the command's [`Arity`] and dispatched. Errors
//! are reported to the user and never terminate the shell.
//!
//! Out of the box every shell understands `exit`, `close`, `help` (and its
//! `?` alias), and `!cmd` to run `cmd` on the host shell.
//!
//! Commands may launch sub-shells through [`Context::run_subshell`]; `close`
//! returns to the parent shell while `exit` leaves them all.

mod command;
mod complete;
pub mod config;
mod error;
mod help;
mod host;
mod io;
pub mod logging;
mod parser;
mod shell;

pub use command::{Arity, CommandSet, CompletionRequest, FnCommand, ShellCommand};
pub use complete::{CommandCompleter, ShellHelper};
pub use config::ShellConfig;
pub use error::{Result, ShellError};
pub use help::{Help, command_table};
pub use host::run_host_command;
pub use io::{Captured, EditorSource, Input, LineSource, MemWriter, Output, StreamSource};
pub use parser::{ParseError, ParseErrorKind, ParsedLine, parse_line};
pub use shell::{Context, HELP_ALIAS, Outcome, Shell};
