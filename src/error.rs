use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;

/// Errors surfaced by the shell framework itself.
///
/// Failures inside user commands are `anyhow::Error`s and are reported by the
/// command loop instead of being propagated.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("command already registered: {0}")]
    DuplicateCommand(String),

    #[error("invalid command name {0:?}: only letters, digits and '_' are allowed")]
    InvalidCommandName(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("line editor failure: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("unable to locate the home directory")]
    NoHomeDirectory,
}

pub type Result<T> = std::result::Result<T, ShellError>;
