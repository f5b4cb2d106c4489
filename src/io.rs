//! Where shells read their commands from and where they write to.

use crate::complete::{CommandCompleter, ShellHelper};
use crate::config::ShellConfig;
use crate::error::ShellError;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::cell::RefCell;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Log target used to mirror user facing output into the log file.
pub const OUTPUT_TARGET: &str = "friendly_shell::output";

/// One read from a [`LineSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A line of text, without its line terminator.
    Line(String),
    /// No more input will come.
    Eof,
    /// The user pressed Ctrl+C at the prompt.
    Interrupted,
}

/// Source of command lines for a shell.
///
/// Sub-shells borrow the source of their parent, so a script can drive a
/// whole hierarchy of shells.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input, ShellError>;

    /// Interactive sources display the prompt themselves; the shell echoes
    /// lines coming from other sources so transcripts stay readable.
    fn is_interactive(&self) -> bool {
        false
    }

    /// Installs the completer of the shell about to read from this source,
    /// returning the one it replaces. Sources without completion ignore it.
    fn swap_completer(&mut self, _completer: Option<CommandCompleter>) -> Option<CommandCompleter> {
        None
    }
}

/// Reads commands from any buffered reader: script files, strings, pipes.
pub struct StreamSource<R> {
    reader: R,
}

impl<R: BufRead> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl StreamSource<Cursor<Vec<u8>>> {
    /// Source replaying the given text, one command per line.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Cursor::new(text.into().into_bytes()))
    }
}

impl StreamSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ShellError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LineSource for StreamSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<Input, ShellError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(Input::Eof);
        }
        Ok(Input::Line(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Interactive line editor with history and tab completion.
pub struct EditorSource {
    editor: Editor<ShellHelper, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl EditorSource {
    pub fn new(config: &ShellConfig) -> Result<Self, ShellError> {
        let settings = config.settings();
        let rl_config = rustyline::Config::builder()
            .max_history_size(settings.history_size)?
            .history_ignore_space(true)
            .auto_add_history(false)
            .edit_mode(settings.edit_mode.into())
            .completion_type(settings.completion.into())
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ShellHelper::default()));

        let history_file = config.history_path();
        if let Some(path) = &history_file {
            if path.exists() {
                debug!(path = %path.display(), "Loading command history");
                editor.load_history(path)?;
            }
        }

        Ok(Self {
            editor,
            history_file,
        })
    }

    /// Persists the history, when the configuration asks for it.
    pub fn save_history(&mut self) -> Result<(), ShellError> {
        if let Some(path) = &self.history_file {
            debug!(path = %path.display(), "Saving command history");
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input, ShellError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(err) => Err(err.into()),
        }
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn swap_completer(&mut self, completer: Option<CommandCompleter>) -> Option<CommandCompleter> {
        match self.editor.helper_mut() {
            Some(helper) => std::mem::replace(&mut helper.completer, completer),
            None => None,
        }
    }
}

/// Destination for everything a shell tells its user.
///
/// Messages are also mirrored to the log under [`OUTPUT_TARGET`], so the log
/// file holds a complete transcript of a session.
pub struct Output {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Output {
    pub fn new(out: impl Write + 'static, err: impl Write + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
        }
    }

    /// Standard output for information, standard error for problems.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Output kept in memory, readable through the returned handle.
    pub fn captured() -> (Self, Captured) {
        let (out, out_buf) = MemWriter::with_handle();
        let (err, err_buf) = MemWriter::with_handle();
        (
            Self::new(out, err),
            Captured {
                out: out_buf,
                err: err_buf,
            },
        )
    }

    pub fn info(&mut self, message: impl Display) {
        info!(target: OUTPUT_TARGET, "{message}");
        write_line(&mut self.out, message);
    }

    pub fn warning(&mut self, message: impl Display) {
        warn!(target: OUTPUT_TARGET, "{message}");
        write_line(&mut self.err, message);
    }

    pub fn error(&mut self, message: impl Display) {
        error!(target: OUTPUT_TARGET, "{message}");
        write_line(&mut self.err, message);
    }

    pub fn blank(&mut self) {
        write_line(&mut self.out, "");
    }

    /// Copies bytes produced elsewhere (e.g. by a host command) verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        if let Err(error) = self.out.write_all(bytes).and_then(|()| self.out.flush()) {
            debug!(%error, "Failed to write shell output");
        }
    }
}

fn write_line(writer: &mut dyn Write, message: impl Display) {
    if let Err(error) = writeln!(writer, "{message}").and_then(|()| writer.flush()) {
        debug!(%error, "Failed to write shell output");
    }
}

/// Read side of an [`Output::captured`] pair.
#[derive(Clone)]
pub struct Captured {
    out: Rc<RefCell<Vec<u8>>>,
    err: Rc<RefCell<Vec<u8>>>,
}

impl Captured {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.out.borrow()).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.err.borrow()).into_owned()
    }

    /// Both streams, standard output first.
    pub fn text(&self) -> String {
        self.stdout() + &self.stderr()
    }
}

/// Writer appending to a byte buffer that [`Captured`] reads back.
#[derive(Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The writer together with a second handle on its buffer.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let writer = Self::new();
        let handle = Rc::clone(&writer.buf);
        (writer, handle)
    }
}

impl Write for MemWriter {
    fn write(&mut self, bytes: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}
