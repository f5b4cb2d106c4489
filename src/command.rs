use crate::error::ShellError;
use crate::parser::ParsedLine;
use crate::shell::Context;
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

static COMMAND_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("command name pattern is valid"));

/// Number of parameters a command accepts.
///
/// Mirrors a function signature: `required` parameters must always be given,
/// optional ones may follow up to `max`. A `max` of `None` accepts any number
/// of trailing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub required: usize,
    pub max: Option<usize>,
}

impl Arity {
    /// The command takes no parameters.
    pub const fn none() -> Self {
        Self::exactly(0)
    }

    pub const fn exactly(count: usize) -> Self {
        Self {
            required: count,
            max: Some(count),
        }
    }

    /// `required` mandatory parameters followed by optional ones, `total` at most.
    pub const fn range(required: usize, total: usize) -> Self {
        Self {
            required,
            max: Some(total),
        }
    }

    pub const fn at_least(required: usize) -> Self {
        Self {
            required,
            max: None,
        }
    }

    /// Whether `count` parameters satisfy this arity.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required && self.max.is_none_or(|max| count <= max)
    }
}

impl Default for Arity {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} of {}", self.required, max),
            None => write!(f, "at least {}", self.required),
        }
    }
}

/// Everything a command needs to offer completions for one of its parameters.
pub struct CompletionRequest<'a> {
    /// The whole line as parsed so far.
    pub line: &'a ParsedLine,
    /// Index into `line.params` of the parameter being completed.
    pub param_index: usize,
    /// Byte offset of the cursor inside that parameter.
    pub cursor: usize,
    /// Commands of the shell the line was typed into.
    pub commands: &'a CommandSet,
}

impl CompletionRequest<'_> {
    /// Text of the parameter up to the cursor.
    pub fn prefix(&self) -> &str {
        let param = self.line.param(self.param_index).unwrap_or_default();
        param.get(..self.cursor).unwrap_or(param)
    }
}

/// A command that can be registered on a [`Shell`](crate::Shell).
///
/// Only [`name`](ShellCommand::name) and [`execute`](ShellCommand::execute) are
/// mandatory. Commands are shared between the shell and its completer, so
/// `execute` takes `&self`; commands that keep state use interior mutability.
pub trait ShellCommand {
    /// Word typed at the prompt to invoke the command.
    fn name(&self) -> &str;

    /// One line summary shown in the help table.
    fn description(&self) -> &str {
        ""
    }

    fn arity(&self) -> Arity {
        Arity::none()
    }

    /// Extended help shown by `help <name>`. The shell prompt is provided so
    /// examples can be rendered the way the user will type them.
    fn help(&self, _prompt: &str) -> Option<String> {
        None
    }

    /// Candidate values for a partially typed parameter.
    ///
    /// Returning `None` means the command does not support completion.
    fn complete(&self, _request: &CompletionRequest<'_>) -> Option<Vec<String>> {
        None
    }

    /// Runs the command. Errors are reported by the shell, which keeps running.
    fn execute(&self, ctx: &mut Context<'_>, params: &[String]) -> Result<()>;
}

type Handler = dyn Fn(&mut Context<'_>, &[String]) -> Result<()>;
type Completion = dyn Fn(&CompletionRequest<'_>) -> Vec<String>;

/// Closure backed command, for commands that don't warrant their own type.
///
/// ```
/// use friendly_shell::{Arity, FnCommand};
///
/// let greet = FnCommand::new("greet", |ctx, params| {
///     ctx.info(format_args!("Hello {}", params[0]));
///     Ok(())
/// })
/// .with_description("Say hello")
/// .with_arity(Arity::exactly(1));
/// ```
pub struct FnCommand {
    name: String,
    description: String,
    arity: Arity,
    help: Option<String>,
    handler: Box<Handler>,
    completion: Option<Box<Completion>>,
}

impl FnCommand {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[String]) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            arity: Arity::none(),
            help: None,
            handler: Box::new(handler),
            completion: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_completion<F>(mut self, completion: F) -> Self
    where
        F: Fn(&CompletionRequest<'_>) -> Vec<String> + 'static,
    {
        self.completion = Some(Box::new(completion));
        self
    }
}

impl ShellCommand for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn help(&self, _prompt: &str) -> Option<String> {
        self.help.clone()
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Option<Vec<String>> {
        self.completion.as_ref().map(|complete| complete(request))
    }

    fn execute(&self, ctx: &mut Context<'_>, params: &[String]) -> Result<()> {
        (self.handler)(ctx, params)
    }
}

/// Commands known to a shell, ordered by name.
///
/// Cloning is cheap: commands are reference counted, which lets the
/// completer keep its own snapshot while the shell runs.
#[derive(Clone, Default)]
pub struct CommandSet {
    commands: BTreeMap<String, Rc<dyn ShellCommand>>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with commands whose names are known to be valid.
    pub(crate) fn with_builtins(builtins: impl IntoIterator<Item = Rc<dyn ShellCommand>>) -> Self {
        let commands = builtins
            .into_iter()
            .map(|command| (command.name().to_string(), command))
            .collect();
        Self { commands }
    }

    /// Adds a command, refusing names that are invalid or already taken.
    pub fn register(&mut self, command: impl ShellCommand + 'static) -> Result<(), ShellError> {
        let name = validate_name(command.name())?.to_string();
        if self.commands.contains_key(&name) {
            return Err(ShellError::DuplicateCommand(name));
        }
        self.commands.insert(name, Rc::new(command));
        Ok(())
    }

    /// Adds or overrides a command, returning the one it displaced.
    pub fn replace(
        &mut self,
        command: impl ShellCommand + 'static,
    ) -> Result<Option<Rc<dyn ShellCommand>>, ShellError> {
        let name = validate_name(command.name())?.to_string();
        Ok(self.commands.insert(name, Rc::new(command)))
    }

    pub fn remove(&mut self, name: &str) -> Option<Rc<dyn ShellCommand>> {
        self.commands.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn ShellCommand> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Sorted names of the commands starting with `prefix`.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.names()
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ShellCommand> {
        self.commands.values().map(|command| command.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

fn validate_name(name: &str) -> Result<&str, ShellError> {
    if COMMAND_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(ShellError::InvalidCommandName(name.to_string()))
    }
}
