use crate::command::{CommandSet, FnCommand, ShellCommand};
use crate::complete::CommandCompleter;
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::help::Help;
use crate::host::run_host_command;
use crate::io::{EditorSource, Input, LineSource, Output, StreamSource};
use crate::parser::{is_separator, parse_line};
use anyhow::Result;
use std::fmt::Display;
use std::io::BufRead;
use std::rc::Rc;
use tracing::debug;

/// Typing this at the prompt is the same as typing `help`.
pub const HELP_ALIAS: &str = "?";

pub(crate) fn resolve_alias(name: &str) -> &str {
    if name == HELP_ALIAS { "help" } else { name }
}

/// How a command loop came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Only this shell was closed; a parent shell keeps running.
    Closed,
    /// The user asked to leave the interpreter altogether.
    Exited,
}

/// Handle given to commands while they run.
///
/// Gives access to the shell's output, its input source (shared with any
/// sub-shell), and lets commands terminate the loop.
pub struct Context<'a> {
    prompt: &'a str,
    commands: &'a CommandSet,
    input: &'a mut dyn LineSource,
    output: &'a mut Output,
    outcome: Option<Outcome>,
}

impl<'a> Context<'a> {
    pub fn info(&mut self, message: impl Display) {
        self.output.info(message);
    }

    pub fn warning(&mut self, message: impl Display) {
        self.output.warning(message);
    }

    pub fn error(&mut self, message: impl Display) {
        self.output.error(message);
    }

    pub fn output(&mut self) -> &mut Output {
        self.output
    }

    pub fn input(&mut self) -> &mut dyn LineSource {
        &mut *self.input
    }

    /// Reads one more line from the shell's input, e.g. to ask for confirmation.
    pub fn read_line(&mut self, prompt: &str) -> Result<Input, ShellError> {
        self.input.read_line(prompt)
    }

    pub fn prompt(&self) -> &str {
        self.prompt
    }

    pub fn commands(&self) -> &CommandSet {
        self.commands
    }

    /// Terminates the interpreter, including every parent shell.
    pub fn exit(&mut self) {
        debug!("Terminating interpreter...");
        self.outcome = Some(Outcome::Exited);
    }

    /// Terminates the current shell only.
    pub fn close(&mut self) {
        debug!(prompt = self.prompt, "Closing shell");
        self.outcome.get_or_insert(Outcome::Closed);
    }

    /// Termination requested by the running command, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Runs `shell` on this shell's input and output until it terminates.
    ///
    /// When the child exits, this shell exits as well. When it is closed,
    /// control returns here and the current command carries on.
    pub fn run_subshell(&mut self, shell: &Shell) -> Outcome {
        let outcome = shell.run(&mut *self.input, &mut *self.output);
        if outcome == Outcome::Exited {
            self.exit();
        }
        outcome
    }
}

/// An interactive command interpreter.
///
/// ```
/// use friendly_shell::{FnCommand, Outcome, Output, Shell, StreamSource};
///
/// let mut shell = Shell::new("demo");
/// shell
///     .register(FnCommand::new("hello", |ctx, _| {
///         ctx.info("Hello world");
///         Ok(())
///     }))
///     .unwrap();
///
/// let (mut output, captured) = Output::captured();
/// let outcome = shell.run(&mut StreamSource::from_text("hello\nexit\n"), &mut output);
/// assert_eq!(outcome, Outcome::Exited);
/// assert!(captured.stdout().contains("Hello world"));
/// ```
pub struct Shell {
    name: String,
    prompt: String,
    banner: Option<String>,
    commands: CommandSet,
}

impl Shell {
    /// Creates a shell with the default `> ` prompt and the built-in
    /// `exit`, `close` and `help` commands.
    pub fn new(name: impl Into<String>) -> Self {
        let commands = CommandSet::with_builtins([
            Rc::new(Exit) as Rc<dyn ShellCommand>,
            Rc::new(Close),
            Rc::new(Help),
        ]);

        Self {
            name: name.into(),
            prompt: "> ".to_string(),
            banner: None,
            commands,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Text displayed once when the shell starts, before the first prompt.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn register(&mut self, command: impl ShellCommand + 'static) -> Result<&mut Self, ShellError> {
        self.commands.register(command)?;
        Ok(self)
    }

    /// Registers a closure taking no parameters as command `name`.
    pub fn command<F>(&mut self, name: &str, handler: F) -> Result<&mut Self, ShellError>
    where
        F: Fn(&mut Context<'_>) -> Result<()> + 'static,
    {
        self.register(FnCommand::new(name, move |ctx, _| handler(ctx)))
    }

    /// Registers `command`, overriding any command of the same name
    /// (built-ins included).
    pub fn replace(&mut self, command: impl ShellCommand + 'static) -> Result<&mut Self, ShellError> {
        self.commands.replace(command)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Looks up the command that handles `name`, following the `?` alias.
    pub fn find_command(&self, name: &str) -> Option<&dyn ShellCommand> {
        self.commands.get(resolve_alias(name))
    }

    pub fn completer(&self) -> CommandCompleter {
        CommandCompleter::new(self.commands.clone())
    }

    /// Runs the command loop until a command, the end of input or an
    /// interrupt terminates it.
    pub fn run(&self, input: &mut dyn LineSource, output: &mut Output) -> Outcome {
        debug!(shell = %self.name, "Starting command loop");
        let previous = input.swap_completer(Some(self.completer()));

        if let Some(banner) = &self.banner {
            output.info(banner);
        }

        let outcome = loop {
            let step = match input.read_line(&self.prompt) {
                Ok(Input::Line(line)) => {
                    if !input.is_interactive() {
                        output.info(format_args!("{}{}", self.prompt, line));
                    }
                    self.run_line(&line, input, output)
                }
                // scripts don't need to end with an explicit `exit`
                Ok(Input::Eof) => {
                    debug!("End of input reached");
                    Some(Outcome::Exited)
                }
                Ok(Input::Interrupted) => {
                    debug!("User interrupted the prompt");
                    Some(Outcome::Closed)
                }
                Err(error) => {
                    output.error(format_args!("Unexpected error during input sequence: {error}"));
                    debug!(?error, "Input failure details");
                    Some(Outcome::Closed)
                }
            };

            if let Some(outcome) = step {
                break outcome;
            }
        };

        input.swap_completer(previous);
        debug!(shell = %self.name, ?outcome, "Command loop finished");
        outcome
    }

    /// Processes a single line of input. Returns the outcome when the line
    /// terminated the shell.
    pub fn run_line(
        &self,
        line: &str,
        input: &mut dyn LineSource,
        output: &mut Output,
    ) -> Option<Outcome> {
        if line.trim_matches(is_separator).is_empty() {
            return None;
        }

        // only a leading `!` escapes to the host, "  !ls" is a parse error
        if let Some(host_command) = line.strip_prefix('!') {
            let host_command = host_command.trim_matches(is_separator);
            if let Err(error) = run_host_command(host_command, output) {
                output.error(format_args!("Failed to run command {host_command}: {error}"));
            }
            return None;
        }

        debug!(line, "Parsing command input");
        let parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(error) => {
                for report_line in error.report_lines() {
                    output.error(report_line);
                }
                debug!(%error, "Parsing error details");
                return None;
            }
        };
        debug!(?parsed, "Parsed command line");

        let Some(command) = self.find_command(&parsed.command) else {
            output.error(format_args!("Command not found: {}", parsed.command));
            return None;
        };

        self.execute(command, &parsed.params, input, output)
    }

    fn execute(
        &self,
        command: &dyn ShellCommand,
        params: &[String],
        input: &mut dyn LineSource,
        output: &mut Output,
    ) -> Option<Outcome> {
        let arity = command.arity();
        if !arity.accepts(params.len()) {
            output.error(format_args!(
                "Command {} requires {} parameters but {} were provided.",
                command.name(),
                arity,
                params.len()
            ));
            return None;
        }

        let mut ctx = Context {
            prompt: &self.prompt,
            commands: &self.commands,
            input,
            output,
            outcome: None,
        };
        if let Err(error) = command.execute(&mut ctx, params) {
            ctx.error(format_args!("Unknown error detected: {error}"));
            debug!(command = command.name(), "Command failure details: {error:?}");
        }
        ctx.outcome
    }

    /// Runs commands read from `reader` until it is exhausted or a command
    /// terminates the shell.
    pub fn run_script<R: BufRead>(&self, reader: R, output: &mut Output) -> Outcome {
        self.run(&mut StreamSource::new(reader), output)
    }

    /// Runs the shell on the terminal, with history and tab completion.
    pub fn run_interactive(&self, config: &ShellConfig) -> Result<Outcome, ShellError> {
        let mut input = EditorSource::new(config)?;
        let outcome = self.run(&mut input, &mut Output::stdio());
        input.save_history()?;
        Ok(outcome)
    }
}

struct Exit;

impl ShellCommand for Exit {
    fn name(&self) -> &str {
        "exit"
    }

    fn description(&self) -> &str {
        "Terminates the command interpreter"
    }

    fn execute(&self, ctx: &mut Context<'_>, _params: &[String]) -> Result<()> {
        ctx.exit();
        Ok(())
    }
}

struct Close;

impl ShellCommand for Close {
    fn name(&self) -> &str {
        "close"
    }

    fn description(&self) -> &str {
        "Terminates the currently running shell"
    }

    fn help(&self, _prompt: &str) -> Option<String> {
        Some(
            "Terminates the currently running shell\n\
             If the current shell is a sub-shell spawned by another shell,\n\
             control returns to the parent shell which keeps running"
                .to_string(),
        )
    }

    fn execute(&self, ctx: &mut Context<'_>, _params: &[String]) -> Result<()> {
        ctx.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let shell = Shell::new("test");
        assert_eq!(shell.prompt(), "> ");
        assert!(shell.banner().is_none());
        assert_eq!(shell.commands().names().collect::<Vec<_>>(), vec!["close", "exit", "help"]);
    }

    #[test]
    fn test_find_exit_command() {
        let shell = Shell::new("test");
        let exit = shell.find_command("exit").unwrap();
        assert_eq!(exit.name(), "exit");
        assert!(shell.find_command("fubar").is_none());
        assert_eq!(shell.find_command("?").map(|c| c.name()), Some("help"));
    }

    #[test]
    fn test_run_line_without_input() {
        let shell = Shell::new("test");
        let (mut output, captured) = Output::captured();
        let mut input = StreamSource::from_text("");

        assert_eq!(shell.run_line("   ", &mut input, &mut output), None);
        assert_eq!(shell.run_line("close", &mut input, &mut output), Some(Outcome::Closed));
        assert_eq!(shell.run_line("exit", &mut input, &mut output), Some(Outcome::Exited));
        assert!(captured.text().is_empty());
    }

    #[test]
    fn test_builtins_are_registered() {
        let shell = Shell::new("test");
        for name in ["exit", "close", "help"] {
            let command = shell.find_command(name).unwrap();
            assert_eq!(command.name(), name);
            assert!(!command.description().is_empty());
        }
    }

    #[test]
    fn test_host_escape_needs_leading_bang() {
        let shell = Shell::new("test");
        let (mut output, captured) = Output::captured();
        let mut input = StreamSource::from_text("");

        assert_eq!(shell.run_line("  !echo hi", &mut input, &mut output), None);
        assert_eq!(captured.stdout(), "");
        assert_eq!(captured.stderr(), "Parsing error:\n\t  !echo hi\n\t  ^\n");
    }

    #[test]
    fn test_exit_wins_over_close() {
        let mut shell = Shell::new("test");
        shell
            .register(crate::FnCommand::new("leave", |ctx, _| {
                ctx.exit();
                ctx.close();
                Ok(())
            }))
            .unwrap();
        let (mut output, _captured) = Output::captured();
        let mut input = StreamSource::from_text("");
        assert_eq!(shell.run_line("leave", &mut input, &mut output), Some(Outcome::Exited));
    }

    #[test]
    fn test_replace_builtin() {
        let mut shell = Shell::new("test");
        shell
            .replace(crate::FnCommand::new("exit", |ctx, _| {
                ctx.info("not leaving");
                Ok(())
            }))
            .unwrap();
        let (mut output, captured) = Output::captured();
        let mut input = StreamSource::from_text("");
        assert_eq!(shell.run_line("exit", &mut input, &mut output), None);
        assert_eq!(captured.stdout(), "not leaving\n");
    }
}
