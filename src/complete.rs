//! Tab completion of command names and command parameters.
//!
//! The first word of a line completes to command names. Later words are
//! handed to the command being typed, through
//! [`ShellCommand::complete`](crate::ShellCommand::complete). Completion runs
//! while the user is typing, so nothing here writes to the terminal: every
//! problem is swallowed and only reported at debug level.

use crate::command::{CommandSet, CompletionRequest};
use crate::parser::{is_separator, parse_line};
use crate::shell::resolve_alias;
use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;
use tracing::debug;

/// Completion engine for one shell, working on a snapshot of its commands.
#[derive(Debug, Clone, Default)]
pub struct CommandCompleter {
    commands: CommandSet,
}

impl CommandCompleter {
    pub fn new(commands: CommandSet) -> Self {
        Self { commands }
    }

    /// Command names starting with `partial`, sorted.
    pub fn complete_command_names(&self, partial: &str) -> Vec<String> {
        self.commands.names_with_prefix(partial)
    }

    /// Completes the token under the cursor.
    ///
    /// Returns the byte offset where the token starts, which is the part of
    /// the line the candidates replace, along with the candidates.
    pub fn complete_line(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let head = line.get(..pos).unwrap_or(line);
        let start = head
            .char_indices()
            .rev()
            .find(|(_, ch)| is_separator(*ch))
            .map_or(0, |(offset, ch)| offset + ch.len_utf8());
        let token = &head[start..];
        debug!(line, start, token, "Beginning auto-completion routine");

        if head[..start].trim_matches(is_separator).is_empty() {
            return (start, self.complete_command_names(token));
        }

        let matches = self.complete_param(line, start, token).unwrap_or_default();
        debug!(?matches, "Completed auto completion routine");
        (start, matches)
    }

    fn complete_param(&self, line: &str, start: usize, token: &str) -> Option<Vec<String>> {
        let mut parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(%error, "Unable to parse line for completion");
                return None;
            }
        };

        let Some(command) = self.commands.get(resolve_alias(&parsed.command)) else {
            debug!(command = %parsed.command, "No completion for unknown command");
            return None;
        };

        let param_index = match parsed.param_starting_at(start) {
            Some(index) => index,
            // cursor sits after whitespace: complete a parameter not typed yet
            None if token.is_empty() => {
                let index = parsed.spans.iter().take_while(|span| span.start < start).count();
                parsed.params.insert(index, String::new());
                parsed.spans.insert(index, start..start);
                index
            }
            None => {
                debug!(token, "Unable to match token to a parameter");
                return None;
            }
        };

        if !parsed.params[param_index].starts_with(token) {
            debug!(token, param = %parsed.params[param_index], "Token does not match parameter");
            return None;
        }

        let request = CompletionRequest {
            line: &parsed,
            param_index,
            cursor: token.len(),
            commands: &self.commands,
        };
        let matches = command.complete(&request);
        if matches.is_none() {
            debug!(command = command.name(), "Command has no completion method");
        }
        matches
    }
}

/// Adapts a [`CommandCompleter`] to the `rustyline` helper traits.
#[derive(Default)]
pub struct ShellHelper {
    pub(crate) completer: Option<CommandCompleter>,
}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(match &self.completer {
            Some(completer) => completer.complete_line(line, pos),
            None => (pos, Vec::new()),
        })
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FnCommand;
    use crate::help::Help;

    fn completer() -> CommandCompleter {
        let mut set = CommandSet::new();
        set.register(Help).unwrap();
        set.register(FnCommand::new("exit", |_, _| Ok(()))).unwrap();
        set.register(FnCommand::new("something", |_, _| Ok(()))).unwrap();
        set.register(FnCommand::new("something2", |_, _| Ok(()))).unwrap();
        set.register(FnCommand::new("some_other_thing", |_, _| Ok(()))).unwrap();
        set.register(
            FnCommand::new("paint", |_, _| Ok(())).with_completion(|request| {
                let colours = match request.param_index {
                    0 => ["red", "green", "grey"],
                    _ => ["matte", "gloss", "glitter"],
                };
                colours
                    .iter()
                    .filter(|c| c.starts_with(request.prefix()))
                    .map(|c| c.to_string())
                    .collect()
            }),
        )
        .unwrap();
        CommandCompleter::new(set)
    }

    #[test]
    fn test_complete_command_names() {
        let matches = completer().complete_command_names("something");
        assert_eq!(matches, vec!["something", "something2"]);
    }

    #[test]
    fn test_complete_first_word() {
        let completer = completer();
        assert_eq!(completer.complete_line("so", 2).1.len(), 3);
        assert_eq!(completer.complete_line("  ex", 4), (2, vec!["exit".to_string()]));
        assert_eq!(completer.complete_line("", 0).1.len(), 6);
    }

    #[test]
    fn test_complete_help_parameter() {
        let line = "help som";
        let (start, matches) = completer().complete_line(line, line.len());
        assert_eq!(start, 5);
        assert_eq!(matches, vec!["some_other_thing", "something", "something2"]);

        let line = "? pa";
        assert_eq!(completer().complete_line(line, line.len()), (2, vec!["paint".to_string()]));
    }

    #[test]
    fn test_complete_first_parameter() {
        // index 0 is a real parameter and must be completed
        let line = "paint gr";
        assert_eq!(
            completer().complete_line(line, line.len()),
            (6, vec!["green".to_string(), "grey".to_string()])
        );
    }

    #[test]
    fn test_complete_parameter_by_position() {
        let line = "paint red gl";
        let (start, matches) = completer().complete_line(line, line.len());
        assert_eq!(start, 10);
        assert_eq!(matches, vec!["gloss", "glitter"]);
    }

    #[test]
    fn test_complete_cursor_in_middle_of_token() {
        let line = "paint green gloss";
        // cursor after "gr"
        assert_eq!(
            completer().complete_line(line, 8),
            (6, vec!["green".to_string(), "grey".to_string()])
        );
    }

    #[test]
    fn test_complete_new_parameter() {
        let line = "paint red ";
        let (start, matches) = completer().complete_line(line, line.len());
        assert_eq!(start, 10);
        assert_eq!(matches, vec!["matte", "gloss", "glitter"]);
    }

    #[test]
    fn test_no_completion_cases() {
        let completer = completer();
        // unknown command
        assert!(completer.complete_line("fubar x", 7).1.is_empty());
        // command without completion support
        assert!(completer.complete_line("something x", 11).1.is_empty());
        // line that cannot be parsed
        assert!(completer.complete_line("paint 'g", 8).1.is_empty());
    }

    #[test]
    fn test_helper_swaps_completer() {
        let mut helper = ShellHelper::default();
        assert!(helper.completer.is_none());

        let previous = std::mem::replace(&mut helper.completer, Some(completer()));
        assert!(previous.is_none());
        let names = helper.completer.as_ref().unwrap().complete_command_names("pai");
        assert_eq!(names, vec!["paint"]);
    }
}
