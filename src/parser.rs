//! Tokenizer for a single line of shell input.
//!
//! A line is made of a command word followed by whitespace separated
//! parameters. Parameters may contain single or double quoted sections, which
//! keep embedded whitespace together. Quote characters are preserved in the
//! parameter text so commands can decide how to interpret them.

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// Result of parsing one line of input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    /// Name of the command to run (`?` is kept as typed).
    pub command: String,
    /// Parameters in the order they were given, quotes included.
    pub params: Vec<String>,
    /// Byte range of each parameter within the source line.
    pub spans: Vec<Range<usize>>,
}

impl ParsedLine {
    /// Returns the parameter at `index`, if any.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Finds the parameter whose text starts at the given byte offset.
    pub fn param_starting_at(&self, offset: usize) -> Option<usize> {
        self.spans.iter().position(|span| span.start == offset)
    }
}

/// What went wrong while parsing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Nothing but whitespace was given.
    EmptyLine,
    /// The command word contains a character outside of `[A-Za-z0-9_]`.
    InvalidCommandName,
    /// A single or double quote was opened and never closed.
    UnterminatedQuote,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::EmptyLine => f.write_str("empty command line"),
            ParseErrorKind::InvalidCommandName => f.write_str("invalid character in command name"),
            ParseErrorKind::UnterminatedQuote => f.write_str("unterminated quote"),
        }
    }
}

/// Parse failure, carrying enough context to point at the offending character.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at column {column}")]
pub struct ParseError {
    /// The line that failed to parse, without its trailing newline.
    pub line: String,
    /// Character (not byte) offset of the problem, 0-based.
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Human oriented report: a header, the line, and a caret under the problem.
    pub fn report_lines(&self) -> [String; 3] {
        [
            "Parsing error:".to_string(),
            format!("\t{}", self.line),
            format!("\t{}^", " ".repeat(self.column)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingCommand,
    // command was `?`, only whitespace may follow
    AfterAlias,
    BetweenParams,
    ReadingParam,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LineLexer<'a> {
    line: &'a str,
    state: LexingState,
    token_start: usize,
    // char column of the quote that is currently open
    quote_column: usize,
    parsed: ParsedLine,
}

impl<'a> LineLexer<'a> {
    fn new(line: &'a str) -> Self {
        LineLexer {
            line,
            state: LexingState::Start,
            token_start: 0,
            quote_column: 0,
            parsed: ParsedLine::default(),
        }
    }

    fn make_line(mut self) -> Result<ParsedLine, ParseError> {
        let line = self.line;
        for (column, (offset, ch)) in line.char_indices().enumerate() {
            match self.state {
                LexingState::Start => self.handle_start(column, offset, ch)?,
                LexingState::ReadingCommand => self.handle_command(column, offset, ch)?,
                LexingState::AfterAlias => self.handle_after_alias(column, ch)?,
                LexingState::BetweenParams => self.handle_between(column, offset, ch),
                LexingState::ReadingParam => self.handle_param(column, offset, ch),
                LexingState::ReadingSingleQuote => {
                    if ch == '\'' {
                        self.state = LexingState::ReadingParam;
                    }
                }
                LexingState::ReadingDoubleQuote => {
                    if ch == '"' {
                        self.state = LexingState::ReadingParam;
                    }
                }
            }
        }

        let end = line.len();
        match self.state {
            LexingState::Start => return Err(self.error(0, ParseErrorKind::EmptyLine)),
            LexingState::ReadingCommand => self.finish_command(end),
            LexingState::ReadingParam => self.finish_param(end),
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(self.error(self.quote_column, ParseErrorKind::UnterminatedQuote));
            }
            LexingState::AfterAlias | LexingState::BetweenParams => {}
        }

        Ok(self.parsed)
    }

    fn handle_start(&mut self, column: usize, offset: usize, ch: char) -> Result<(), ParseError> {
        match ch {
            c if is_separator(c) => {}
            '?' => {
                self.parsed.command = "?".to_string();
                self.state = LexingState::AfterAlias;
            }
            c if is_command_char(c) => {
                self.token_start = offset;
                self.state = LexingState::ReadingCommand;
            }
            _ => return Err(self.error(column, ParseErrorKind::InvalidCommandName)),
        }
        Ok(())
    }

    fn handle_command(&mut self, column: usize, offset: usize, ch: char) -> Result<(), ParseError> {
        match ch {
            c if is_separator(c) => {
                self.finish_command(offset);
                self.state = LexingState::BetweenParams;
            }
            c if is_command_char(c) => {}
            _ => return Err(self.error(column, ParseErrorKind::InvalidCommandName)),
        }
        Ok(())
    }

    fn handle_after_alias(&mut self, column: usize, ch: char) -> Result<(), ParseError> {
        if is_separator(ch) {
            self.state = LexingState::BetweenParams;
            Ok(())
        } else {
            Err(self.error(column, ParseErrorKind::InvalidCommandName))
        }
    }

    fn handle_between(&mut self, column: usize, offset: usize, ch: char) {
        if is_separator(ch) {
            return;
        }
        self.token_start = offset;
        self.state = match ch {
            '\'' => {
                self.quote_column = column;
                LexingState::ReadingSingleQuote
            }
            '"' => {
                self.quote_column = column;
                LexingState::ReadingDoubleQuote
            }
            _ => LexingState::ReadingParam,
        };
    }

    fn handle_param(&mut self, column: usize, offset: usize, ch: char) {
        match ch {
            c if is_separator(c) => {
                self.finish_param(offset);
                self.state = LexingState::BetweenParams;
            }
            '\'' => {
                self.quote_column = column;
                self.state = LexingState::ReadingSingleQuote;
            }
            '"' => {
                self.quote_column = column;
                self.state = LexingState::ReadingDoubleQuote;
            }
            _ => {}
        }
    }

    fn finish_command(&mut self, end: usize) {
        self.parsed.command = self.line[self.token_start..end].to_string();
    }

    fn finish_param(&mut self, end: usize) {
        let span = self.token_start..end;
        self.parsed.params.push(self.line[span.clone()].to_string());
        self.parsed.spans.push(span);
    }

    fn error(&self, column: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            line: self.line.trim_end_matches(['\r', '\n']).to_string(),
            column,
            kind,
        }
    }
}

/// Characters that separate the command and its parameters.
pub(crate) fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_command_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits a line of input into its command and parameters.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    LineLexer::new(line).make_line()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(line: &ParsedLine) -> Vec<&str> {
        line.params.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_no_params() {
        let res = parse_line("MyCommand").unwrap();
        assert_eq!(res.command, "MyCommand");
        assert!(res.params.is_empty());
    }

    #[test]
    fn test_no_params_whitespace() {
        let res = parse_line("     MyCommand    ").unwrap();
        assert_eq!(res.command, "MyCommand");
        assert!(res.params.is_empty());
    }

    #[test]
    fn test_params_whitespace() {
        let res = parse_line("   MyCommand      param1   param2\n").unwrap();
        assert_eq!(res.command, "MyCommand");
        assert_eq!(params(&res), vec!["param1", "param2"]);
    }

    #[test]
    fn test_quoted_params_keep_quotes() {
        let res = parse_line("MyCommand \"param1\" 'param with spaces'").unwrap();
        assert_eq!(params(&res), vec!["\"param1\"", "'param with spaces'"]);
    }

    #[test]
    fn test_params_with_nested_quotes() {
        let res = parse_line("MyCommand \"param with 'quotes'\"").unwrap();
        assert_eq!(params(&res), vec!["\"param with 'quotes'\""]);

        let res = parse_line("MyCommand 'param with \"double quotes\"'").unwrap();
        assert_eq!(params(&res), vec!["'param with \"double quotes\"'"]);
    }

    #[test]
    fn test_mixed_param_quotes() {
        let res =
            parse_line("MyCommand first_param \"second param\" 'third param' fourth_param").unwrap();
        assert_eq!(res.command, "MyCommand");
        assert_eq!(
            params(&res),
            vec!["first_param", "\"second param\"", "'third param'", "fourth_param"]
        );
    }

    #[test]
    fn test_quote_inside_param() {
        let res = parse_line("set name=\"John Smith\" other").unwrap();
        assert_eq!(params(&res), vec!["name=\"John Smith\"", "other"]);
    }

    #[test]
    fn test_spans_point_into_line() {
        let line = "help  exit 'a b'";
        let res = parse_line(line).unwrap();
        assert_eq!(res.spans, vec![6..10, 11..16]);
        assert_eq!(&line[res.spans[1].clone()], "'a b'");
        assert_eq!(res.param_starting_at(11), Some(1));
        assert_eq!(res.param_starting_at(7), None);
    }

    #[test]
    fn test_help_alias() {
        let res = parse_line("? something").unwrap();
        assert_eq!(res.command, "?");
        assert_eq!(params(&res), vec!["something"]);

        let err = parse_line("?? something").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidCommandName);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_invalid_command_name() {
        let err = parse_line("exit!").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidCommandName);
        assert_eq!(err.column, 4);

        let report = err.report_lines();
        assert_eq!(report[0], "Parsing error:");
        assert_eq!(report[1], "\texit!");
        assert_eq!(report[2], "\t    ^");
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_line("cmd first 'second").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedQuote);
        assert_eq!(err.column, 10);
    }

    #[test]
    fn test_only_ascii_separators() {
        let err = parse_line("cmd\u{00A0}x").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidCommandName);
        assert_eq!(err.column, 3);

        let res = parse_line("cmd a\u{2003}b").unwrap();
        assert_eq!(params(&res), vec!["a\u{2003}b"]);
    }

    #[test]
    fn test_empty_line() {
        let err = parse_line("   \t\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptyLine);
    }
}
