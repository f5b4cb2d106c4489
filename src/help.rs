//! The built-in `help` command.

use crate::command::{Arity, CommandSet, CompletionRequest, ShellCommand};
use crate::shell::{Context, HELP_ALIAS};
use anyhow::Result;
use tracing::debug;

const HEADERS: [&str; 3] = ["Command", "Description", "Extended Help"];

/// Lists the available commands, or shows detailed help for one of them.
pub struct Help;

impl ShellCommand for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "Online help generation (this command)"
    }

    fn arity(&self) -> Arity {
        Arity::range(0, 1)
    }

    fn help(&self, prompt: &str) -> Option<String> {
        Some(
            [
                "Online help generation tool".to_string(),
                "Running 'help' with no parameters displays a list of supported commands".to_string(),
                "Passing any supported command to 'help' provides detailed help on the command"
                    .to_string(),
                format!("example: {prompt}help exit"),
            ]
            .join("\n"),
        )
    }

    fn complete(&self, request: &CompletionRequest<'_>) -> Option<Vec<String>> {
        Some(request.commands.names_with_prefix(request.prefix()))
    }

    fn execute(&self, ctx: &mut Context<'_>, params: &[String]) -> Result<()> {
        match params.first() {
            None => {
                debug!("Showing help for available commands...");
                let table = command_table(ctx.commands(), ctx.prompt());
                ctx.info(table);
            }
            Some(name) => show_command_help(ctx, name),
        }
        Ok(())
    }
}

fn show_command_help(ctx: &mut Context<'_>, name: &str) {
    let Some((extended, description)) = ctx
        .commands()
        .get(name)
        .map(|command| (command.help(ctx.prompt()), summary(command.description()).to_string()))
    else {
        ctx.error(format_args!("Command does not exist: {name}"));
        return;
    };

    if let Some(text) = extended {
        ctx.info(text);
        return;
    }

    ctx.info(format_args!("No online help for command \"{name}\""));
    if !description.is_empty() {
        ctx.info(description);
    }
}

/// Renders the command overview, one row per command plus the shortcuts.
pub fn command_table(commands: &CommandSet, prompt: &str) -> String {
    let mut rows: Vec<[String; 3]> = commands
        .iter()
        .map(|command| {
            let extended = match command.help(prompt) {
                Some(_) => format!("`{prompt}help {}`", command.name()),
                None => "N/A".to_string(),
            };
            [
                command.name().to_string(),
                summary(command.description()).to_string(),
                extended,
            ]
        })
        .collect();
    rows.push([
        "!".to_string(),
        "Run a command on the host shell".to_string(),
        "N/A".to_string(),
    ]);
    rows.push([
        HELP_ALIAS.to_string(),
        "Alias for the help command".to_string(),
        "N/A".to_string(),
    ]);

    render_table(&HEADERS, &rows)
}

/// First line of a description.
fn summary(description: &str) -> &str {
    description.lines().next().unwrap_or_default()
}

fn render_table(headers: &[&str; 3], rows: &[[String; 3]]) -> String {
    let mut widths = headers.map(|header| header.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.iter().copied(), &widths));
    lines.push(render_row(widths.iter().map(|w| "-".repeat(*w)), &widths));
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn render_row<S: AsRef<str>>(cells: impl Iterator<Item = S>, widths: &[usize; 3]) -> String {
    let row = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    row.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FnCommand;

    fn commands() -> CommandSet {
        let mut set = CommandSet::new();
        set.register(Help).unwrap();
        set.register(
            FnCommand::new("something", |_, _| Ok(()))
                .with_description("Here's online help for my 'something' command"),
        )
        .unwrap();
        set.register(FnCommand::new("bare", |_, _| Ok(()))).unwrap();
        set
    }

    #[test]
    fn test_table_layout() {
        let table = command_table(&commands(), "> ");
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Command"));
        assert!(lines[0].contains("Description"));
        assert!(lines[0].ends_with("Extended Help"));
        assert!(lines[1].starts_with("-------"));
        // three commands, the two shortcuts, plus header and rule
        assert_eq!(lines.len(), 7);

        let something = lines.iter().find(|l| l.starts_with("something")).unwrap();
        assert!(something.contains("Here's online help for my 'something' command"));
        assert!(something.ends_with("N/A"));

        let help = lines.iter().find(|l| l.starts_with("help")).unwrap();
        assert!(help.ends_with("`> help help`"));

        assert!(lines.iter().any(|l| l.starts_with("! ")));
        assert!(lines.iter().any(|l| l.starts_with("? ")));
    }

    #[test]
    fn test_table_columns_are_aligned() {
        let table = command_table(&commands(), "> ");
        let offsets: Vec<usize> = table
            .lines()
            .filter(|l| !l.starts_with('-'))
            .map(|l| l.find("N/A").or_else(|| l.find('`')).or_else(|| l.find("Extended")).unwrap())
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] == w[1]), "{table}");
    }

    #[test]
    fn test_table_keeps_first_description_line() {
        let mut set = commands();
        set.register(
            FnCommand::new("multi", |_, _| Ok(()))
                .with_description("First line\nsecond line of docs"),
        )
        .unwrap();

        let table = command_table(&set, "> ");
        assert_eq!(table.lines().count(), 8);
        assert!(!table.contains("second line of docs"));
        let multi = table.lines().find(|l| l.starts_with("multi")).unwrap();
        assert!(multi.contains("First line"));
        assert!(multi.ends_with("N/A"));
    }

    #[test]
    fn test_help_text_mentions_prompt() {
        let text = Help.help("$ ").unwrap();
        assert!(text.starts_with("Online help generation tool"));
        assert!(text.ends_with("example: $ help exit"));
    }
}
