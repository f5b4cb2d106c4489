use std::cell::Cell;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use argh::{EarlyExit, FromArgs};
use friendly_shell::{Arity, FnCommand, Output, Shell, ShellConfig, StreamSource, logging};
use tracing::{debug, info};

#[derive(FromArgs)]
/// Interactive demo of the friendly shell framework.
struct Args {
    #[argh(option)]
    /// run the commands of this file instead of prompting for them
    script: Option<PathBuf>,

    #[argh(option)]
    /// configuration folder, defaults to ~/.friendlyshell
    config_dir: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// mirror log events to standard error
    verbose: bool,
}

#[derive(FromArgs)]
/// Print the given words on one line.
struct EchoArgs {
    #[argh(switch, short = 'n')]
    /// leave the cursor at the end of the line
    no_newline: bool,

    #[argh(positional, greedy)]
    /// words to print, joined with single spaces
    words: Vec<String>,
}

const GREETINGS: [&str; 3] = ["Hello", "Hi", "Howdy"];

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let config = match &args.config_dir {
        Some(folder) => ShellConfig::load_from(folder)?,
        None => ShellConfig::load()?,
    };
    let _logger = logging::init(&config, args.verbose)?;
    info!(version = env!("CARGO_PKG_VERSION"), "friendlyshell starting");

    let shell = demo_shell()?;
    let outcome = match &args.script {
        Some(path) => {
            let mut source = StreamSource::open(path)
                .with_context(|| format!("can't open script {}", path.display()))?;
            shell.run(&mut source, &mut Output::stdio())
        }
        None => shell.run_interactive(&config)?,
    };

    debug!(?outcome, "friendlyshell terminated");
    Ok(())
}

fn demo_shell() -> Result<Shell> {
    let mut shell = Shell::new("demo").with_banner(
        "Welcome to the friendly shell demo. Type 'help' for the list of commands.",
    );

    let counter = Cell::new(0u32);
    let sub = sub_shell()?;

    shell
        .command("mycmd", |ctx| {
            ctx.info("In my cmd");
            Ok(())
        })?
        .register(
            FnCommand::new("echo", echo)
                .with_description("Prints its arguments")
                .with_arity(Arity::at_least(0))
                .with_help("echo [-n] [words...]\n-n  keep the cursor on the same line"),
        )?
        .register(
            FnCommand::new("greet", |ctx, params| {
                let greeting = params.get(1).map_or("Hello", String::as_str);
                ctx.info(format_args!("{greeting}, {}!", params[0]));
                Ok(())
            })
            .with_description("Greets someone")
            .with_arity(Arity::range(1, 2))
            .with_help("greet <name> [greeting]\nexample: greet world Howdy")
            .with_completion(|request| {
                if request.param_index != 1 {
                    return Vec::new();
                }
                GREETINGS
                    .iter()
                    .filter(|greeting| greeting.starts_with(request.prefix()))
                    .map(|greeting| greeting.to_string())
                    .collect()
            }),
        )?
        .register(
            FnCommand::new("count", move |ctx, _| {
                let count = counter.get() + 1;
                counter.set(count);
                ctx.info(format_args!("This command ran {count} time(s)"));
                Ok(())
            })
            .with_description("Counts how many times it ran"),
        )?
        .register(
            FnCommand::new("sub", move |ctx, _| {
                ctx.run_subshell(&sub);
                ctx.info("Back in the main shell");
                Ok(())
            })
            .with_description("Starts a nested shell"),
        )?;

    Ok(shell)
}

fn sub_shell() -> Result<Shell> {
    let mut shell = Shell::new("sub")
        .with_prompt("(sub) > ")
        .with_banner("Nested shell: 'close' returns to the main shell, 'exit' leaves both.");
    shell.command("where", |ctx| {
        ctx.info("Inside the nested shell");
        Ok(())
    })?;
    Ok(shell)
}

fn echo(ctx: &mut friendly_shell::Context<'_>, params: &[String]) -> Result<()> {
    let args: Vec<&str> = params.iter().map(String::as_str).collect();
    let echo = match EchoArgs::from_args(&["echo"], &args) {
        Ok(echo) => echo,
        Err(EarlyExit { output, status }) => {
            if status.is_err() {
                bail!(output.trim_end().to_string());
            }
            ctx.info(output.trim_end());
            return Ok(());
        }
    };

    let text = echo.words.join(" ");
    if echo.no_newline {
        ctx.output().write_raw(text.as_bytes());
    } else {
        ctx.info(text);
    }
    Ok(())
}
