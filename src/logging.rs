use std::env;
use std::io;

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LOG_FILE_NAME, ShellConfig};
use crate::io::OUTPUT_TARGET;

/// Environment variable holding filtering directives for the console log.
pub const LOG_ENV_VAR: &str = "FRIENDLYSHELL_LOG";

/// Keeps the background log writer alive; drop it last.
pub struct LoggerGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global `tracing` subscriber.
///
/// Events go to `friendlyshell.log` in the configuration folder. They are
/// mirrored to stderr when `verbose` is set or `FRIENDLYSHELL_LOG` is defined;
/// user facing output is left out of the console since it is already printed.
pub fn init(config: &ShellConfig, verbose: bool) -> anyhow::Result<LoggerGuard> {
    let (file_layer, file_guard) = match config.folder() {
        Some(folder) => {
            let file_appender = rolling::never(folder, LOG_FILE_NAME);
            let (file_non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
            let file_filter = EnvFilter::try_new(&config.settings().log_filter)
                .with_context(|| format!("invalid log filter {:?}", config.settings().log_filter))?;
            let layer = fmt::layer()
                .with_writer(file_non_blocking)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(file_guard))
        }
        None => (None, None),
    };

    let console_layer = console_filter(env::var(LOG_ENV_VAR).ok(), verbose)?.map(|filter| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
            .with_filter(filter)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("failed to install the log subscriber")?;

    Ok(LoggerGuard {
        _file_guard: file_guard,
    })
}

/// Filter of the stderr layer, `None` when nothing should reach the console.
///
/// Directives from the environment win over `verbose`.
fn console_filter(directives: Option<String>, verbose: bool) -> anyhow::Result<Option<EnvFilter>> {
    match directives {
        Some(directives) => EnvFilter::try_new(&directives)
            .map(Some)
            .with_context(|| format!("invalid {LOG_ENV_VAR} directives {directives:?}")),
        None if verbose => Ok(Some(EnvFilter::try_new(format!("debug,{OUTPUT_TARGET}=off"))?)),
        None => Ok(None),
    }
}
