//! Escape to the host operating system shell (`!cmd`).

use crate::io::Output;
use std::io;
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Runs `cmd` through the platform shell and copies what it printed to `output`.
///
/// Returns the exit code of the command; a command killed by a signal reports
/// `128 + signal`, like POSIX shells do. Only failing to start the shell
/// itself is an error.
pub fn run_host_command(cmd: &str, output: &mut Output) -> io::Result<i32> {
    if cmd.is_empty() {
        debug!("Ignoring empty host command");
        return Ok(0);
    }

    debug!(cmd, "Running host command");
    let result = platform_shell(cmd).output()?;
    let code = match result.status.code() {
        Some(code) => code,
        None => terminated_by_signal(result.status),
    };
    debug!(cmd, code, "Host command finished");

    if code != 0 {
        output.info(format_args!("Failed to run command {cmd}: {code}"));
    }
    output.write_raw(&result.stdout);
    output.write_raw(&result.stderr);
    Ok(code)
}

#[cfg(unix)]
fn platform_shell(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn platform_shell(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_ignored() {
        let (mut output, captured) = Output::captured();
        assert_eq!(run_host_command("", &mut output).unwrap(), 0);
        assert!(captured.text().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_output_is_forwarded() {
        let (mut output, captured) = Output::captured();
        let code = run_host_command("echo hello from host", &mut output).unwrap();
        assert_eq!(code, 0);
        assert_eq!(captured.stdout(), "hello from host\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_failure_reports_exit_code() {
        let (mut output, captured) = Output::captured();
        let code = run_host_command("echo oops >&2; exit 3", &mut output).unwrap();
        assert_eq!(code, 3);
        let text = captured.stdout();
        assert!(text.starts_with("Failed to run command echo oops >&2; exit 3: 3\n"));
        assert!(text.ends_with("oops\n"));
    }

    #[test]
    #[cfg(unix)]
    fn test_signal_maps_to_shell_convention() {
        let (mut output, _captured) = Output::captured();
        let code = run_host_command("kill -9 $$", &mut output).unwrap();
        assert_eq!(code, 128 + 9);
    }
}
