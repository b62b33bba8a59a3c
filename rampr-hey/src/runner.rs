use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::parse::last_lines;

const STDERR_TAIL_LINES: usize = 12;
const STDERR_TAIL_CHARS: usize = 1200;

pub(crate) fn command_to_string(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    let prog = cmd.get_program().to_string_lossy();
    let mut out = String::new();
    out.push_str(&shell_quote(&prog));
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&shell_quote(&arg.to_string_lossy()));
    }
    out
}

/// Quotes an argument so the logged hey command can be pasted into a POSIX shell.
///
/// Target URLs with a query string are the usual case: `&` and `?` would otherwise be
/// interpreted by the shell.
fn shell_quote(arg: &str) -> String {
    let shell_safe =
        |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%');
    if !arg.is_empty() && arg.chars().all(shell_safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Runs the command to completion and returns its stdout.
///
/// The child is killed if the returned future is dropped before it exits. On unix it runs in
/// its own process group so a terminal Ctrl-C reaches only rampr, which then drops the run.
pub(crate) async fn run_to_completion(mut cmd: Command) -> Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let child = cmd.spawn().map_err(|source| Error::Spawn { program, source })?;

    let Output {
        status,
        stdout,
        stderr,
    } = child.wait_with_output().await?;

    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        return Err(Error::ToolFailed {
            status,
            stderr: clip(&last_lines(&stderr, STDERR_TAIL_LINES), STDERR_TAIL_CHARS),
        });
    }

    Ok(stdout)
}

fn clip(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}
