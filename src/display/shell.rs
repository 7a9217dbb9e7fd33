use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

/// Result of a finished shell command.
#[derive(Debug)]
pub struct ShellOutput {
    pub status: ExitStatus,
    /// stdout followed by stderr, lossily decoded.
    pub output: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `command_line` through `<shell> -c` and wait for it to finish.
/// Only a failure to spawn the shell is an `Err`; a non-zero exit is reported
/// through `ShellOutput::status`.
pub async fn run_shell(shell: &str, command_line: &str) -> io::Result<ShellOutput> {
    let out = Command::new(shell)
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(&out.stderr));

    Ok(ShellOutput {
        status: out.status,
        output,
    })
}
