use std::process::ExitStatus;
use std::process::Stdio;

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::BufReader;
use tokio::process::Command;

use crate::error::Result;
use crate::error::UpdaterErr;

/// Outcome of one collaborator invocation.
#[derive(Debug)]
pub struct ExecOutcome {
    pub status: ExitStatus,
    /// Combined stdout/stderr text; empty unless capture was requested.
    pub output: String,
}

/// Runs `command`, forwarding each output line to the operator as it arrives
/// so progress stays visible during long operations. With `capture` set the
/// combined output is also returned for scanning.
///
/// stdin is inherited: some collaborators prompt on their own and those
/// prompts must reach the operator.
pub async fn run_streamed(command: &[String], capture: bool) -> Result<ExecOutcome> {
    let (program, args) = command.split_first().ok_or(UpdaterErr::Spawn)?;
    tracing::debug!("running {}", command.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take().ok_or(UpdaterErr::Spawn)?;
    let stderr = child.stderr.take().ok_or(UpdaterErr::Spawn)?;

    // Drain both pipes concurrently; waiting for exit first could deadlock a
    // child that fills one of them.
    let (stdout_text, stderr_text) = tokio::join!(
        forward_lines(stdout, false, capture),
        forward_lines(stderr, true, capture),
    );
    let status = child.wait().await?;

    let mut output = stdout_text?;
    output.push_str(&stderr_text?);
    Ok(ExecOutcome { status, output })
}

async fn forward_lines(
    reader: impl AsyncRead + Unpin,
    to_stderr: bool,
    capture: bool,
) -> Result<String> {
    let mut lines = BufReader::new(reader).lines();
    let mut captured = String::new();
    while let Some(line) = lines.next_line().await? {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
        if capture {
            captured.push_str(&line);
            captured.push('\n');
        }
    }
    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_combined_output() {
        let command = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            "echo out; echo err >&2".to_string(),
        ];
        let outcome = run_streamed(&command, true).await.unwrap();
        assert!(outcome.status.success());
        assert!(outcome.output.contains("out\n"));
        assert!(outcome.output.contains("err\n"));
    }

    #[tokio::test]
    async fn skips_capture_when_not_requested() {
        let command = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            "echo ignored".to_string(),
        ];
        let outcome = run_streamed(&command, false).await.unwrap();
        assert!(outcome.status.success());
        assert_eq!(outcome.output, "");
    }

    #[tokio::test]
    async fn reports_nonzero_exit() {
        let command = vec!["/bin/sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let outcome = run_streamed(&command, false).await.unwrap();
        assert_eq!(outcome.status.code(), Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let command = vec!["gentup-no-such-tool-12345".to_string()];
        assert!(matches!(
            run_streamed(&command, false).await,
            Err(UpdaterErr::Io(_))
        ));
    }
}
