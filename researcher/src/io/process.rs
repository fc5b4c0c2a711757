//! Child process runner for the command-backed reasoning capability.
//!
//! The transcript goes in on stdin, the completion comes back on stdout. Stdin
//! is written and both output pipes are drained on scoped threads while the
//! calling thread waits on the timeout.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

#[derive(Debug, Clone, Copy)]
pub struct ProcessLimits {
    pub timeout: Duration,
    /// Bytes kept per stream; the rest is read and dropped.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Finished(ExitStatus),
    /// Killed after [`ProcessLimits::timeout`].
    TimedOut,
}

/// Decoded child output.
#[derive(Debug)]
pub struct ChildOutput {
    pub exit: ChildExit,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: usize,
}

impl ChildOutput {
    pub fn success(&self) -> bool {
        matches!(self.exit, ChildExit::Finished(status) if status.success())
    }
}

/// Run `cmd` with `input` on stdin.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = limits.timeout.as_secs()))]
pub fn run_child(mut cmd: Command, input: &str, limits: ProcessLimits) -> Result<ChildOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {:?}", cmd.get_program()))?;
    let stdout = child.stdout.take().context("stdout was not piped")?;
    let stderr = child.stderr.take().context("stderr was not piped")?;
    let stdin = child.stdin.take().context("stdin was not piped")?;
    let limit = limits.output_limit_bytes;

    thread::scope(|scope| -> Result<ChildOutput> {
        let stdout_reader = scope.spawn(move || capture(stdout, limit));
        let stderr_reader = scope.spawn(move || capture(stderr, limit));

        // The writer may block on a full pipe; the timeout still applies.
        scope.spawn(move || feed_stdin(stdin, input.as_bytes()));
        let exit = wait_or_kill(&mut child, limits.timeout)?;

        let (stdout, stdout_truncated) = stdout_reader
            .join()
            .map_err(|_| anyhow!("stdout reader panicked"))??;
        let (stderr, _) = stderr_reader
            .join()
            .map_err(|_| anyhow!("stderr reader panicked"))??;

        if stdout_truncated > 0 {
            warn!(stdout_truncated, "child stdout truncated");
        }
        debug!(?exit, stdout_bytes = stdout.len(), "child finished");
        Ok(ChildOutput {
            exit,
            stdout,
            stderr,
            stdout_truncated,
        })
    })
}

/// Write `input` and close the pipe. A child may exit (or be killed) without
/// reading it.
fn feed_stdin(mut stdin: ChildStdin, input: &[u8]) {
    if let Err(err) = stdin.write_all(input) {
        warn!(err = %err, "child closed stdin early");
    }
}

fn wait_or_kill(child: &mut Child, timeout: Duration) -> Result<ChildExit> {
    if let Some(status) = child.wait_timeout(timeout).context("wait for child")? {
        return Ok(ChildExit::Finished(status));
    }
    warn!(timeout_secs = timeout.as_secs(), "child timed out, killing");
    child.kill().context("kill child")?;
    child.wait().context("reap child after kill")?;
    Ok(ChildExit::TimedOut)
}

/// Read `reader` to the end, keeping at most `limit` bytes. Returns the lossy
/// text and the number of dropped bytes.
fn capture<R: Read>(mut reader: R, limit: usize) -> Result<(String, usize)> {
    let mut kept = Vec::new();
    (&mut reader)
        .take(limit as u64)
        .read_to_end(&mut kept)
        .context("read child output")?;
    let dropped = std::io::copy(&mut reader, &mut std::io::sink()).context("drain child output")?;
    let dropped = usize::try_from(dropped).unwrap_or(usize::MAX);
    Ok((String::from_utf8_lossy(&kept).into_owned(), dropped))
}
