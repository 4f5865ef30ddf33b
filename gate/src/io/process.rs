//! Child processes with a wall-clock timeout and bounded captured output.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes of stdout read past the limit and discarded.
    pub stdout_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exited zero within the timeout with nothing dropped from stdout.
    pub fn is_complete_success(&self) -> bool {
        self.status.success() && !self.timed_out && self.stdout_truncated == 0
    }
}

/// One drained pipe: the kept prefix and how many bytes were thrown away.
struct Captured {
    bytes: Vec<u8>,
    dropped: usize,
}

/// Run `cmd` with stdin closed, killing it once `timeout` elapses.
///
/// Both pipes are drained on their own threads so a chatty child cannot
/// block on a full pipe. At most `limit` bytes of each stream are kept.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    limit: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child.stdout.take().ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_reader = drain(stdout, limit);
    let stderr_reader = drain(stderr, limit);

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!("command timed out; killing it");
            child.kill().context("kill command")?;
            (child.wait().context("reap killed command")?, true)
        }
    };

    let stdout = collect(stdout_reader).context("read stdout")?;
    let stderr = collect(stderr_reader).context("read stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "command output exceeded limit"
        );
    }
    debug!(exit_code = ?status.code(), timed_out, "command finished");

    Ok(CommandOutput {
        status,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        stdout_truncated: stdout.dropped,
        timed_out,
    })
}

fn drain<R: Read + Send + 'static>(reader: R, limit: usize) -> JoinHandle<io::Result<Captured>> {
    thread::spawn(move || capture_bounded(reader, limit))
}

fn collect(handle: JoinHandle<io::Result<Captured>>) -> Result<Captured> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
        .map_err(Into::into)
}

fn capture_bounded<R: Read>(mut reader: R, limit: usize) -> io::Result<Captured> {
    let mut bytes = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut bytes)?;
    let dropped = io::copy(&mut reader, &mut io::sink())?;
    Ok(Captured {
        bytes,
        dropped: usize::try_from(dropped).unwrap_or(usize::MAX),
    })
}
