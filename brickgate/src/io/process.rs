//! Child process execution with combined output capture.
//!
//! stdout and stderr share one pipe, so the captured text interleaves the
//! way a terminal would show it. Output is drained on a reader thread while
//! the child runs; bytes past the limit are counted and discarded.
//!
//! With a timeout the child leads its own process group, and expiry kills the
//! whole group so grandchildren cannot keep the pipe open.

use std::io::{ErrorKind, PipeReader, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use super::config::TestConfig;
use crate::exit_codes;

/// How long to keep reading after a timed-out group was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A child that started and ran to an exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRun {
    pub exit_code: i32,
    /// Combined stdout/stderr, lossily decoded as UTF-8.
    pub output: String,
    pub truncated_bytes: usize,
    pub timed_out: bool,
}

/// Result of trying to run a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(CapturedRun),
    /// The program could not be started at all.
    LaunchFailed {
        program: String,
        kind: ErrorKind,
        message: String,
    },
}

/// Runs an argument vector in a working directory.
///
/// The test gate goes through this seam so it can be exercised with scripted
/// outcomes instead of real processes.
pub trait CommandRunner {
    fn run(&self, argv: &[String], workdir: &Path) -> Result<RunOutcome>;
}

/// Output drained so far by the reader thread.
#[derive(Debug, Default)]
struct CapturedOutput {
    bytes: Vec<u8>,
    truncated: usize,
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl SystemRunner {
    pub fn from_config(cfg: &TestConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(program = argv.first().map(String::as_str).unwrap_or("")))]
    fn run(&self, argv: &[String], workdir: &Path) -> Result<RunOutcome> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty argument vector"))?;

        let (reader, writer) = std::io::pipe().context("create output pipe")?;
        let writer_for_stderr = writer.try_clone().context("clone output pipe")?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_for_stderr);
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!("spawning child process");
        let spawned = cmd.spawn();
        // The command holds the parent's copies of the write ends; the reader
        // only sees EOF once they are closed.
        drop(cmd);
        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                warn!(err = %err, "failed to launch command");
                return Ok(RunOutcome::LaunchFailed {
                    program: program.clone(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        };

        let limit = self.output_limit_bytes;
        let captured = Arc::new(Mutex::new(CapturedOutput::default()));
        let sink = Arc::clone(&captured);
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = done_tx.send(read_stream_limited(reader, limit, &sink));
        });

        let mut timed_out = false;
        let status = match self.timeout {
            None => child.wait().context("wait for command")?,
            Some(timeout) => match child.wait_timeout(timeout).context("wait for command")? {
                Some(status) => status,
                None => {
                    warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
                    timed_out = true;
                    kill_process_group(child.id());
                    child.kill().context("kill command")?;
                    child.wait().context("wait command after kill")?
                }
            },
        };

        if timed_out {
            match done_rx.recv_timeout(DRAIN_GRACE) {
                Ok(result) => result.context("read command output")?,
                Err(_) => warn!("output pipe still open after kill, keeping partial output"),
            }
        } else {
            done_rx
                .recv()
                .map_err(|_| anyhow!("output reader thread panicked"))?
                .context("read command output")?;
        }
        let (bytes, truncated_bytes) = {
            let out = captured
                .lock()
                .map_err(|_| anyhow!("output buffer poisoned"))?;
            (out.bytes.clone(), out.truncated)
        };
        if truncated_bytes > 0 {
            warn!(truncated_bytes, "output truncated");
        }

        let exit_code = if timed_out {
            exit_codes::TIMED_OUT
        } else {
            exit_code_of(status)
        };
        debug!(exit_code, timed_out, "command finished");
        Ok(RunOutcome::Exited(CapturedRun {
            exit_code,
            output: String::from_utf8_lossy(&bytes).into_owned(),
            truncated_bytes,
            timed_out,
        }))
    }
}

/// Numeric exit code; termination by signal maps to `128 + signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Signal every process in the group led by `pid`.
///
/// Best effort: the direct child is killed separately either way.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let result = Command::new("kill")
        .args(["-KILL", "--", &format!("-{pid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => debug!(%status, "kill of process group failed"),
        Err(err) => debug!(err = %err, "could not run kill for process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn read_stream_limited(
    mut reader: PipeReader,
    limit: usize,
    sink: &Mutex<CapturedOutput>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("read output"),
        };
        let mut out = sink.lock().map_err(|_| anyhow!("output buffer poisoned"))?;
        let remaining = limit.saturating_sub(out.bytes.len());
        let keep = n.min(remaining);
        out.bytes.extend_from_slice(&chunk[..keep]);
        out.truncated += n - keep;
    }

    Ok(())
}
