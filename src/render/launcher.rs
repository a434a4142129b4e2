use std::{
    ffi::OsString,
    io::Read,
    path::PathBuf,
    process::{Child, Command, Stdio},
    sync::{Arc, Mutex, PoisonError, mpsc},
    time::{Duration, Instant},
};

use crate::foundation::{
    core::ExitOutcome,
    error::{ReelError, ReelResult},
};

/// A fully specified renderer process: program plus argument vector, no shell involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Space-joined rendering for logs. Not meant to be fed to a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of running one [`Invocation`] to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchReport {
    pub outcome: ExitOutcome,
    /// Trimmed tail of the process's stderr.
    pub stderr: String,
}

/// Runs renderer invocations.
///
/// `launch` blocks until the process has exited (or was killed on timeout). Errors are reserved
/// for failures to run the process at all; an unsuccessful exit is reported through
/// [`LaunchReport::outcome`].
pub trait FrameLauncher: Sync {
    fn launch(&self, invocation: &Invocation, timeout: Option<Duration>)
    -> ReelResult<LaunchReport>;
}

/// [`FrameLauncher`] that spawns real child processes.
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    /// How often a process with a timeout is polled for exit.
    pub poll_interval: Duration,
    /// Maximum number of stderr characters kept in a [`LaunchReport`].
    pub stderr_tail: usize,
    /// With a timeout, how long past the deadline to wait for stderr to close.
    ///
    /// Descendants of the renderer may hold the pipe open after it exits or is killed; once this
    /// grace runs out the launch returns with whatever stderr was captured.
    pub stderr_grace: Duration,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            stderr_tail: 2048,
            stderr_grace: Duration::from_millis(250),
        }
    }
}

impl FrameLauncher for ProcessLauncher {
    fn launch(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> ReelResult<LaunchReport> {
        let program = &invocation.program;
        let mut child = Command::new(program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReelError::io(program, e))?;

        let mut stderr = child.stderr.take().ok_or_else(|| {
            ReelError::Other(anyhow::anyhow!(
                "failed to open renderer stderr (unexpected)"
            ))
        })?;
        let captured = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink = Arc::clone(&captured);
        let (drained_tx, drained_rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = drained_tx.send(drain_into(&mut stderr, &sink));
        });

        let started = Instant::now();
        let outcome = wait_with_timeout(&mut child, timeout, self.poll_interval)
            .map_err(|e| ReelError::io(program, e))?;

        let drained = match timeout {
            None => drained_rx.recv().ok(),
            Some(limit) => {
                let budget = (started + limit).saturating_duration_since(Instant::now())
                    + self.stderr_grace;
                drained_rx.recv_timeout(budget).ok()
            }
        };
        match drained {
            Some(result) => result.map_err(|e| ReelError::io(program, e))?,
            None => tracing::warn!(
                program = %program.display(),
                "renderer stderr still open after exit; keeping what was captured"
            ),
        }
        let stderr_bytes = captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Ok(LaunchReport {
            outcome,
            stderr: stderr_tail(&stderr_bytes, self.stderr_tail),
        })
    }
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> std::io::Result<ExitOutcome> {
    let Some(limit) = timeout else {
        return child.wait().map(ExitOutcome::from_status);
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(ExitOutcome::from_status(status));
        }
        let now = Instant::now();
        if now >= deadline {
            // The child may exit between try_wait and kill; the wait below reaps it either way.
            let _ = child.kill();
            child.wait()?;
            return Ok(ExitOutcome::TimedOut(limit));
        }
        std::thread::sleep(poll_interval.min(deadline - now));
    }
}

fn drain_into(reader: &mut impl Read, sink: &Mutex<Vec<u8>>) -> std::io::Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&buf[..n]);
    }
}

fn stderr_tail(bytes: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max_chars).collect();
    format!("...{tail}")
}

#[cfg(test)]
#[path = "../../tests/unit/render/launcher.rs"]
mod tests;
