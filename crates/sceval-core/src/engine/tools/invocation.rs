use super::{Attempt, RetryPolicy, ToolError, with_retries};
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ACCELERATOR_VISIBILITY_VAR: &str = "CUDA_VISIBLE_DEVICES";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A fully described external command.
///
/// Environment changes are applied to the spawned child only; the parent's
/// environment is never touched.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
    log_path: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
            log_path: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Hides every GPU from the child process.
    pub fn hide_accelerators(self) -> Self {
        self.env(ACCELERATOR_VISIBILITY_VAR, "")
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sends the child's stdout and stderr to `path` instead of discarding them.
    pub fn log_to(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> std::io::Result<Command> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        for (key, value) in &self.env {
            command.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        match &self.log_path {
            Some(path) => {
                let log = File::options().create(true).append(true).open(path)?;
                command.stdout(log.try_clone()?).stderr(log);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        Ok(command)
    }

    /// Spawns the command once and waits for it.
    ///
    /// Spawn failures, non-zero exits and timeouts are all retryable.
    pub fn run_once(&self, timeout: Option<Duration>) -> Attempt<()> {
        let mut child = match self.command().and_then(|mut c| c.spawn()) {
            Ok(child) => child,
            Err(e) => return Attempt::Retryable(format!("failed to start: {e}")),
        };

        let status = match timeout {
            None => child.wait(),
            Some(limit) => {
                let started = Instant::now();
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break Ok(status),
                        Ok(None) if started.elapsed() >= limit => {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Attempt::Retryable(format!(
                                "timed out after {:.1}s",
                                limit.as_secs_f64()
                            ));
                        }
                        Ok(None) => thread::sleep(POLL_INTERVAL),
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        match status {
            Ok(status) if status.success() => Attempt::Ok(()),
            Ok(status) => Attempt::Retryable(format!("exited with {status}")),
            Err(e) => Attempt::Retryable(format!("failed while waiting: {e}")),
        }
    }

    /// Runs the command under `policy`, logging each attempt.
    pub fn run(&self, tool: &str, policy: &RetryPolicy) -> Result<(), ToolError> {
        info!(tool, command = %self.display(), "Running external tool.");
        with_retries(tool, policy, |n| {
            debug!(tool, attempt = n, "Starting attempt.");
            self.run_once(policy.timeout)
        })
    }
}
