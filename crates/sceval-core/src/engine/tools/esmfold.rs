//! ESMFold prediction service.
//!
//! The model is loaded once, inside a resident worker process owned by
//! [`EsmFoldWorker`]. Requests and responses are single JSON lines:
//!
//! ```text
//! → {"sequence":"MKV...","output_path":"/run/x/self_consistency/esmf/sample_1.pdb"}
//! ← {"mean_plddt":84.1,"ptm":0.71,"pae":5.3}
//! ← {"error":"CUDA out of memory"}
//! ```
//!
//! The worker is killed when the service is dropped, and also when a reply
//! takes longer than the retry policy's timeout; the next attempt then starts a
//! fresh worker.

use super::{
    Attempt, DesignedSequence, Prediction, RetryPolicy, StructurePredictor, ToolError,
    require_output, with_retries,
};
use crate::engine::config::FoldingMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const TOOL: &str = "ESMFold";

#[derive(Debug, Clone, PartialEq)]
pub struct EsmFoldConfig {
    /// Worker executable followed by its arguments.
    pub command: Vec<String>,
    /// Passed to the worker as `--device`.
    pub device: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for EsmFoldConfig {
    fn default() -> Self {
        Self {
            command: vec!["python".into(), "esmfold_worker.py".into()],
            device: None,
            retry: RetryPolicy::new(3),
        }
    }
}

#[derive(Debug, Serialize)]
struct WorkerRequest<'a> {
    sequence: &'a str,
    output_path: &'a Path,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkerResponse {
    Failure { error: String },
    Success { mean_plddt: f64, ptm: f64, pae: f64 },
}

struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    /// Reply lines read off the worker's stdout by a reader thread.
    replies: Receiver<std::io::Result<String>>,
}

impl WorkerProcess {
    fn spawn(config: &EsmFoldConfig) -> Result<Self, ToolError> {
        let (program, args) = config.command.split_first().ok_or_else(|| ToolError::Fatal {
            tool: TOOL.to_string(),
            reason: "worker command is empty".to_string(),
        })?;
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(device) = &config.device {
            command.arg("--device").arg(device);
        }
        let mut child = command.spawn().map_err(ToolError::io(TOOL))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolError::Fatal {
                tool: TOOL.to_string(),
                reason: "worker pipes unavailable".to_string(),
            });
        };
        let (sender, replies) = mpsc::channel();
        thread::spawn(move || {
            let mut stdout = BufReader::new(stdout);
            loop {
                let mut line = String::new();
                match stdout.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if sender.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = sender.send(Err(e));
                        break;
                    }
                }
            }
        });
        info!(command = %config.command.join(" "), "Started ESMFold worker.");
        Ok(Self {
            child,
            stdin,
            replies,
        })
    }

    fn request(
        &mut self,
        sequence: &str,
        output_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<WorkerResponse, String> {
        let line = serde_json::to_string(&WorkerRequest {
            sequence,
            output_path,
        })
        .map_err(|e| e.to_string())?;
        writeln!(self.stdin, "{line}").map_err(|e| format!("worker stdin: {e}"))?;
        self.stdin.flush().map_err(|e| format!("worker stdin: {e}"))?;

        let received = match timeout {
            Some(limit) => self.replies.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => format!("no reply within {limit:?}"),
                RecvTimeoutError::Disconnected => "worker exited".to_string(),
            }),
            None => self.replies.recv().map_err(|_| "worker exited".to_string()),
        }?;
        let reply = received.map_err(|e| format!("worker stdout: {e}"))?;
        serde_json::from_str(reply.trim()).map_err(|e| format!("malformed reply '{}': {e}", reply.trim()))
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Explicitly owned ESMFold service; one per orchestrator.
pub struct EsmFoldWorker {
    config: EsmFoldConfig,
    process: Option<WorkerProcess>,
}

impl EsmFoldWorker {
    pub fn spawn(config: EsmFoldConfig) -> Result<Self, ToolError> {
        let process = WorkerProcess::spawn(&config)?;
        Ok(Self {
            config,
            process: Some(process),
        })
    }

    fn predict_one(
        &mut self,
        sequence: &str,
        output_path: &Path,
        timeout: Option<Duration>,
    ) -> Attempt<(f64, f64, f64)> {
        if self.process.is_none() {
            match WorkerProcess::spawn(&self.config) {
                Ok(p) => self.process = Some(p),
                Err(e) => return Attempt::Retryable(e.to_string()),
            }
        }
        let Some(process) = self.process.as_mut() else {
            return Attempt::Retryable("worker unavailable".to_string());
        };
        match process.request(sequence, output_path, timeout) {
            Ok(WorkerResponse::Success {
                mean_plddt,
                ptm,
                pae,
            }) => Attempt::Ok((mean_plddt, ptm, pae)),
            Ok(WorkerResponse::Failure { error }) => Attempt::Retryable(error),
            Err(reason) => {
                warn!(%reason, "ESMFold worker failed; it will be restarted.");
                self.process = None;
                Attempt::Retryable(reason)
            }
        }
    }
}

impl StructurePredictor for EsmFoldWorker {
    fn method(&self) -> FoldingMethod {
        FoldingMethod::EsmFold
    }

    fn predict(
        &mut self,
        work_dir: &Path,
        sequences: &[DesignedSequence],
    ) -> Result<Vec<Prediction>, ToolError> {
        let out_dir = work_dir.join(FoldingMethod::EsmFold.output_subdir());
        fs::create_dir_all(&out_dir).map_err(ToolError::io(TOOL))?;

        let policy = self.config.retry;
        let mut predictions = Vec::with_capacity(sequences.len());
        for design in sequences {
            let path: PathBuf = out_dir.join(format!("sample_{}.pdb", design.sample_idx));
            debug!(sample = design.sample_idx, "Running ESMFold.");
            let (mean_plddt, ptm, pae) =
                with_retries(TOOL, &policy, |_| {
                    self.predict_one(&design.sequence, &path, policy.timeout)
                })?;
            require_output(TOOL, &path)?;
            predictions.push(Prediction {
                sample_idx: design.sample_idx,
                structure_path: path,
                mean_plddt,
                ptm,
                pae,
            });
        }
        Ok(predictions)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const FAKE_WORKER: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *POISON*) echo '{"error":"cannot fold"}'; continue;;
    *SLOW*) sleep 5;;
  esac
  path=$(printf '%s' "$line" | sed 's/.*"output_path":"\([^"]*\)".*/\1/')
  echo "END" > "$path"
  echo '{"mean_plddt":84.5,"ptm":0.72,"pae":4.25}'
done
"#;

    fn design(idx: usize, sequence: &str) -> DesignedSequence {
        DesignedSequence {
            sample_idx: idx,
            header: format!("T=0.1, sample={idx}, global_score=1.0"),
            sequence: sequence.to_string(),
            score: 1.0,
        }
    }

    fn worker(dir: &Path, max_attempts: usize) -> EsmFoldWorker {
        worker_with_timeout(dir, max_attempts, None)
    }

    fn worker_with_timeout(dir: &Path, max_attempts: usize, timeout: Option<Duration>) -> EsmFoldWorker {
        let script = dir.join("worker.sh");
        fs::write(&script, FAKE_WORKER).unwrap();
        EsmFoldWorker::spawn(EsmFoldConfig {
            command: vec!["sh".into(), script.display().to_string()],
            device: None,
            retry: RetryPolicy::new(max_attempts).with_timeout(timeout),
        })
        .unwrap()
    }

    #[test]
    fn worker_predicts_each_sequence_into_esmf_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut esm = worker(dir.path(), 1);
        let preds = esm
            .predict(dir.path(), &[design(1, "MKV"), design(4, "GGG")])
            .unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[1].sample_idx, 4);
        assert_eq!(preds[1].structure_path, dir.path().join("esmf/sample_4.pdb"));
        assert!(preds[1].structure_path.exists());
        assert_eq!(preds[0].mean_plddt, 84.5);
        assert_eq!(preds[0].pae, 4.25);
    }

    #[test]
    fn worker_errors_are_retried_then_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let mut esm = worker(dir.path(), 2);
        let err = esm.predict(dir.path(), &[design(1, "POISON")]).unwrap_err();
        assert!(matches!(err, ToolError::Exhausted { attempts: 2, .. }));
    }

    #[test]
    fn slow_worker_is_restarted_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut esm = worker_with_timeout(dir.path(), 2, Some(Duration::from_millis(200)));
        let started = std::time::Instant::now();
        let err = esm.predict(dir.path(), &[design(1, "SLOW")]).unwrap_err();
        assert!(matches!(err, ToolError::Exhausted { attempts: 2, .. }));
        assert!(started.elapsed() < Duration::from_secs(4));

        let preds = esm.predict(dir.path(), &[design(2, "MKV")]).unwrap();
        assert_eq!(preds[0].ptm, 0.72);
    }

    #[test]
    fn empty_command_is_fatal() {
        let config = EsmFoldConfig {
            command: Vec::new(),
            ..EsmFoldConfig::default()
        };
        assert!(matches!(
            EsmFoldWorker::spawn(config),
            Err(ToolError::Fatal { .. })
        ));
    }
}
