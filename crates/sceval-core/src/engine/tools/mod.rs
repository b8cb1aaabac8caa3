//! Adapters for the external programs the pipeline drives.
//!
//! Every invocation is an explicit state machine: an attempt yields
//! [`Attempt::Ok`], [`Attempt::Retryable`] or [`Attempt::Fatal`], and
//! [`with_retries`] consumes attempts until one succeeds, one is fatal, or the
//! bound is exhausted. Exhaustion is reported as [`ToolError::Exhausted`] and is
//! never swallowed.

pub mod colabfold;
pub mod esmfold;
pub mod foldseek;
pub mod mpnn;

mod invocation;

pub use invocation::Invocation;

use crate::engine::config::FoldingMethod;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} failed after {attempts} attempt(s); last failure: {last_failure}")]
    Exhausted {
        tool: String,
        attempts: usize,
        last_failure: String,
    },

    #[error("{tool} failed: {reason}")]
    Fatal { tool: String, reason: String },

    #[error("{tool} finished but its output '{path}' is missing", path = path.display())]
    MissingOutput { tool: String, path: PathBuf },

    #[error("{tool} produced unreadable output '{path}': {reason}", path = path.display())]
    InvalidOutput {
        tool: String,
        path: PathBuf,
        reason: String,
    },

    #[error("I/O error while preparing {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn io(tool: &str) -> impl FnOnce(std::io::Error) -> ToolError + '_ {
        move |source| ToolError::Io {
            tool: tool.to_string(),
            source,
        }
    }
}

/// Outcome of one attempt at running an external tool.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    Ok(T),
    /// The attempt failed in a way another attempt may fix.
    Retryable(String),
    /// The attempt failed in a way retrying cannot fix.
    Fatal(String),
}

/// Bounded, immediate retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Wall-clock limit per attempt; exceeding it counts as a retryable failure.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    pub const fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            timeout: None,
        }
    }

    pub const fn once() -> Self {
        Self::new(1)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Calls `attempt` (with the 1-based attempt number) until it succeeds, turns
/// fatal, or `policy.max_attempts` attempts have failed.
pub fn with_retries<T>(
    tool: &str,
    policy: &RetryPolicy,
    mut attempt: impl FnMut(usize) -> Attempt<T>,
) -> Result<T, ToolError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_failure = String::new();
    for n in 1..=max_attempts {
        match attempt(n) {
            Attempt::Ok(value) => return Ok(value),
            Attempt::Fatal(reason) => {
                return Err(ToolError::Fatal {
                    tool: tool.to_string(),
                    reason,
                });
            }
            Attempt::Retryable(reason) => {
                warn!(tool, attempt = n, max_attempts, %reason, "Tool attempt failed.");
                last_failure = reason;
            }
        }
    }
    Err(ToolError::Exhausted {
        tool: tool.to_string(),
        attempts: max_attempts,
        last_failure,
    })
}

/// One sequence proposed by the design tool.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignedSequence {
    pub sample_idx: usize,
    /// Header exactly as the tool wrote it.
    pub header: String,
    pub sequence: String,
    /// Design-tool score (lower is better).
    pub score: f64,
}

/// Where and how to design sequences for one backbone.
#[derive(Debug, Clone)]
pub struct DesignRequest<'a> {
    /// Directory containing only the backbone to design on; outputs land here.
    pub work_dir: &'a Path,
    pub backbone_path: &'a Path,
    pub fixed_positions: Option<&'a mpnn::FixedPositionDirective>,
    pub ca_only: bool,
}

/// Fixed-backbone sequence design.
pub trait SequenceDesigner {
    fn design(&self, request: &DesignRequest<'_>) -> Result<Vec<DesignedSequence>, ToolError>;
}

/// One predicted structure and its confidence metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub sample_idx: usize,
    pub structure_path: PathBuf,
    pub mean_plddt: f64,
    pub ptm: f64,
    pub pae: f64,
}

/// Sequence → structure prediction.
///
/// Implementations write `sample_<idx>.pdb` files under
/// `work_dir/<method output subdir>` and return one prediction per sequence,
/// in input order.
pub trait StructurePredictor {
    fn method(&self) -> FoldingMethod;

    fn predict(
        &mut self,
        work_dir: &Path,
        sequences: &[DesignedSequence],
    ) -> Result<Vec<Prediction>, ToolError>;
}

/// Verifies that a tool's declared output exists before anyone parses it.
pub fn require_output(tool: &str, path: &Path) -> Result<(), ToolError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::MissingOutput {
            tool: tool.to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn always_failing_tool_is_attempted_exactly_max_times() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retries("ProteinMPNN", &RetryPolicy::new(5), |n| {
            calls.set(calls.get() + 1);
            Attempt::Retryable(format!("exit status 1 on attempt {n}"))
        });
        assert_eq!(calls.get(), 5);
        match result {
            Err(ToolError::Exhausted {
                attempts,
                last_failure,
                ..
            }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last_failure, "exit status 1 on attempt 5");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn success_stops_retrying() {
        let calls = Cell::new(0);
        let value = with_retries("colabfold", &RetryPolicy::new(10), |n| {
            calls.set(calls.get() + 1);
            if n < 3 {
                Attempt::Retryable("busy".into())
            } else {
                Attempt::Ok(n)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn fatal_attempt_aborts_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retries("esmfold", &RetryPolicy::new(5), |_| {
            calls.set(calls.get() + 1);
            Attempt::Fatal("model weights missing".into())
        });
        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(ToolError::Fatal { .. })));
    }

    #[test]
    fn zero_attempt_policy_still_tries_once() {
        let calls = Cell::new(0);
        let _ = with_retries::<()>("tool", &RetryPolicy::new(0), |_| {
            calls.set(calls.get() + 1);
            Attempt::Retryable("no".into())
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn missing_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seqs/x.fa");
        assert!(matches!(
            require_output("ProteinMPNN", &path),
            Err(ToolError::MissingOutput { .. })
        ));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, ">a\nAAA\n").unwrap();
        assert!(require_output("ProteinMPNN", &path).is_ok());
    }
}
