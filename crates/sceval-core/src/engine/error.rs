use crate::core::comparison::ComparisonError;
use crate::core::contig::ContigError;
use crate::core::io::fasta::FastaError;
use crate::core::selection::SelectionError;
use crate::engine::config::ConfigError;
use crate::engine::metrics::MetricsError;
use crate::engine::motif::MotifInfoError;
use crate::engine::naming::NamingError;
use crate::engine::tools::ToolError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Malformed contig: {source}")]
    Contig {
        #[from]
        source: ContigError,
    },

    #[error("Structure selection failed: {source}")]
    Selection {
        #[from]
        source: SelectionError,
    },

    #[error("Structural comparison failed: {source}")]
    Comparison {
        #[from]
        source: ComparisonError,
    },

    #[error(transparent)]
    Tool {
        #[from]
        source: ToolError,
    },

    #[error("Backbone naming: {source}")]
    Naming {
        #[from]
        source: NamingError,
    },

    #[error("Motif metadata: {source}")]
    MotifInfo {
        #[from]
        source: MotifInfoError,
    },

    #[error("Result table: {source}")]
    Metrics {
        #[from]
        source: MetricsError,
    },

    #[error("FASTA error: {source}")]
    Fasta {
        #[from]
        source: FastaError,
    },

    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> EngineError {
        let path = path.into();
        move |source| EngineError::Io { path, source }
    }

    /// Whether the error only concerns the candidate being processed.
    ///
    /// Candidate-local errors are logged and the candidate is skipped; every
    /// other error aborts the run.
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            EngineError::Contig { .. }
                | EngineError::Selection { .. }
                | EngineError::Comparison { .. }
                | EngineError::Naming { .. }
                | EngineError::MotifInfo { .. }
                | EngineError::Fasta { .. }
        )
    }
}
