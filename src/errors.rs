use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the pipeline. `Tool` failures abort the whole stage
/// run; `NotFound` on a resume path may be recovered by rebuilding the
/// ledger from the prior stage's output files.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid input directory, or no files matching the naming
    /// convention.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An expected upstream ledger or state file is absent.
    #[error("required state file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Persisted state exists but cannot be parsed.
    #[error("malformed state file {}: {detail}", .path.display())]
    Format { path: PathBuf, detail: String },

    /// An external operation failed for one sample; the whole stage aborts.
    #[error("stage '{stage}' failed for sample '{sample}': {detail}")]
    Tool {
        stage:  String,
        sample: String,
        detail: String,
    },

    /// Cross-stage sample-set mismatch detected during reconciliation.
    #[error("sample set mismatch: {0}")]
    Consistency(String),

    #[error("failed to retrieve {url}: {detail}")]
    Retrieve { url: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
