use crate::{errors::PipelineError, ledger::Ledger, utils::PROGRAM};
use std::path::Path;

pub mod align;
pub mod quantify;
pub mod trim;

/// Persisted ledger file names, one per stage, under the log directory.
pub const TRIM_LEDGER: &str = "trim_ledger.json";
pub const ALIGN_LEDGER: &str = "align_ledger.json";
pub const COUNTS_LEDGER: &str = "counts_ledger.json";

/// Loads a stage's upstream ledger, falling back to rebuilding it from the
/// prior stage's output files when the ledger file itself is missing. Any
/// other load failure propagates.
pub(crate) fn resume_ledger(
    ledger_path: &Path, fallback_dir: &Path, marker: Option<&str>, suffix: &str,
) -> Result<Ledger, PipelineError> {
    match Ledger::load(ledger_path) {
        Ok(ledger) => Ok(ledger),
        Err(PipelineError::NotFound(_)) => {
            eprintln!(
                "{PROGRAM} WARNING! {} is missing; rebuilding the ledger from {}.",
                ledger_path.display(),
                fallback_dir.display()
            );
            Ledger::build(fallback_dir, marker, suffix)
        }
        Err(e) => Err(e),
    }
}
