use crate::{errors::PipelineError, utils::PROGRAM};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// The per-sample artifact mapping threading through pipeline stages.
///
/// Keys are sample identifiers, values the sample's current artifact path.
/// Each stage reads the previous stage's ledger, derives one output artifact
/// per sample, and persists the result, superseding the old entry set.
/// Persistence is a flat JSON object so the file stays human-readable and
/// exchangeable between stage invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, PathBuf>,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub(crate) fn from_entries(entries: BTreeMap<String, PathBuf>) -> Ledger {
        Ledger { entries }
    }

    /// Builds a ledger by scanning `dir` for files that contain `marker` (if
    /// given) and end with `suffix`. The sample identifier is the file name
    /// up to the marker, or the name with the suffix stripped when no marker
    /// applies.
    ///
    /// Scanning is in sorted file-name order. If two files map to the same
    /// identifier the later one wins and a warning names both paths.
    ///
    /// ## Errors
    ///
    /// `Config` if the directory cannot be scanned or no file matches.
    pub fn build(dir: &Path, marker: Option<&str>, suffix: &str) -> Result<Ledger, PipelineError> {
        let listing = std::fs::read_dir(dir)
            .map_err(|e| PipelineError::Config(format!("cannot scan input directory {}: {e}", dir.display())))?;

        let mut names = Vec::new();
        for entry in listing {
            let entry =
                entry.map_err(|e| PipelineError::Config(format!("cannot scan input directory {}: {e}", dir.display())))?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort_unstable();

        let mut entries: BTreeMap<String, PathBuf> = BTreeMap::new();
        for name in names {
            if !name.ends_with(suffix) {
                continue;
            }
            let sample = match marker {
                Some(marker) => match name.find(marker) {
                    Some(index) => &name[..index],
                    None => continue,
                },
                None => name.strip_suffix(suffix).unwrap_or(&name),
            };
            if sample.is_empty() {
                continue;
            }

            let path = dir.join(&name);
            if let Some(previous) = entries.insert(sample.to_string(), path.clone()) {
                eprintln!(
                    "{PROGRAM} WARNING! Sample '{sample}' matched both {} and {}; keeping the latter.",
                    previous.display(),
                    path.display()
                );
            }
        }

        if entries.is_empty() {
            let pattern = match marker {
                Some(marker) => format!("*{marker}*{suffix}"),
                None => format!("*{suffix}"),
            };
            return Err(PipelineError::Config(format!(
                "no files matching '{pattern}' found in {}",
                dir.display()
            )));
        }

        Ok(Ledger { entries })
    }

    /// Loads a persisted ledger.
    ///
    /// ## Errors
    ///
    /// `NotFound` if the file is absent, `Format` if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Ledger, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| PipelineError::Format {
            path:   path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Atomically persists the ledger: the JSON is written to a temporary
    /// file in the destination directory, flushed, and renamed into place,
    /// so a crash mid-write never leaves a partial file under `path`.
    pub fn persist(&self, path: &Path) -> Result<(), PipelineError> {
        let dir = parent_dir(path);
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self).map_err(|e| PipelineError::Format {
            path:   path.to_path_buf(),
            detail: e.to_string(),
        })?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;
        Ok(())
    }

    /// Returns the union of `base` and `incoming`; on identifier collision
    /// `incoming`'s path wins. Neither input is mutated.
    pub fn merge(base: &Ledger, incoming: &Ledger) -> Ledger {
        let mut entries = base.entries.clone();
        entries.extend(incoming.entries.iter().map(|(sample, path)| (sample.clone(), path.clone())));
        Ledger { entries }
    }

    pub fn insert(&mut self, sample: String, path: PathBuf) -> Option<PathBuf> {
        self.entries.insert(sample, path)
    }

    pub fn get(&self, sample: &str) -> Option<&PathBuf> {
        self.entries.get(sample)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.entries.iter()
    }

    pub fn samples(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Ledger {
        Ledger {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
