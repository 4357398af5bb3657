use crate::errors::PipelineError;
use std::{fs, io::Write, path::Path};
use tempfile::NamedTempFile;

/// Outcome of a reference retrieval. An already-present destination is
/// reported distinctly so callers can tell a skip from a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Downloaded,
    AlreadyPresent,
}

/// Collaborator boundary for fetching reference files by URL.
pub trait Retriever {
    fn fetch(&self, url: &str, dest: &Path) -> Result<Fetched, PipelineError>;
}

/// Blocking HTTP retrieval. Downloads land in a temporary file and are
/// renamed into place once complete.
pub struct HttpRetriever;

impl Retriever for HttpRetriever {
    fn fetch(&self, url: &str, dest: &Path) -> Result<Fetched, PipelineError> {
        if dest.exists() {
            return Ok(Fetched::AlreadyPresent);
        }

        let response = reqwest::blocking::get(url).map_err(|e| PipelineError::Retrieve {
            url:    url.to_string(),
            detail: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(PipelineError::Retrieve {
                url:    url.to_string(),
                detail: format!("HTTP status {}", response.status()),
            });
        }
        let body = response.bytes().map_err(|e| PipelineError::Retrieve {
            url:    url.to_string(),
            detail: e.to_string(),
        })?;

        let dir = match dest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&body)?;
        tmp.flush()?;
        tmp.persist(dest).map_err(|e| PipelineError::Io(e.error))?;

        Ok(Fetched::Downloaded)
    }
}
