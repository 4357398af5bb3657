use crate::{
    annotation::retrieve::Retriever,
    errors::PipelineError,
    utils::{PROGRAM, io::open_text_reader},
};
use std::{
    collections::BTreeMap,
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Where the genome annotation comes from: a URL fetched into the reference
/// directory, or a local GFF already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSource {
    Url(String),
    File(PathBuf),
}

impl AnnotationSource {
    pub fn parse(raw: &str) -> AnnotationSource {
        if raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with("ftp://") {
            AnnotationSource::Url(raw.to_string())
        } else {
            AnnotationSource::File(PathBuf::from(raw))
        }
    }
}

/// Derives one taxonomy-filtered annotation file per requested biotype.
///
/// Filtered files are cached in `reference_dir` keyed by `(taxonomy,
/// biotype)`; an existing cache file is reused rather than regenerated, so
/// repeat invocations are idempotent. A URL source is fetched into
/// `reference_dir` first, skipped when the download already exists.
pub fn prepare_biotypes(
    reference_dir: &Path, source: &AnnotationSource, taxonomy: &str, biotypes: &[String], retriever: &dyn Retriever,
) -> Result<BTreeMap<String, PathBuf>, PipelineError> {
    fs::create_dir_all(reference_dir)?;

    let annotation = match source {
        AnnotationSource::File(path) => {
            if !path.exists() {
                return Err(PipelineError::NotFound(path.clone()));
            }
            path.clone()
        }
        AnnotationSource::Url(url) => {
            let name = url.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("annotation.gff");
            let dest = reference_dir.join(name);
            retriever.fetch(url, &dest)?;
            dest
        }
    };

    let mut filtered = BTreeMap::new();
    for biotype in biotypes {
        let out = reference_dir.join(format!("{taxonomy}.{biotype}.gff"));
        if !out.exists() {
            filter_annotation(&annotation, &out, taxonomy, biotype)?;
        }
        filtered.insert(biotype.clone(), out);
    }

    Ok(filtered)
}

/// Writes the subset of `annotation` whose feature type equals `biotype`
/// and whose attributes match `taxonomy`. Header lines pass through.
fn filter_annotation(annotation: &Path, out: &Path, taxonomy: &str, biotype: &str) -> Result<(), PipelineError> {
    let reader = open_text_reader(annotation)?;
    let dir = match out.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;

    let mut kept = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            writeln!(tmp, "{line}")?;
        } else if feature_matches(&line, taxonomy, biotype) {
            writeln!(tmp, "{line}")?;
            kept += 1;
        }
    }

    if kept == 0 {
        eprintln!(
            "{PROGRAM} WARNING! No '{biotype}' features for taxonomy {taxonomy} in {}.",
            annotation.display()
        );
    }

    tmp.flush()?;
    tmp.persist(out).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

fn feature_matches(line: &str, taxonomy: &str, biotype: &str) -> bool {
    let mut fields = line.split('\t');
    let Some(feature_type) = fields.nth(2) else {
        return false;
    };
    if feature_type != biotype {
        return false;
    }

    // Species-specific annotation files carry no per-line taxon tag; the
    // taxonomy only restricts multi-species files.
    let attributes = fields.nth(5).unwrap_or("");
    if !attributes.contains("taxon:") {
        return true;
    }
    attributes
        .split([';', ',', '='])
        .any(|token| token.strip_prefix("taxon:") == Some(taxonomy))
}
