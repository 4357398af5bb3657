use crate::{
    errors::PipelineError,
    utils::{PROGRAM, io::open_text_reader},
};
use foldhash::HashMap;
use std::{io::BufRead, path::Path};

/// Mature-sequence identities restricted to one organism classification
/// code, used to disambiguate feature identities during reconciliation.
///
/// May be logically empty (the code matched nothing, or the curated
/// reference is absent); reconciliation then falls back to raw-identifier
/// matching.
#[derive(Debug, Default)]
pub struct CuratedFilter {
    name_to_accession: HashMap<String, String>,
    accession_to_name: HashMap<String, String>,
}

impl CuratedFilter {
    pub fn empty() -> CuratedFilter {
        CuratedFilter::default()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_accession.is_empty()
    }

    pub fn len(&self) -> usize {
        self.name_to_accession.len()
    }

    pub fn accession_of(&self, name: &str) -> Option<&str> {
        self.name_to_accession.get(name).map(String::as_str)
    }

    pub fn name_of(&self, accession: &str) -> Option<&str> {
        self.accession_to_name.get(accession).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, accession: String) {
        self.accession_to_name.insert(accession.clone(), name.clone());
        self.name_to_accession.insert(name, accession);
    }
}

/// Restricts a curated mature-miRNA FASTA to one organism classification
/// prefix (`hsa` keeps the `hsa-*` entries). Headers follow the
/// `>name accession description` convention; an entry without an accession
/// maps the name to itself.
///
/// A missing reference file or a code matching nothing yields the empty
/// filter, not an error.
pub fn filter_curated_reference(classification: &str, mature_fa: &Path) -> Result<CuratedFilter, PipelineError> {
    if !mature_fa.exists() {
        eprintln!(
            "{PROGRAM} WARNING! Curated reference {} not found; identity matching will not be classification-restricted.",
            mature_fa.display()
        );
        return Ok(CuratedFilter::empty());
    }

    let reader = open_text_reader(mature_fa)?;
    let prefix = format!("{classification}-");
    let mut filter = CuratedFilter::empty();

    for line in reader.lines() {
        let line = line?;
        let Some(header) = line.strip_prefix('>') else {
            continue;
        };
        let mut tokens = header.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };
        if !name.starts_with(&prefix) {
            continue;
        }
        let accession = tokens.next().unwrap_or(name);
        filter.insert(name.to_string(), accession.to_string());
    }

    Ok(filter)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MATURE_FA: &str = "\
>hsa-let-7a-5p MIMAT0000062 Homo sapiens let-7a-5p
UGAGGUAGUAGGUUGUAUAGUU
>hsa-miR-21-5p MIMAT0000076 Homo sapiens miR-21-5p
UAGCUUAUCAGACUGAUGUUGA
>mmu-let-7a-5p MIMAT0000521 Mus musculus let-7a-5p
UGAGGUAGUAGGUUGUAUAGUU
";

    #[test]
    fn keeps_only_the_requested_classification() {
        let dir = tempdir().unwrap();
        let fa = dir.path().join("mature.fa");
        fs::write(&fa, MATURE_FA).unwrap();

        let filter = filter_curated_reference("hsa", &fa).unwrap();
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.accession_of("hsa-let-7a-5p"), Some("MIMAT0000062"));
        assert_eq!(filter.name_of("MIMAT0000076"), Some("hsa-miR-21-5p"));
        assert_eq!(filter.accession_of("mmu-let-7a-5p"), None);
    }

    #[test]
    fn unmatched_classification_is_empty_not_an_error() {
        let dir = tempdir().unwrap();
        let fa = dir.path().join("mature.fa");
        fs::write(&fa, MATURE_FA).unwrap();

        let filter = filter_curated_reference("cel", &fa).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn missing_reference_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let filter = filter_curated_reference("hsa", &dir.path().join("mature.fa")).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn header_without_accession_maps_name_to_itself() {
        let dir = tempdir().unwrap();
        let fa = dir.path().join("mature.fa");
        fs::write(&fa, ">hsa-miR-novel\nACGUACGU\n").unwrap();

        let filter = filter_curated_reference("hsa", &fa).unwrap();
        assert_eq!(filter.accession_of("hsa-miR-novel"), Some("hsa-miR-novel"));
    }
}
