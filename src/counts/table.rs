use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Feature → count for one sample.
pub type SampleCounts = BTreeMap<String, u64>;

/// Counts obtained by a method other than alignment-based quantification,
/// keyed by sample and then by mature-sequence identifier. Read-only input
/// to reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreCountedTable {
    samples: BTreeMap<String, SampleCounts>,
}

impl PreCountedTable {
    pub fn load(path: &Path) -> Result<PreCountedTable, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| PipelineError::Format {
            path:   path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn get(&self, sample: &str) -> Option<&SampleCounts> {
        self.samples.get(sample)
    }

    pub fn contains_sample(&self, sample: &str) -> bool {
        self.samples.contains_key(sample)
    }
}

impl FromIterator<(String, SampleCounts)> for PreCountedTable {
    fn from_iter<I: IntoIterator<Item = (String, SampleCounts)>>(iter: I) -> PreCountedTable {
        PreCountedTable {
            samples: iter.into_iter().collect(),
        }
    }
}

/// Parses a counts file emitted by the external counter.
///
/// `#` comment lines are skipped, as is a single leading non-numeric header
/// row. The feature identifier is the first column and the count the last,
/// which covers both plain two-column tables and the wider featureCounts
/// layout. Repeated features accumulate.
///
/// ## Errors
///
/// `NotFound` if the file is absent; `Format` for a non-integer count in a
/// data row.
pub fn read_counts_file(path: &Path) -> Result<SampleCounts, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::NotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut counts = SampleCounts::new();
    let mut header_allowed = true;

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t');
        let Some(feature) = fields.next() else {
            continue;
        };
        let Some(raw_count) = fields.next_back() else {
            continue;
        };

        match raw_count.trim().parse::<u64>() {
            Ok(count) => *counts.entry(feature.to_string()).or_insert(0) += count,
            Err(_) if header_allowed => {}
            Err(e) => {
                return Err(PipelineError::Format {
                    path:   path.to_path_buf(),
                    detail: format!("bad count '{raw_count}' for feature '{feature}': {e}"),
                });
            }
        }
        header_allowed = false;
    }

    Ok(counts)
}

/// Writes one final per-sample count table, one `feature\tcount` row per
/// feature in sorted order. The write is staged through a temporary file
/// and renamed into place.
pub fn write_counts_file(path: &Path, counts: &SampleCounts) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    for (feature, count) in counts {
        writeln!(tmp, "{feature}\t{count}")?;
    }
    tmp.flush()?;
    tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_the_feature_counts_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1.miRNA.counts.tsv");
        fs::write(
            &path,
            "# Program:featureCounts v2.0; Command:...\n\
             Geneid\tChr\tStart\tEnd\tStrand\tLength\t04_bam/S1.bam\n\
             hsa-let-7a-5p\tchr1\t10\t31\t+\t22\t12\n\
             hsa-miR-21-5p\tchr2\t5\t26\t+\t22\t0\n",
        )
        .unwrap();

        let counts = read_counts_file(&path).unwrap();
        assert_eq!(counts.get("hsa-let-7a-5p"), Some(&12));
        assert_eq!(counts.get("hsa-miR-21-5p"), Some(&0));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn parses_plain_two_column_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.tsv");
        fs::write(&path, "hsa-let-7a-5p\t7\nhsa-miR-21-5p\t3\n").unwrap();

        let counts = read_counts_file(&path).unwrap();
        assert_eq!(counts.get("hsa-let-7a-5p"), Some(&7));
        assert_eq!(counts.get("hsa-miR-21-5p"), Some(&3));
    }

    #[test]
    fn non_numeric_data_row_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.tsv");
        fs::write(&path, "hsa-let-7a-5p\t7\nhsa-miR-21-5p\tNA\n").unwrap();

        let err = read_counts_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Format { .. }));
    }

    #[test]
    fn missing_counts_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_counts_file(&dir.path().join("absent.tsv")).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn written_tables_read_back_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1.counts.tsv");
        let counts: SampleCounts =
            [("hsa-let-7a-5p".to_string(), 19), ("hsa-miR-21-5p".to_string(), 3)].into_iter().collect();

        write_counts_file(&path, &counts).unwrap();
        assert_eq!(read_counts_file(&path).unwrap(), counts);
    }

    #[test]
    fn pre_counted_table_round_trips_through_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirna_precounts.json");
        fs::write(&path, "{\"S1\": {\"hsa-let-7a-5p\": 4}, \"S2\": {}}").unwrap();

        let table = PreCountedTable::load(&path).unwrap();
        assert!(table.contains_sample("S2"));
        assert_eq!(table.get("S1").unwrap().get("hsa-let-7a-5p"), Some(&4));
    }

    #[test]
    fn malformed_pre_counted_table_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirna_precounts.json");
        fs::write(&path, "{\"S1\": {\"hsa-let-7a-5p\": -4}}").unwrap();

        let err = PreCountedTable::load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Format { .. }));
    }
}
