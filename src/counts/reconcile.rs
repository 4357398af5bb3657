use crate::{
    annotation::mirbase::CuratedFilter,
    counts::table::{PreCountedTable, SampleCounts},
    errors::PipelineError,
};
use std::collections::BTreeMap;

/// Merges alignment-derived counts with the pre-counted table into one
/// final table per sample.
///
/// The two sources are joined on mature-sequence identity: a direct
/// identifier match, or a translation through the curated name ↔ accession
/// mapping when it is non-empty. When `override_active` the computed source
/// is the authoritative curated one and overlapping pre-counted entries are
/// dropped; otherwise overlapping entries are summed. The inputs are
/// disjoint by construction (pre-counted entries cover fragments the
/// coordinate-based counter cannot assign), an upstream invariant this
/// function trusts rather than re-verifies. Features present only in the
/// pre-counted table carry through unchanged.
///
/// ## Errors
///
/// `Consistency` if a computed sample has no row in the pre-counted table's
/// sample set, which signals an upstream pipeline desync.
pub fn reconcile(
    computed: &BTreeMap<String, SampleCounts>, pre_counted: &PreCountedTable, curated: &CuratedFilter,
    override_active: bool,
) -> Result<BTreeMap<String, SampleCounts>, PipelineError> {
    let mut reconciled = BTreeMap::new();

    for (sample, counts) in computed {
        let pre = pre_counted.get(sample).ok_or_else(|| {
            PipelineError::Consistency(format!(
                "sample '{sample}' has computed counts but no row in the pre-counted table"
            ))
        })?;

        let mut merged = counts.clone();
        for (feature, &count) in pre {
            match resolve_identity(feature, &merged, curated) {
                Some(_) if override_active => {}
                Some(existing) => *merged.entry(existing).or_insert(0) += count,
                None => {
                    merged.insert(feature.clone(), count);
                }
            }
        }

        reconciled.insert(sample.clone(), merged);
    }

    Ok(reconciled)
}

/// Finds the computed feature carrying the same mature-sequence identity as
/// `feature`, directly or through the curated mapping. With an empty
/// curated filter only raw identifiers match.
fn resolve_identity(feature: &str, computed: &SampleCounts, curated: &CuratedFilter) -> Option<String> {
    if computed.contains_key(feature) {
        return Some(feature.to_string());
    }
    if curated.is_empty() {
        return None;
    }
    if let Some(accession) = curated.accession_of(feature) {
        if computed.contains_key(accession) {
            return Some(accession.to_string());
        }
    }
    if let Some(name) = curated.name_of(feature) {
        if computed.contains_key(name) {
            return Some(name.to_string());
        }
    }
    None
}
