use crate::{
    annotation::{AnnotationSource, HttpRetriever, Retriever, filter_curated_reference, prepare_biotypes},
    args::WorkerArgs,
    counts::{PreCountedTable, read_counts_file, reconcile, write_counts_file},
    errors::PipelineError,
    ledger::Ledger,
    processes::{ALIGN_LEDGER, COUNTS_LEDGER, resume_ledger},
    runner::run_stage,
    tools::CountTask,
    utils::mkdir,
};
use clap::Args;
use std::{collections::BTreeMap, path::PathBuf};

static MODULE: &str = module_path!();

/// The distinguished biotype whose counts are reconciled with the
/// pre-counted table.
pub const PRIMARY_BIOTYPE: &str = "miRNA";

#[derive(Args, Debug)]
pub struct QuantifyArgs {
    #[arg(short = 'r', long)]
    /// Genome reference directory where annotation artifacts are stored.
    pub reference_dir: PathBuf,

    #[arg(short = 't', long)]
    /// Taxonomy code selecting which organism's features are retained
    /// (9606 for human).
    pub taxonomy: String,

    #[arg(short = 'G', long)]
    /// Genome annotation source: a URL to download, or a local GFF path.
    pub annotation: String,

    #[arg(short = 'K', long)]
    /// Organism classification code filtering the curated reference (hsa
    /// for human).
    pub classification: String,

    #[arg(short = 'M', long)]
    /// URL of a curated organism-specific miRNA annotation. When given it
    /// replaces the locally filtered miRNA entry and the computed counts
    /// become authoritative during reconciliation. Leave unset when the
    /// organism is not in the curated database.
    pub mirna_gff: Option<String>,

    #[arg(short = 'b', long, value_delimiter = ',', default_value = "miRNA")]
    /// Biotypes to quantify.
    pub biotypes: Vec<String>,

    #[arg(long, default_value = "00_log/mirna_precounts.json")]
    /// Pre-counted miRNA table (sample, then mature identifier, to count)
    /// produced upstream by exact-sequence matching.
    pub pre_counted: PathBuf,

    #[arg(long, default_value = "04_bam")]
    /// Directory holding aligned BAM files; used to rebuild the ledger if
    /// the align stage's ledger file is missing.
    pub bam_dir: PathBuf,

    #[arg(long, default_value = "05_counts")]
    /// Directory for per-sample count tables.
    pub out_dir: PathBuf,

    #[arg(long, default_value = "00_log")]
    /// Directory holding persisted pipeline state.
    pub log_dir: PathBuf,

    #[command(flatten)]
    pub workers: WorkerArgs,
}

/// Sub-program for the quantification stage: derives taxonomy-filtered
/// annotations, counts aligned reads per biotype, reconciles the miRNA
/// counts with the pre-counted table, and persists the final count ledger.
pub fn quantify_process(args: QuantifyArgs) -> Result<(), PipelineError> {
    let ledger = resume_ledger(&args.log_dir.join(ALIGN_LEDGER), &args.bam_dir, None, ".bam")?;
    let pre_counted = PreCountedTable::load(&args.pre_counted)?;
    let config = args.workers.runner_config();

    mkdir(&args.out_dir)?;
    mkdir(&args.log_dir)?;

    let retriever = HttpRetriever;
    let source = AnnotationSource::parse(&args.annotation);
    let mut annotations = prepare_biotypes(
        &args.reference_dir,
        &source,
        &args.taxonomy,
        &args.biotypes,
        &retriever,
    )?;
    let curated = filter_curated_reference(&args.classification, &args.reference_dir.join("mature.fa"))?;

    let override_active = match &args.mirna_gff {
        Some(url) => {
            let dest = args.reference_dir.join("miRNA.gff3");
            retriever.fetch(url, &dest)?;
            annotations.insert(PRIMARY_BIOTYPE.to_string(), dest);
            true
        }
        None => false,
    };

    for (biotype, annotation) in &annotations {
        let counted = run_stage(&ledger, &config, &CountTask {
            out_dir:    args.out_dir.clone(),
            annotation: annotation.clone(),
            biotype:    biotype.clone(),
            threads:    args.workers.threads,
        })?;

        if biotype != PRIMARY_BIOTYPE {
            continue;
        }
        if !config.run {
            eprintln!("{MODULE}: dry run, skipping reconciliation for {} sample(s)", counted.len());
            continue;
        }

        let mut computed = BTreeMap::new();
        for (sample, path) in counted.iter() {
            computed.insert(sample.clone(), read_counts_file(path)?);
        }
        let reconciled = reconcile(&computed, &pre_counted, &curated, override_active)?;

        let mut final_ledger = Ledger::new();
        for (sample, counts) in &reconciled {
            let path = args.out_dir.join(format!("{sample}.counts.tsv"));
            write_counts_file(&path, counts)?;
            final_ledger.insert(sample.clone(), path);
        }

        let ledger_path = args.log_dir.join(COUNTS_LEDGER);
        final_ledger.persist(&ledger_path)?;
        eprintln!(
            "{MODULE}: recorded {} final count table(s) in {}",
            final_ledger.len(),
            ledger_path.display()
        );
    }

    Ok(())
}
