use crate::{
    args::WorkerArgs,
    errors::PipelineError,
    ledger::Ledger,
    processes::TRIM_LEDGER,
    runner::run_stage,
    tools::{QcTask, TrimTask},
    utils::mkdir,
};
use clap::Args;
use std::path::PathBuf;

static MODULE: &str = module_path!();

/// Naming convention for raw R1 FASTQ files in the input directory.
pub const R1_MARKER: &str = "_R1_";
pub const FASTQ_SUFFIX: &str = ".fastq.gz";

#[derive(Args, Debug)]
pub struct TrimArgs {
    #[arg(short = 'I', long)]
    /// Directory containing the raw .fastq.gz files to process.
    pub input_dir: PathBuf,

    #[arg(short = 'A', long, default_value = "AGATCGGAAGAG")]
    /// Adapter sequence to remove. Defaults to the Illumina universal
    /// adapter.
    pub adapter: String,

    #[arg(short = 'a', long)]
    /// Merge the freshly built ledger over the previously persisted one, so
    /// samples from several input directories accumulate. Fresh entries win
    /// identifier collisions.
    pub append: bool,

    #[arg(long, default_value = "FastQC")]
    /// Directory for QC reports; Raw/ and Trim/ subdirectories are created.
    pub qc_dir: PathBuf,

    #[arg(long, default_value = "02_trim")]
    /// Directory for trimmed FASTQ output.
    pub out_dir: PathBuf,

    #[arg(long, default_value = "00_log")]
    /// Directory holding persisted pipeline state.
    pub log_dir: PathBuf,

    #[command(flatten)]
    pub workers: WorkerArgs,
}

/// Sub-program for the trimming/QC stage: builds the sample ledger from the
/// input directory, evaluates the raw reads, trims adapters, re-evaluates,
/// and persists the updated ledger for the next stage.
pub fn trim_process(args: TrimArgs) -> Result<(), PipelineError> {
    let ledger = Ledger::build(&args.input_dir, Some(R1_MARKER), FASTQ_SUFFIX)?;
    let config = args.workers.runner_config();

    let qc_raw = args.qc_dir.join("Raw");
    let qc_trim = args.qc_dir.join("Trim");
    for dir in [&qc_raw, &qc_trim, &args.out_dir, &args.log_dir] {
        mkdir(dir)?;
    }

    run_stage(&ledger, &config, &QcTask {
        report_dir: qc_raw,
        threads:    args.workers.threads,
    })?;

    let trimmed = run_stage(&ledger, &config, &TrimTask {
        out_dir: args.out_dir.clone(),
        adapter: args.adapter.clone(),
        threads: args.workers.threads,
    })?;

    run_stage(&trimmed, &config, &QcTask {
        report_dir: qc_trim,
        threads:    args.workers.threads,
    })?;

    let ledger_path = args.log_dir.join(TRIM_LEDGER);
    let trimmed = if args.append {
        Ledger::merge(&Ledger::load(&ledger_path)?, &trimmed)
    } else {
        trimmed
    };

    trimmed.persist(&ledger_path)?;
    eprintln!(
        "{MODULE}: recorded {} sample(s) in {}",
        trimmed.len(),
        ledger_path.display()
    );
    Ok(())
}
