use crate::{
    args::WorkerArgs,
    errors::PipelineError,
    processes::{ALIGN_LEDGER, TRIM_LEDGER, resume_ledger},
    runner::run_stage,
    tools::AlignTask,
    utils::mkdir,
};
use clap::Args;
use std::path::PathBuf;

static MODULE: &str = module_path!();

#[derive(Args, Debug)]
pub struct AlignArgs {
    #[arg(short = 'x', long)]
    /// Aligner index base path for the small-RNA reference.
    pub index: PathBuf,

    #[arg(long, default_value = "02_trim")]
    /// Directory holding trimmed FASTQ files; used to rebuild the ledger if
    /// the trim stage's ledger file is missing.
    pub trim_dir: PathBuf,

    #[arg(long, default_value = "04_bam")]
    /// Directory for aligned BAM output.
    pub out_dir: PathBuf,

    #[arg(long, default_value = "00_log")]
    /// Directory holding persisted pipeline state.
    pub log_dir: PathBuf,

    #[command(flatten)]
    pub workers: WorkerArgs,
}

/// Sub-program for the alignment stage: one BAM per sample from the trimmed
/// reads, recorded in a fresh ledger for quantification.
pub fn align_process(args: AlignArgs) -> Result<(), PipelineError> {
    let ledger = resume_ledger(
        &args.log_dir.join(TRIM_LEDGER),
        &args.trim_dir,
        Some("_trimmed"),
        ".fastq.gz",
    )?;
    let config = args.workers.runner_config();

    mkdir(&args.out_dir)?;
    mkdir(&args.log_dir)?;

    let aligned = run_stage(&ledger, &config, &AlignTask {
        out_dir: args.out_dir.clone(),
        index:   args.index.clone(),
        threads: args.workers.threads,
    })?;

    let ledger_path = args.log_dir.join(ALIGN_LEDGER);
    aligned.persist(&ledger_path)?;
    eprintln!(
        "{MODULE}: recorded {} sample(s) in {}",
        aligned.len(),
        ledger_path.display()
    );
    Ok(())
}
