use clap::{Parser, Subcommand};
use srna_core::{
    processes::{
        align::{AlignArgs, align_process},
        quantify::{QuantifyArgs, quantify_process},
        trim::{TrimArgs, trim_process},
    },
    utils::OrFail,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scans raw FASTQ files, runs per-sample QC and adapter trimming, and
    /// persists the sample ledger.
    Trim(TrimArgs),
    /// Aligns trimmed reads against the small-RNA index, producing one BAM
    /// per sample.
    Align(AlignArgs),
    /// Quantifies aligned reads per biotype and reconciles the miRNA counts
    /// with the pre-counted table.
    Quantify(QuantifyArgs),
}

fn main() {
    let args = Cli::parse();

    match args.command {
        Commands::Trim(cmd_args) => trim_process(cmd_args).unwrap_or_die("subcommand 'trim'"),
        Commands::Align(cmd_args) => align_process(cmd_args).unwrap_or_die("subcommand 'align'"),
        Commands::Quantify(cmd_args) => quantify_process(cmd_args).unwrap_or_die("subcommand 'quantify'"),
    }
}
