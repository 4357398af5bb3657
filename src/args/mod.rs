use crate::runner::{ExecMode, RunnerConfig, Workers};
use clap::Args;

/// Worker and run-control flags shared by every pipeline stage.
#[derive(Args, Debug)]
pub struct WorkerArgs {
    #[arg(short = 'P', long, default_value_t = 4)]
    /// Number of parallel worker processes. 0 runs one worker per sample to
    /// maximize parallelization.
    pub processes: usize,

    #[arg(short = 'T', long, default_value_t = num_cpus::get())]
    /// Threads passed to external tools that support multithreading.
    pub threads: usize,

    #[arg(short = 'S', long)]
    /// Run strictly sequentially. Much slower, but less memory-intensive.
    pub slow: bool,

    #[arg(short = 'R', long)]
    /// Execute the external operations. Without this flag the stage is a
    /// dry validation: ledgers and output paths are derived, tools are not
    /// invoked.
    pub run: bool,
}

impl WorkerArgs {
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            run:     self.run,
            workers: Workers::from_processes(self.processes),
            mode:    if self.slow { ExecMode::Sequential } else { ExecMode::Parallel },
        }
    }
}
