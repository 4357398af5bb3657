use crate::{errors::PipelineError, ledger::Ledger};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

/// Worker allotment for a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workers {
    Fixed(NonZeroUsize),
    /// One worker per sample: maximal parallelism, no oversubscription
    /// protection.
    OnePerSample,
}

impl Workers {
    /// Maps the CLI process count onto an allotment; `0` means one worker
    /// per sample.
    pub fn from_processes(processes: usize) -> Workers {
        match NonZeroUsize::new(processes) {
            Some(n) => Workers::Fixed(n),
            None => Workers::OnePerSample,
        }
    }

    fn pool_size(&self, samples: usize) -> usize {
        match self {
            Workers::Fixed(n) => n.get(),
            Workers::OnePerSample => samples.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Parallel,
    /// Strictly sequential execution to cap peak memory. Semantics are
    /// identical to the parallel path.
    Sequential,
}

/// Validated run controls shared by every stage.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// `false` derives output paths without invoking external operations.
    pub run:     bool,
    pub workers: Workers,
    pub mode:    ExecMode,
}

/// One per-sample unit of work executed by the stage runner.
///
/// Units are mutually independent: no shared mutable state and no ordering
/// requirement between samples. The output path must be derivable from the
/// sample identifier alone so that dry runs produce the same ledger key set
/// and paths as real runs.
pub trait SampleTask: Sync {
    /// Stage name used in diagnostics.
    fn stage(&self) -> &str;

    /// Derives the output artifact path for one sample.
    fn output_path(&self, sample: &str, input: &Path) -> PathBuf;

    /// Invokes the external operation for one sample.
    fn invoke(&self, sample: &str, input: &Path, output: &Path) -> Result<(), PipelineError>;
}

/// Runs `task` over every ledger entry and returns the ledger of output
/// artifacts.
///
/// Fail-fast: the first failing unit aborts the stage and the error names
/// the offending sample and stage. Callers persist the returned ledger only
/// after this function succeeds, so a failed stage leaves no partial ledger
/// behind.
pub fn run_stage<T: SampleTask>(ledger: &Ledger, config: &RunnerConfig, task: &T) -> Result<Ledger, PipelineError> {
    let unit = |sample: &String, input: &PathBuf| -> Result<(String, PathBuf), PipelineError> {
        let output = task.output_path(sample, input);
        if config.run {
            task.invoke(sample, input, &output)
                .map_err(|e| into_unit_failure(task.stage(), sample, e))?;
        }
        Ok((sample.clone(), output))
    };

    let entries = match config.mode {
        ExecMode::Sequential => {
            let mut entries = BTreeMap::new();
            for (sample, input) in ledger.iter() {
                let (sample, output) = unit(sample, input)?;
                entries.insert(sample, output);
            }
            entries
        }
        ExecMode::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers.pool_size(ledger.len()))
                .build()
                .map_err(|e| PipelineError::Config(format!("cannot build worker pool: {e}")))?;

            pool.install(|| {
                ledger
                    .iter()
                    .collect::<Vec<_>>()
                    .into_par_iter()
                    .map(|(sample, input)| unit(sample, input))
                    .collect::<Result<BTreeMap<String, PathBuf>, PipelineError>>()
            })?
        }
    };

    Ok(Ledger::from_entries(entries))
}

fn into_unit_failure(stage: &str, sample: &str, error: PipelineError) -> PipelineError {
    match error {
        already_attributed @ PipelineError::Tool { .. } => already_attributed,
        other => PipelineError::Tool {
            stage:  stage.to_string(),
            sample: sample.to_string(),
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic stand-in for an external per-sample operation.
    struct StubTask {
        calls:   AtomicUsize,
        fail_on: Option<&'static str>,
    }

    impl StubTask {
        fn new() -> StubTask {
            StubTask {
                calls:   AtomicUsize::new(0),
                fail_on: None,
            }
        }

        fn failing_on(sample: &'static str) -> StubTask {
            StubTask {
                calls:   AtomicUsize::new(0),
                fail_on: Some(sample),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SampleTask for StubTask {
        fn stage(&self) -> &str {
            "stub"
        }

        fn output_path(&self, sample: &str, _input: &Path) -> PathBuf {
            PathBuf::from(format!("out/{sample}.done"))
        }

        fn invoke(&self, sample: &str, _input: &Path, _output: &Path) -> Result<(), PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(sample) {
                return Err(PipelineError::Config("tool exited with status 1".to_string()));
            }
            Ok(())
        }
    }

    fn five_samples() -> Ledger {
        (1..=5)
            .map(|i| (format!("S{i}"), PathBuf::from(format!("in/S{i}.fastq.gz"))))
            .collect()
    }

    fn config(run: bool, processes: usize, mode: ExecMode) -> RunnerConfig {
        RunnerConfig {
            run,
            workers: Workers::from_processes(processes),
            mode,
        }
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let ledger = five_samples();
        let sequential = run_stage(&ledger, &config(true, 1, ExecMode::Sequential), &StubTask::new()).unwrap();
        let parallel = run_stage(&ledger, &config(true, 4, ExecMode::Parallel), &StubTask::new()).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn one_worker_per_sample_agrees_too() {
        let ledger = five_samples();
        let bounded = run_stage(&ledger, &config(true, 2, ExecMode::Parallel), &StubTask::new()).unwrap();
        let unbounded = run_stage(&ledger, &config(true, 0, ExecMode::Parallel), &StubTask::new()).unwrap();
        assert_eq!(bounded, unbounded);
    }

    #[test]
    fn dry_run_derives_paths_without_invoking() {
        let ledger = five_samples();
        let task = StubTask::new();

        let dry = run_stage(&ledger, &config(false, 4, ExecMode::Parallel), &task).unwrap();
        assert_eq!(task.calls(), 0);

        let real = run_stage(&ledger, &config(true, 4, ExecMode::Parallel), &task).unwrap();
        assert_eq!(task.calls(), ledger.len());
        assert_eq!(dry, real);
        assert_eq!(dry.get("S3"), Some(&PathBuf::from("out/S3.done")));
    }

    #[test]
    fn unit_failure_aborts_and_names_the_sample() {
        let ledger = five_samples();
        let err = run_stage(&ledger, &config(true, 4, ExecMode::Parallel), &StubTask::failing_on("S3")).unwrap_err();

        match err {
            PipelineError::Tool { stage, sample, .. } => {
                assert_eq!(stage, "stub");
                assert_eq!(sample, "S3");
            }
            other => panic!("expected a unit failure, got: {other}"),
        }
    }

    #[test]
    fn sequential_failure_matches_parallel_failure() {
        let ledger = five_samples();
        let err = run_stage(&ledger, &config(true, 1, ExecMode::Sequential), &StubTask::failing_on("S5")).unwrap_err();
        assert!(err.to_string().contains("S5"));
    }

    #[test]
    fn workers_from_zero_means_one_per_sample() {
        assert_eq!(Workers::from_processes(0), Workers::OnePerSample);
        assert_eq!(
            Workers::from_processes(3),
            Workers::Fixed(NonZeroUsize::new(3).unwrap())
        );
    }
}
