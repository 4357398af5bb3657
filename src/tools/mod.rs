//! External collaborator tools invoked once per sample.
//!
//! Each tool derives exactly one output artifact path from the sample
//! identifier and surfaces a non-zero exit status as a unit-of-work
//! failure, which the stage runner attributes to the sample and stage.

use crate::{errors::PipelineError, runner::SampleTask};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

pub const FASTQC: &str = "fastqc";
pub const CUTADAPT: &str = "cutadapt";
pub const BOWTIE: &str = "bowtie";
pub const SAMTOOLS: &str = "samtools";
pub const FEATURE_COUNTS: &str = "featureCounts";

/// Runs an external tool to completion, mapping launch failures and
/// non-zero exits to errors.
fn run_tool(mut command: Command) -> std::io::Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let status = command
        .status()
        .map_err(|e| std::io::Error::other(format!("cannot launch '{program}': {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("'{program}' exited with {status}")))
    }
}

/// Per-sample FastQC evaluation. Reports land in a shared directory and do
/// not advance the ledger.
pub struct QcTask {
    pub report_dir: PathBuf,
    pub threads:    usize,
}

impl SampleTask for QcTask {
    fn stage(&self) -> &str {
        "qc"
    }

    fn output_path(&self, sample: &str, _input: &Path) -> PathBuf {
        self.report_dir.join(format!("{sample}_fastqc.html"))
    }

    fn invoke(&self, _sample: &str, input: &Path, _output: &Path) -> Result<(), PipelineError> {
        let mut command = Command::new(FASTQC);
        command
            .arg("--quiet")
            .arg("--threads")
            .arg(self.threads.to_string())
            .arg("--outdir")
            .arg(&self.report_dir)
            .arg(input);
        run_tool(command)?;
        Ok(())
    }
}

/// Adapter and quality trimming. One trimmed FASTQ per sample.
pub struct TrimTask {
    pub out_dir: PathBuf,
    pub adapter: String,
    pub threads: usize,
}

impl SampleTask for TrimTask {
    fn stage(&self) -> &str {
        "trim"
    }

    fn output_path(&self, sample: &str, _input: &Path) -> PathBuf {
        self.out_dir.join(format!("{sample}_trimmed.fastq.gz"))
    }

    fn invoke(&self, _sample: &str, input: &Path, output: &Path) -> Result<(), PipelineError> {
        let mut command = Command::new(CUTADAPT);
        command
            .arg("--adapter")
            .arg(&self.adapter)
            .arg("--cores")
            .arg(self.threads.to_string())
            .arg("--quality-cutoff")
            .arg("20")
            .arg("--minimum-length")
            .arg("18")
            .arg("--output")
            .arg(output)
            .arg(input);
        run_tool(command)?;
        Ok(())
    }
}

/// Alignment against the small-RNA index. The aligner's SAM is sorted into
/// a BAM and removed.
pub struct AlignTask {
    pub out_dir: PathBuf,
    pub index:   PathBuf,
    pub threads: usize,
}

impl SampleTask for AlignTask {
    fn stage(&self) -> &str {
        "align"
    }

    fn output_path(&self, sample: &str, _input: &Path) -> PathBuf {
        self.out_dir.join(format!("{sample}.bam"))
    }

    fn invoke(&self, sample: &str, input: &Path, output: &Path) -> Result<(), PipelineError> {
        let sam = self.out_dir.join(format!("{sample}.sam"));

        let mut aligner = Command::new(BOWTIE);
        aligner
            .arg("-S")
            .arg("-p")
            .arg(self.threads.to_string())
            .arg(&self.index)
            .arg(input)
            .arg(&sam);
        run_tool(aligner)?;

        let mut sorter = Command::new(SAMTOOLS);
        sorter
            .arg("sort")
            .arg("-@")
            .arg(self.threads.to_string())
            .arg("-o")
            .arg(output)
            .arg(&sam);
        run_tool(sorter)?;

        fs::remove_file(&sam)?;
        Ok(())
    }
}

/// featureCounts over one filtered annotation. One counts table per sample
/// per biotype.
pub struct CountTask {
    pub out_dir:    PathBuf,
    pub annotation: PathBuf,
    pub biotype:    String,
    pub threads:    usize,
}

impl SampleTask for CountTask {
    fn stage(&self) -> &str {
        "quantify"
    }

    fn output_path(&self, sample: &str, _input: &Path) -> PathBuf {
        self.out_dir.join(format!("{sample}.{}.counts.tsv", self.biotype))
    }

    fn invoke(&self, _sample: &str, input: &Path, output: &Path) -> Result<(), PipelineError> {
        let mut command = Command::new(FEATURE_COUNTS);
        command
            .arg("-T")
            .arg(self.threads.to_string())
            .arg("-t")
            .arg(&self.biotype)
            .arg("-g")
            .arg("Name")
            .arg("-a")
            .arg(&self.annotation)
            .arg("-o")
            .arg(output)
            .arg(input);
        run_tool(command)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn output_paths_are_derived_from_the_identifier() {
        let trim = TrimTask {
            out_dir: PathBuf::from("02_trim"),
            adapter: "AGATCGGAAGAG".to_string(),
            threads: 4,
        };
        assert_eq!(
            trim.output_path("liver1", Path::new("raw/liver1_R1_001.fastq.gz")),
            PathBuf::from("02_trim/liver1_trimmed.fastq.gz")
        );

        let count = CountTask {
            out_dir:    PathBuf::from("05_counts"),
            annotation: PathBuf::from("ref/9606.miRNA.gff"),
            biotype:    "miRNA".to_string(),
            threads:    4,
        };
        assert_eq!(
            count.output_path("liver1", Path::new("04_bam/liver1.bam")),
            PathBuf::from("05_counts/liver1.miRNA.counts.tsv")
        );
    }

    #[test]
    fn failing_tool_surfaces_a_unit_failure() {
        let mut command = Command::new("false");
        command.arg("--definitely-fails");
        assert!(run_tool(command).is_err());
    }
}
