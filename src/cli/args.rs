use clap::{Parser, ValueEnum};
use crate::config::defs::{
    DEFAULT_IDX_PREFIX, DEFAULT_INPUT_DIR, DEFAULT_JOB_NAME, DEFAULT_OUTPUT_DIR, DEFAULT_RAM_GB,
    DEFAULT_SCRIPT_NAME, HISAT2_TAG,
};

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum Scheduler {
    #[default]
    Sge,
    Slurm,
}

/// What to do when the R1 and R2 file lists differ in length.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum PairingPolicy {
    /// Pair up to the shorter list and warn about the leftovers.
    #[default]
    Lenient,
    /// Refuse to pair.
    Strict,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "rnaseq-map", version, about = "Assemble HISAT2 mapping commands for a directory of FASTQ files and submit them as a job array.")]
pub struct Arguments {

    #[arg(short = 'i', long = "input-dir", default_value = DEFAULT_INPUT_DIR, help = "The directory where the input files reside.")]
    pub input_dir: String,

    #[arg(short = 'o', long = "output-dir", default_value = DEFAULT_OUTPUT_DIR, help = "The directory where to output the results.")]
    pub output_dir: String,

    #[arg(short = 'p', long = "idx-prefix", default_value = DEFAULT_IDX_PREFIX, help = "The prefix of the genome index files.")]
    pub idx_prefix: String,

    #[arg(short = 'r', long = "ram", default_value_t = DEFAULT_RAM_GB, help = "RAM amount per job (in GB).")]
    pub ram: u32,

    #[arg(long, default_value = HISAT2_TAG)]
    pub aligner: String,

    #[arg(long = "job-name", default_value = DEFAULT_JOB_NAME)]
    pub job_name: String,

    #[arg(long = "script-name", default_value = DEFAULT_SCRIPT_NAME, help = "Where the generated job script is written. Overwritten on every run.")]
    pub script_name: String,

    #[arg(long, default_value = "sge", value_enum)]
    pub scheduler: Scheduler,

    #[arg(long = "submit-cmd", help = "Submission executable replacing the scheduler default (qsub or sbatch); a bare program name or path, no arguments")]
    pub submit_cmd: Option<String>,

    #[arg(long, default_value = "lenient", value_enum)]
    pub pairing: PairingPolicy,

    #[arg(long = "dry-run", default_value_t = false, help = "Write the job script without submitting it")]
    pub dry_run: bool,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,
}
