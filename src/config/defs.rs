use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use log::LevelFilter;
use thiserror::Error;
use crate::cli::args::{Arguments, PairingPolicy, Scheduler};
use crate::utils::file::resolve_path;

// External software
pub const HISAT2_TAG: &str = "hisat2";
pub const QSUB_TAG: &str = "qsub";
pub const SBATCH_TAG: &str = "sbatch";

// Aligner flags
pub const HISAT2_DTA_FLAG: &str = "--dta";
pub const HISAT2_INDEX_FLAG: &str = "-x";
pub const HISAT2_UNPAIRED_FLAG: &str = "-U";
pub const HISAT2_MATE1_FLAG: &str = "-1";
pub const HISAT2_MATE2_FLAG: &str = "-2";
pub const HISAT2_OUTPUT_FLAG: &str = "-S";

// Naming conventions
pub const R1_PAIRED_PATTERN: &str = "*R1_paired*";
pub const R2_PAIRED_PATTERN: &str = "*R2_paired*";
pub const UNPAIRED_PATTERN: &str = "*trimmed.fastq";
pub const TRIMMED_TAG: &str = "trimmed";
pub const FASTQ_EXT: &str = "fastq";
pub const SAM_EXT: &str = "sam";

// Scheduler task id variables
pub const SGE_TASK_ID_VAR: &str = "SGE_TASK_ID";
pub const SLURM_TASK_ID_VAR: &str = "SLURM_ARRAY_TASK_ID";

// Defaults
pub const DEFAULT_INPUT_DIR: &str = "./trimmed";
pub const DEFAULT_OUTPUT_DIR: &str = "./mapped";
pub const DEFAULT_IDX_PREFIX: &str = "./index/grcm38_snp_tran/genome_snp_tran";
pub const DEFAULT_RAM_GB: u32 = 8;
pub const DEFAULT_JOB_NAME: &str = "rnaseq_map";
pub const DEFAULT_SCRIPT_NAME: &str = "script.autogenerated.rnaseq_map_jobs.sh";
pub const DEFAULT_SHELL: &str = "/bin/bash";


/// Glob patterns used to recognise sequencing files in the input directory.
#[derive(Debug, Clone, PartialEq)]
pub struct NamingConventions {
    pub r1_paired: String,
    pub r2_paired: String,
    pub unpaired: String,
}

impl Default for NamingConventions {
    fn default() -> Self {
        NamingConventions {
            r1_paired: R1_PAIRED_PATTERN.to_string(),
            r2_paired: R2_PAIRED_PATTERN.to_string(),
            unpaired: UNPAIRED_PATTERN.to_string(),
        }
    }
}


/// Log level for the `--verbose` switch.
pub fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}


pub struct RunConfig {
    pub cwd: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub idx_prefix: PathBuf,
    pub ram_gb: u32,
    pub aligner: String,
    pub job_name: String,
    pub script_path: PathBuf,
    pub scheduler: Scheduler,
    pub submit_cmd: Option<String>,
    pub pairing: PairingPolicy,
    pub conventions: NamingConventions,
    pub dry_run: bool,
    pub log_level: LevelFilter,
}

impl RunConfig {
    /// Resolves the command line against the working directory.
    pub fn from_args(args: Arguments, cwd: PathBuf) -> Result<Self, PipelineError> {
        if args.ram == 0 {
            return Err(PipelineError::InvalidConfig("RAM per task must be at least 1 GB".to_string()));
        }
        if args.job_name.is_empty() || args.job_name.chars().any(char::is_whitespace) {
            return Err(PipelineError::InvalidConfig(format!(
                "Job name must be a single non-empty word, got {:?}",
                args.job_name
            )));
        }
        if args.aligner.is_empty() {
            return Err(PipelineError::InvalidConfig("Aligner command is empty".to_string()));
        }

        // Spawned as a single program, never through a shell.
        if let Some(cmd) = &args.submit_cmd {
            if cmd.is_empty() || cmd.chars().any(char::is_whitespace) {
                return Err(PipelineError::InvalidConfig(format!(
                    "Submission command must be a bare executable without arguments, got {:?}",
                    cmd
                )));
            }
        }

        let log_level = log_level(args.verbose);

        Ok(RunConfig {
            input_dir: resolve_path(Path::new(&args.input_dir), &cwd),
            output_dir: resolve_path(Path::new(&args.output_dir), &cwd),
            idx_prefix: resolve_path(Path::new(&args.idx_prefix), &cwd),
            script_path: resolve_path(Path::new(&args.script_name), &cwd),
            ram_gb: args.ram,
            aligner: args.aligner,
            job_name: args.job_name,
            scheduler: args.scheduler,
            submit_cmd: args.submit_cmd,
            pairing: args.pairing,
            conventions: NamingConventions::default(),
            dry_run: args.dry_run,
            log_level,
            cwd,
        })
    }
}


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Paired file counts differ: {r1} R1 files vs {r2} R2 files")]
    PairingMismatch { r1: usize, r2: usize },

    #[error("Malformed filename {path:?}: {reason}")]
    MalformedFilename { path: PathBuf, reason: String },

    #[error("No mapping jobs could be assembled from {dir:?}")]
    NoMappingJobs { dir: PathBuf },

    #[error("Failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write job script {path:?}: {source}")]
    ScriptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run {tool}: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("Submission command `{command}` exited with {status}: {stderr}")]
    SubmissionFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
