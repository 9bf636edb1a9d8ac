// src/utils/scheduler.rs: Cluster scheduler directives and job submission
use std::path::Path;

use log::{debug, info};
use tokio::process::Command;

use crate::cli::args::Scheduler;
use crate::config::defs::{PipelineError, QSUB_TAG, SBATCH_TAG, SGE_TASK_ID_VAR, SLURM_TASK_ID_VAR};
use crate::utils::jobscript::JobScriptSettings;


/// One header line for the scheduler, with an optional explanatory comment above it.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub comment: Option<&'static str>,
    pub line: String,
}

impl Directive {
    fn new(comment: &'static str, line: String) -> Self {
        Directive { comment: Some(comment), line }
    }

    pub fn render(&self) -> String {
        match self.comment {
            Some(comment) => format!("\n# {}\n{}", comment, self.line),
            None => self.line.clone(),
        }
    }
}


impl Scheduler {
    /// Environment variable through which a running task learns its id.
    pub fn task_id_var(&self) -> &'static str {
        match self {
            Scheduler::Sge => SGE_TASK_ID_VAR,
            Scheduler::Slurm => SLURM_TASK_ID_VAR,
        }
    }

    pub fn submit_program(&self) -> &'static str {
        match self {
            Scheduler::Sge => QSUB_TAG,
            Scheduler::Slurm => SBATCH_TAG,
        }
    }

    /// Header directives for a job array of `task_count` tasks.
    pub fn header_directives(&self, settings: &JobScriptSettings, task_count: usize) -> Vec<Directive> {
        match self {
            Scheduler::Sge => vec![
                Directive::new("Run through this shell", format!("#$ -S {}", settings.shell)),
                Directive::new("Use current working directory", "#$ -cwd".to_string()),
                Directive::new("Join stdout and stderr", "#$ -j y".to_string()),
                Directive::new("Name the job array", format!("#$ -N {}", settings.job_name)),
                Directive::new("Pass environment", "#$ -V".to_string()),
                Directive::new("Available RAM per task", format!("#$ -l vf={}G", settings.ram_gb)),
                Directive::new("One task per mapping command", format!("#$ -t 1-{}", task_count)),
            ],
            Scheduler::Slurm => vec![
                Directive::new("Name the job array", format!("#SBATCH --job-name={}", settings.job_name)),
                Directive::new(
                    "Join stdout and stderr, one log per task",
                    format!("#SBATCH --output={}_%A_%a.out", settings.job_name),
                ),
                Directive::new("Pass environment", "#SBATCH --export=ALL".to_string()),
                Directive::new("Available RAM per task", format!("#SBATCH --mem={}G", settings.ram_gb)),
                Directive::new("One task per mapping command", format!("#SBATCH --array=1-{}", task_count)),
            ],
        }
    }
}


/// Hands a job script to the scheduler's submission command.
/// Waits for the submission command only, never for the array itself.
///
/// # Arguments
///
/// * `program` - Submission command, e.g. qsub.
/// * `script_path` - Job script to submit.
///
/// # Returns
/// Result<String>: stdout of the submission command.
pub async fn submit_script(program: &str, script_path: &Path) -> Result<String, PipelineError> {
    debug!("Submitting {:?} with {}", script_path, program);

    let output = Command::new(program)
        .arg(script_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .output()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: program.to_string(),
            error: format!("{}. Is {} installed?", e, program),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() {
        return Err(PipelineError::SubmissionFailed {
            command: format!("{} {}", program, script_path.display()),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!("{}", stdout);
    Ok(stdout)
}
