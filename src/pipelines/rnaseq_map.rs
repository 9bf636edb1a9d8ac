use std::fs;
use std::path::PathBuf;

use log::{debug, info};

use crate::config::defs::{PipelineError, RunConfig, DEFAULT_SHELL};
use crate::utils::command::assemble_jobs;
use crate::utils::discovery::search_files;
use crate::utils::file::write_atomically;
use crate::utils::jobscript::{render_job_script, JobScriptSettings, TaskTable};
use crate::utils::scheduler::submit_script;

/// Outcome of one run of the mapping pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub task_count: usize,
    pub script_path: PathBuf,
    /// Output of the submission command; None on a dry run.
    pub submission: Option<String>,
}


/// Finds the input files, assembles one HISAT2 command per sample, writes the
/// job array script and submits it.
///
/// # Arguments
///
/// * `config` - RunConfig struct from main.
///
/// # Returns
/// RunSummary with the number of tasks and where the script was written.
pub async fn run(config: &RunConfig) -> Result<RunSummary, PipelineError> {
    println!("\n-------------\n RNAseq Map\n-------------\n");
    info!(
        "Resolved parameters:\n    Input directory: {}\n    Output directory: {}\n    Index prefix: {}\n    RAM per process: {}G",
        config.input_dir.display(),
        config.output_dir.display(),
        config.idx_prefix.display(),
        config.ram_gb
    );

    // 1. Find the data to map
    let files = search_files(&config.input_dir, &config.conventions, config.pairing)?;
    info!(
        "Found {} read pairs and {} unpaired files in {}",
        files.paired.len(),
        files.unpaired.len(),
        config.input_dir.display()
    );

    // 2. One mapping command per sample
    let table = TaskTable::try_from_jobs(assemble_jobs(
        &files,
        &config.aligner,
        &config.idx_prefix,
        &config.output_dir,
    ))?;
    if table.is_empty() {
        return Err(PipelineError::NoMappingJobs { dir: config.input_dir.clone() });
    }
    for (id, job) in table.iter() {
        debug!("Task {}: {}", id, job.command_line());
    }

    // 3. Job array script
    let settings = JobScriptSettings {
        scheduler: config.scheduler,
        job_name: config.job_name.clone(),
        ram_gb: config.ram_gb,
        shell: DEFAULT_SHELL.to_string(),
    };
    let script = render_job_script(&table, &settings)?;

    // 4. Persist it next to the previous run's script
    fs::create_dir_all(&config.output_dir).map_err(|source| PipelineError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;
    write_atomically(&config.script_path, script.as_str(), true)?;
    info!(
        "Wrote job array script with {} tasks to {}",
        script.task_count(),
        config.script_path.display()
    );

    let mut summary = RunSummary {
        task_count: script.task_count(),
        script_path: config.script_path.clone(),
        submission: None,
    };

    if config.dry_run {
        info!("Dry run: not submitting {}", config.script_path.display());
        return Ok(summary);
    }

    // 5. Submit
    let program = config
        .submit_cmd
        .as_deref()
        .unwrap_or_else(|| config.scheduler.submit_program());
    summary.submission = Some(submit_script(program, &config.script_path).await?);

    Ok(summary)
}
