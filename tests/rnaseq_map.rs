use std::fs::{self, File};
use std::path::Path;
use std::process::Command;

use anyhow::Result;
use clap::Parser;
use tempfile::tempdir;

use rnaseq_map::cli::Arguments;
use rnaseq_map::config::defs::{PipelineError, RunConfig};
use rnaseq_map::pipelines::rnaseq_map::run;
use rnaseq_map::utils::jobscript::shell_quote;


fn touch(dir: &Path, names: &[&str]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for name in names {
        File::create(dir.join(name))?;
    }
    Ok(())
}

fn config(cwd: &Path, extra: &[&str]) -> Result<RunConfig> {
    let mut argv = vec!["rnaseq-map", "-i", "trimmed", "-o", "out", "-p", "idx"];
    if !extra.contains(&"--submit-cmd") {
        argv.extend_from_slice(&["--submit-cmd", "echo"]);
    }
    argv.extend_from_slice(extra);
    Ok(RunConfig::from_args(Arguments::parse_from(argv), cwd.to_path_buf())?)
}

fn quoted(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}


#[tokio::test]
async fn test_end_to_end_example() -> Result<()> {
    let cwd = tempdir()?;
    let input = cwd.path().join("trimmed");
    let out = cwd.path().join("out");
    touch(&input, &["a_R1_paired.fastq", "a_R2_paired.fastq", "b_trimmed.fastq"])?;

    let config = config(cwd.path(), &[])?;
    let summary = run(&config).await?;

    assert_eq!(summary.task_count, 2);
    assert_eq!(summary.script_path, cwd.path().join("script.autogenerated.rnaseq_map_jobs.sh"));
    // echo stands in for qsub and prints the script path back.
    assert_eq!(summary.submission.as_deref().map(Path::new), Some(summary.script_path.as_path()));
    assert!(out.is_dir());

    let text = fs::read_to_string(&summary.script_path)?;
    assert!(text.contains("#$ -t 1-2\n"));

    let idx = cwd.path().join("idx");
    let unpaired = format!(
        "        1) task_argv=(hisat2 --dta -x {} -U {} -S {}) ;;",
        quoted(&idx),
        quoted(&input.join("b_trimmed.fastq")),
        quoted(&out.join("b_trimmed.sam")),
    );
    let paired = format!(
        "        2) task_argv=(hisat2 --dta -x {} -1 {} -2 {} -S {}) ;;",
        quoted(&idx),
        quoted(&input.join("a_R1_paired.fastq")),
        quoted(&input.join("a_R2_paired.fastq")),
        quoted(&out.join("a_paired.sam")),
    );
    assert!(text.contains(&unpaired), "missing {}", unpaired);
    assert!(text.contains(&paired), "missing {}", paired);
    Ok(())
}

#[tokio::test]
async fn test_rerun_skips_finished_task() -> Result<()> {
    let cwd = tempdir()?;
    let input = cwd.path().join("trimmed");
    touch(&input, &["a_R1_paired.fastq", "a_R2_paired.fastq", "b_trimmed.fastq"])?;

    let config = config(cwd.path(), &["--dry-run", "--aligner", "no-such-aligner-rnaseq-map"])?;
    let summary = run(&config).await?;
    assert_eq!(summary.submission, None);

    // Task 2 (the pair) has already produced its output.
    fs::write(cwd.path().join("out").join("a_paired.sam"), "@HD\n")?;

    let output = Command::new("bash")
        .arg(&summary.script_path)
        .env("SGE_TASK_ID", "2")
        .current_dir(cwd.path())
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Task 2. Output file already exists"));
    assert!(!stdout.contains("Executing command"));
    Ok(())
}

#[tokio::test]
async fn test_script_is_overwritten_each_run() -> Result<()> {
    let cwd = tempdir()?;
    let input = cwd.path().join("trimmed");
    touch(&input, &["b_trimmed.fastq"])?;

    let first = run(&config(cwd.path(), &["--dry-run"])?).await?;
    assert_eq!(first.task_count, 1);

    touch(&input, &["c_trimmed.fastq"])?;
    let second = run(&config(cwd.path(), &["--dry-run"])?).await?;
    assert_eq!(second.task_count, 2);
    assert_eq!(first.script_path, second.script_path);

    let text = fs::read_to_string(&second.script_path)?;
    assert!(text.contains("#$ -t 1-2\n"));
    Ok(())
}

#[tokio::test]
async fn test_slurm_script() -> Result<()> {
    let cwd = tempdir()?;
    touch(&cwd.path().join("trimmed"), &["b_trimmed.fastq"])?;

    let summary = run(&config(cwd.path(), &["--scheduler", "slurm", "--dry-run", "-r", "16"])?).await?;
    let text = fs::read_to_string(&summary.script_path)?;
    assert!(text.contains("#SBATCH --array=1-1\n"));
    assert!(text.contains("#SBATCH --mem=16G\n"));
    assert!(text.contains("SLURM_ARRAY_TASK_ID"));
    Ok(())
}

#[tokio::test]
async fn test_empty_input_fails_before_writing() -> Result<()> {
    let cwd = tempdir()?;

    let config = config(cwd.path(), &[])?;
    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoMappingJobs { .. }));
    assert!(!config.script_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_colliding_outputs_fail_before_writing() -> Result<()> {
    let cwd = tempdir()?;
    touch(
        &cwd.path().join("trimmed"),
        &["s_R1_paired_trimmed.fastq", "s_R2_paired_trimmed.fastq", "s_paired_trimmed.fastq"],
    )?;

    let config = config(cwd.path(), &[])?;
    match run(&config).await.unwrap_err() {
        PipelineError::MalformedFilename { path, reason } => {
            assert_eq!(path, cwd.path().join("out").join("s_paired_trimmed.sam"));
            assert!(reason.contains("task 2 collides with task 1"));
        }
        other => panic!("Expected MalformedFilename, got {:?}", other),
    }
    assert!(!config.script_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_strict_pairing_mismatch() -> Result<()> {
    let cwd = tempdir()?;
    touch(&cwd.path().join("trimmed"), &["a_R1_paired.fastq", "b_R1_paired.fastq", "a_R2_paired.fastq"])?;

    let err = run(&config(cwd.path(), &["--pairing", "strict"])?).await.unwrap_err();
    assert!(matches!(err, PipelineError::PairingMismatch { r1: 2, r2: 1 }));

    let lenient = run(&config(cwd.path(), &["--dry-run"])?).await?;
    assert_eq!(lenient.task_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_submission() -> Result<()> {
    let cwd = tempdir()?;
    touch(&cwd.path().join("trimmed"), &["b_trimmed.fastq"])?;

    let err = run(&config(cwd.path(), &["--submit-cmd", "false"])?).await.unwrap_err();
    assert!(matches!(err, PipelineError::SubmissionFailed { .. }));
    Ok(())
}
