// src/utils/jobscript.rs: Job array script generation
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::cli::args::Scheduler;
use crate::config::defs::{PipelineError, HISAT2_OUTPUT_FLAG};
use crate::utils::command::MappingJob;

/// Body run by every array task. Filled in by `render_job_script`.
const JOB_SCRIPT_TEMPLATE: &str = r#"#!/usr/bin/env bash
{{HEADER}}

# If modules are needed, source the modules environment (do not delete the next line):
# . /etc/profile.d/modules.sh

# Parallel mapping jobs, generated by rnaseq-map.
# Each array task runs the command registered under its task id,
# unless the command's output file already exists.

set -u

task_command() {
    case "$1" in
{{TASK_CASES}}
        *) return 1 ;;
    esac
}

timestamp() {
    date '+%Y-%m-%d %H:%M:%S'
}

task_id="${{{TASK_ID_VAR}}:-}"
if [[ -z "$task_id" ]]; then
    echo "Task id variable {{TASK_ID_VAR}} is not set" >&2
    exit 2
fi

if ! task_command "$task_id"; then
    echo "Task ${task_id}. No command registered for this task id" >&2
    exit 2
fi

output_file=""
for ((i = 0; i + 1 < ${#task_argv[@]}; i++)); do
    if [[ "${task_argv[i]}" == "{{OUTPUT_FLAG}}" ]]; then
        output_file="${task_argv[i + 1]}"
        break
    fi
done

if [[ -n "$output_file" && -e "$output_file" ]]; then
    echo "Task ${task_id}. Output file already exists: ${output_file}"
    exit 0
fi

echo "Task ${task_id}. Executing command @ $(timestamp): ${task_argv[*]}"
"${task_argv[@]}"
status=$?

if [[ $status -ne 0 ]]; then
    echo "Task ${task_id}. Command failed with exit status ${status} @ $(timestamp)"
    exit "$status"
fi

echo "Task ${task_id}. Finished execution @ $(timestamp)"
"#;


/// 1-based scheduler task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Explicit mapping from task id to the job it runs.
/// Ids are assigned 1..=N in the order the jobs were assembled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTable {
    tasks: BTreeMap<TaskId, MappingJob>,
}

impl TaskTable {
    /// Numbers the jobs and checks that no two of them write the same output file.
    pub fn try_from_jobs<I>(jobs: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = Result<MappingJob, PipelineError>>,
    {
        let mut tasks = BTreeMap::new();
        let mut outputs: HashMap<PathBuf, TaskId> = HashMap::new();
        for (i, job) in jobs.into_iter().enumerate() {
            let id = TaskId(i + 1);
            let job = job?;
            if let Some(owner) = outputs.insert(job.output_path().to_path_buf(), id) {
                return Err(PipelineError::MalformedFilename {
                    path: job.output_path().to_path_buf(),
                    reason: format!("output of task {} collides with task {}", id, owner),
                });
            }
            tasks.insert(id, job);
        }
        Ok(TaskTable { tasks })
    }

    pub fn get(&self, id: TaskId) -> Option<&MappingJob> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &MappingJob)> {
        self.tasks.iter().map(|(id, job)| (*id, job))
    }
}

/// Numbers jobs without the output collision check done by `try_from_jobs`.
impl FromIterator<MappingJob> for TaskTable {
    fn from_iter<I: IntoIterator<Item = MappingJob>>(iter: I) -> Self {
        TaskTable {
            tasks: iter
                .into_iter()
                .enumerate()
                .map(|(i, job)| (TaskId(i + 1), job))
                .collect(),
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct JobScriptSettings {
    pub scheduler: Scheduler,
    pub job_name: String,
    pub ram_gb: u32,
    pub shell: String,
}


/// A rendered job array script. Never modified after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScript {
    text: String,
    task_count: usize,
}

impl GeneratedScript {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }
}


/// Quotes a token for bash. Tokens made only of safe characters are left bare.
pub fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=+,@%".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

fn task_case_line(id: TaskId, job: &MappingJob) -> String {
    let argv: Vec<String> = job.argv().iter().map(|token| shell_quote(token)).collect();
    format!("        {}) task_argv=({}) ;;", id, argv.join(" "))
}


/// Renders the job array script for a task table.
///
/// # Arguments
///
/// * `table` - Task id to job mapping; must not be empty.
/// * `settings` - Scheduler, job name, RAM per task and shell.
///
/// # Returns
/// GeneratedScript, a standalone bash script declaring an array of `table.len()` tasks.
pub fn render_job_script(table: &TaskTable, settings: &JobScriptSettings) -> Result<GeneratedScript, PipelineError> {
    if table.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "a job array script needs at least one task".to_string(),
        ));
    }

    let header = settings
        .scheduler
        .header_directives(settings, table.len())
        .iter()
        .map(|directive| directive.render())
        .collect::<Vec<_>>()
        .join("\n");

    let cases = table
        .iter()
        .map(|(id, job)| task_case_line(id, job))
        .collect::<Vec<_>>()
        .join("\n");

    let text = JOB_SCRIPT_TEMPLATE
        .replace("{{HEADER}}", &header)
        .replace("{{TASK_ID_VAR}}", settings.scheduler.task_id_var())
        .replace("{{OUTPUT_FLAG}}", HISAT2_OUTPUT_FLAG)
        .replace("{{TASK_CASES}}", &cases);

    Ok(GeneratedScript {
        text,
        task_count: table.len(),
    })
}
