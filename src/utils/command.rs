/// Functions and structs for assembling the aligner command lines

use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, FASTQ_EXT, SAM_EXT};
use crate::utils::discovery::{FilePairing, SampleFile, READ_INDEX_MARKER};


pub mod hisat2 {
    use std::path::Path;
    use crate::config::defs::{
        HISAT2_DTA_FLAG, HISAT2_INDEX_FLAG, HISAT2_MATE1_FLAG, HISAT2_MATE2_FLAG,
        HISAT2_OUTPUT_FLAG, HISAT2_UNPAIRED_FLAG,
    };

    fn lossy(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Flags shared by single-end and paired-end runs.
    pub fn base_args(idx_prefix: &Path) -> Vec<String> {
        vec![
            HISAT2_DTA_FLAG.to_string(),
            HISAT2_INDEX_FLAG.to_string(),
            lossy(idx_prefix),
        ]
    }

    pub fn unpaired_arg_generator(idx_prefix: &Path, reads: &Path, output: &Path) -> Vec<String> {
        let mut args_vec = base_args(idx_prefix);
        args_vec.push(HISAT2_UNPAIRED_FLAG.to_string());
        args_vec.push(lossy(reads));
        args_vec.push(HISAT2_OUTPUT_FLAG.to_string());
        args_vec.push(lossy(output));
        args_vec
    }

    pub fn paired_arg_generator(idx_prefix: &Path, mate1: &Path, mate2: &Path, output: &Path) -> Vec<String> {
        let mut args_vec = base_args(idx_prefix);
        args_vec.push(HISAT2_MATE1_FLAG.to_string());
        args_vec.push(lossy(mate1));
        args_vec.push(HISAT2_MATE2_FLAG.to_string());
        args_vec.push(lossy(mate2));
        args_vec.push(HISAT2_OUTPUT_FLAG.to_string());
        args_vec.push(lossy(output));
        args_vec
    }
}


/// One aligner invocation and the file it is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingJob {
    program: String,
    args: Vec<String>,
    output: PathBuf,
}

impl MappingJob {
    pub fn new(program: &str, args: Vec<String>, output: PathBuf) -> Self {
        MappingJob {
            program: program.to_string(),
            args,
            output,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }
}


fn file_name_of(file: &SampleFile) -> Result<String, PipelineError> {
    file.path()
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::MalformedFilename {
            path: file.path().to_path_buf(),
            reason: "no UTF-8 file name".to_string(),
        })
}

fn fastq_to_sam(name: &str, path: &Path) -> Result<String, PipelineError> {
    name.strip_suffix(FASTQ_EXT)
        .map(|stem| format!("{}{}", stem, SAM_EXT))
        .ok_or_else(|| PipelineError::MalformedFilename {
            path: path.to_path_buf(),
            reason: format!("file name does not end in '{}'", FASTQ_EXT),
        })
}

/// `sampleX_trimmed.fastq` -> `sampleX_trimmed.sam`
pub fn unpaired_output_name(file: &SampleFile) -> Result<String, PipelineError> {
    let name = file_name_of(file)?;
    fastq_to_sam(&name, file.path())
}

/// `sample_R1_001.fastq` -> `sample_001.sam`, named after the first mate.
pub fn paired_output_name(first: &SampleFile) -> Result<String, PipelineError> {
    let name = file_name_of(first)?;
    if first.read_index().is_none() {
        return Err(PipelineError::MalformedFilename {
            path: first.path().to_path_buf(),
            reason: "no _R1_/_R2_ read marker to strip".to_string(),
        });
    }
    let stripped = READ_INDEX_MARKER.replace_all(&name, "_");
    fastq_to_sam(&stripped, first.path())
}


/// Builds the mapping jobs for every discovered file.
/// Unpaired files come first, in discovery order, then the pairs.
///
/// # Arguments
///
/// * `files` - Output of the discovery step.
/// * `aligner` - Aligner executable.
/// * `idx_prefix` - Path and file prefix of the genome index.
/// * `output_dir` - Directory the SAM files are written to.
///
/// # Returns
/// Lazy iterator of MappingJob, one per unpaired file or pair.
pub fn assemble_jobs<'a>(
    files: &'a FilePairing,
    aligner: &'a str,
    idx_prefix: &'a Path,
    output_dir: &'a Path,
) -> impl Iterator<Item = Result<MappingJob, PipelineError>> + 'a {
    let unpaired = files.unpaired.iter().map(move |file| -> Result<MappingJob, PipelineError> {
        let output = output_dir.join(unpaired_output_name(file)?);
        let args = hisat2::unpaired_arg_generator(idx_prefix, file.path(), &output);
        Ok(MappingJob::new(aligner, args, output))
    });

    let paired = files.paired.iter().map(move |(p1, p2)| -> Result<MappingJob, PipelineError> {
        let output = output_dir.join(paired_output_name(p1)?);
        let args = hisat2::paired_arg_generator(idx_prefix, p1.path(), p2.path(), &output);
        Ok(MappingJob::new(aligner, args, output))
    });

    unpaired.chain(paired)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str) -> SampleFile {
        SampleFile::new(PathBuf::from(path))
    }

    fn example_pairing() -> FilePairing {
        FilePairing {
            paired: vec![(sample("a_R1_paired.fastq"), sample("a_R2_paired.fastq"))],
            unpaired: vec![sample("b_trimmed.fastq")],
        }
    }

    #[test]
    fn test_output_names() {
        assert_eq!(
            paired_output_name(&sample("data/sample_R1_001.fastq")).unwrap(),
            "sample_001.sam"
        );
        assert_eq!(
            unpaired_output_name(&sample("data/sampleX_trimmed.fastq")).unwrap(),
            "sampleX_trimmed.sam"
        );
    }

    #[test]
    fn test_malformed_names() {
        assert!(matches!(
            unpaired_output_name(&sample("reads_trimmed.fastq.gz")),
            Err(PipelineError::MalformedFilename { .. })
        ));
        assert!(matches!(
            paired_output_name(&sample("R1_paired.fastq")),
            Err(PipelineError::MalformedFilename { .. })
        ));
    }

    #[test]
    fn test_assemble_example_commands() {
        let pairing = example_pairing();
        let jobs: Vec<MappingJob> = assemble_jobs(&pairing, "hisat2", Path::new("idx"), Path::new("out"))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0].command_line(),
            "hisat2 --dta -x idx -U b_trimmed.fastq -S out/b_trimmed.sam"
        );
        assert_eq!(
            jobs[1].command_line(),
            "hisat2 --dta -x idx -1 a_R1_paired.fastq -2 a_R2_paired.fastq -S out/a_paired.sam"
        );
        assert_eq!(jobs[1].output_path(), Path::new("out/a_paired.sam"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let pairing = example_pairing();
        let first: Vec<_> = assemble_jobs(&pairing, "hisat2", Path::new("idx"), Path::new("out")).collect();
        let second: Vec<_> = assemble_jobs(&pairing, "hisat2", Path::new("idx"), Path::new("out")).collect();
        let first: Vec<MappingJob> = first.into_iter().map(|job| job.unwrap()).collect();
        let second: Vec<MappingJob> = second.into_iter().map(|job| job.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_base_flags() {
        let pairing = example_pairing();
        for job in assemble_jobs(&pairing, "hisat2", Path::new("idx"), Path::new("out")) {
            let job = job.unwrap();
            assert_eq!(&job.args()[..3], &["--dta", "-x", "idx"]);
        }
    }
}
