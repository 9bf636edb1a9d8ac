// src/utils/discovery.rs: Finding paired and unpaired FASTQ files
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::cli::args::PairingPolicy;
use crate::config::defs::{NamingConventions, PipelineError, TRIMMED_TAG};

lazy_static! {
    pub(crate) static ref READ_INDEX_MARKER: Regex = Regex::new(r"_R([12])_").unwrap();
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadIndex {
    R1,
    R2,
}

/// One sequencing-read file found in the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    path: PathBuf,
    read_index: Option<ReadIndex>,
    trimmed: bool,
}

impl SampleFile {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let read_index = READ_INDEX_MARKER
            .captures(&file_name)
            .and_then(|caps| match &caps[1] {
                "1" => Some(ReadIndex::R1),
                "2" => Some(ReadIndex::R2),
                _ => None,
            });
        let trimmed = file_name.contains(TRIMMED_TAG);

        SampleFile { path, read_index, trimmed }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_index(&self) -> Option<ReadIndex> {
        self.read_index
    }

    pub fn is_trimmed(&self) -> bool {
        self.trimmed
    }

    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// File name with the `_R1_`/`_R2_` marker collapsed to `_`.
    /// Two mates of one sample share this key.
    pub fn mate_key(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        READ_INDEX_MARKER.replace_all(&file_name, "_").into_owned()
    }
}

/// Disjoint paired and unpaired groups found in one directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilePairing {
    pub paired: Vec<(SampleFile, SampleFile)>,
    pub unpaired: Vec<SampleFile>,
}

impl FilePairing {
    pub fn is_empty(&self) -> bool {
        self.paired.is_empty() && self.unpaired.is_empty()
    }
}


/// Lists the files in `dir` (not recursive) whose names match a glob pattern.
/// A directory that cannot be read gives no matches.
///
/// # Arguments
///
/// * `dir` - Directory to scan.
/// * `pattern` - Glob pattern applied to the bare file name.
///
/// # Returns
/// Matching paths, sorted by their full path string.
pub fn list_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let pattern = Pattern::new(pattern)
        .map_err(|e| PipelineError::InvalidConfig(format!("Bad file pattern {}: {}", pattern, e)))?;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {:?} ({}); treating it as empty", dir, e);
            return Ok(Vec::new());
        }
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| pattern.matches_with(name, MATCH_OPTIONS))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    matches.sort_by_key(|path| path.to_string_lossy().into_owned());
    Ok(matches)
}


/// Zips sorted R1 and R2 lists positionally.
pub fn pair_sorted(
    r1: Vec<PathBuf>,
    r2: Vec<PathBuf>,
    policy: PairingPolicy,
) -> Result<Vec<(SampleFile, SampleFile)>, PipelineError> {
    if r1.len() != r2.len() {
        match policy {
            PairingPolicy::Strict => {
                return Err(PipelineError::PairingMismatch { r1: r1.len(), r2: r2.len() });
            }
            PairingPolicy::Lenient => {
                warn!(
                    "{} R1 files vs {} R2 files; pairing positionally, {} file(s) dropped",
                    r1.len(), r2.len(), r1.len().abs_diff(r2.len())
                );
            }
        }
    }

    let pairs: Vec<(SampleFile, SampleFile)> = r1
        .into_iter()
        .zip(r2)
        .map(|(p1, p2)| (SampleFile::new(p1), SampleFile::new(p2)))
        .collect();

    for (p1, p2) in mismatched_mates(&pairs) {
        warn!(
            "Paired {:?} with {:?}, but their names do not match ({} vs {})",
            p1.path(), p2.path(), p1.mate_key(), p2.mate_key()
        );
    }

    Ok(pairs)
}


/// Pairs whose files do not look like mates of the same sample.
pub fn mismatched_mates(pairs: &[(SampleFile, SampleFile)]) -> Vec<&(SampleFile, SampleFile)> {
    pairs
        .iter()
        .filter(|(p1, p2)| p1.mate_key() != p2.mate_key())
        .collect()
}


pub fn find_paired(
    dir: &Path,
    conventions: &NamingConventions,
    policy: PairingPolicy,
) -> Result<Vec<(SampleFile, SampleFile)>, PipelineError> {
    let r1 = list_matching(dir, &conventions.r1_paired)?;
    let r2 = list_matching(dir, &conventions.r2_paired)?;
    pair_sorted(r1, r2, policy)
}


/// Finds the unpaired FASTQ files, leaving out anything already in a pair.
pub fn find_unpaired(
    dir: &Path,
    conventions: &NamingConventions,
    already_paired: &[(SampleFile, SampleFile)],
) -> Result<Vec<SampleFile>, PipelineError> {
    let paired: HashSet<String> = already_paired
        .iter()
        .flat_map(|(p1, p2)| [p1.path_string(), p2.path_string()])
        .collect();

    Ok(list_matching(dir, &conventions.unpaired)?
        .into_iter()
        .filter(|path| !paired.contains(path.to_string_lossy().as_ref()))
        .map(SampleFile::new)
        .collect())
}


/// Searches a data directory for the files of every sample.
///
/// # Arguments
///
/// * `dir` - Input directory.
/// * `conventions` - Patterns for R1, R2 and unpaired files.
/// * `policy` - How unequal R1/R2 counts are handled.
///
/// # Returns
/// FilePairing with disjoint paired and unpaired groups.
pub fn search_files(
    dir: &Path,
    conventions: &NamingConventions,
    policy: PairingPolicy,
) -> Result<FilePairing, PipelineError> {
    let paired = find_paired(dir, conventions, policy)?;
    let unpaired = find_unpaired(dir, conventions, &paired)?;
    Ok(FilePairing { paired, unpaired })
}
