use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::defs::PipelineError;


/// Resolves a possibly relative path against a base directory.
/// The path does not have to exist.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        let trimmed = path.strip_prefix(".").unwrap_or(path);
        cwd.join(trimmed)
    }
}


#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}


/// Writes text to `path`, replacing any previous file.
/// The text goes to a temporary file in the same directory first, which is then
/// renamed over `path`, so readers never see a partial file.
///
/// # Arguments
///
/// * `path` - Destination file.
/// * `contents` - Full text of the file.
/// * `executable` - Set mode 0755 on unix.
pub fn write_atomically(path: &Path, contents: &str, executable: bool) -> Result<(), PipelineError> {
    let to_err = |source: std::io::Error| PipelineError::ScriptWrite {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(to_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(to_err)?;
    tmp.write_all(contents.as_bytes()).map_err(to_err)?;
    tmp.flush().map_err(to_err)?;

    if executable {
        make_executable(tmp.path()).map_err(to_err)?;
    }

    tmp.persist(path).map_err(|e| to_err(e.error))?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_path(Path::new("./trimmed"), cwd), PathBuf::from("/work/trimmed"));
        assert_eq!(resolve_path(Path::new("mapped"), cwd), PathBuf::from("/work/mapped"));
        assert_eq!(resolve_path(Path::new("/data/idx"), cwd), PathBuf::from("/data/idx"));
    }

    #[test]
    fn test_write_atomically_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.sh");
        fs::write(&path, "old run").unwrap();

        write_atomically(&path, "#!/usr/bin/env bash\necho new\n", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/usr/bin/env bash\necho new\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomically_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scripts").join("jobs.sh");
        write_atomically(&path, "x", false).unwrap();
        assert!(path.exists());
    }
}
