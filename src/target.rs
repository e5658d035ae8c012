use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use regex::Regex;

use crate::error::WatchError;
use crate::logger::{log, LogLevel};

/// The directory to watch and the file name expected to appear in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    directory: PathBuf,
    file_name: String,
}

impl WatchTarget {
    /// Absolute directory the subscription is opened on
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute path of the file being waited for
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

// Both separators are accepted whatever the host OS uses.
fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[/\\]").expect("separator pattern is valid"))
}

/// Splits a raw path argument into a [`WatchTarget`].
///
/// The split happens at the last `/` or `\`. A bare file name is taken
/// relative to the current working directory. The directory is always
/// returned absolute: canonicalized when it exists, otherwise joined onto
/// the working directory so the watch can report a precise failure later.
pub fn resolve(raw_path: &str) -> Result<WatchTarget, WatchError> {
    if raw_path.trim().is_empty() {
        return Err(WatchError::invalid_path(raw_path, "path is empty"));
    }

    let (directory, file_name) = match separator().find_iter(raw_path).last() {
        Some(sep) => (&raw_path[..sep.end()], &raw_path[sep.end()..]),
        None => {
            log(
                LogLevel::Warn,
                "No directory specified, defaulting to the current working directory.",
            );
            (".", raw_path)
        }
    };

    if file_name.is_empty() {
        return Err(WatchError::invalid_path(
            raw_path,
            "path ends with a separator, no file name given",
        ));
    }
    if file_name == "." || file_name == ".." {
        return Err(WatchError::invalid_path(
            raw_path,
            "path must name a file, not a directory reference",
        ));
    }

    let directory = absolute_directory(Path::new(directory))
        .map_err(|_| WatchError::invalid_path(raw_path, "cannot determine working directory"))?;

    Ok(WatchTarget {
        directory,
        file_name: file_name.to_string(),
    })
}

fn absolute_directory(directory: &Path) -> std::io::Result<PathBuf> {
    match fs::canonicalize(directory) {
        Ok(canonical) => Ok(canonical),
        Err(_) if directory.is_absolute() => Ok(directory.to_path_buf()),
        Err(_) => Ok(env::current_dir()?.join(directory)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(resolve(""), Err(WatchError::InvalidPath { .. })));
        assert!(matches!(resolve("   "), Err(WatchError::InvalidPath { .. })));
    }

    #[test]
    fn trailing_separator_is_rejected() {
        let err = resolve("/tmp/").unwrap_err();
        assert!(err.to_string().contains("no file name"));
    }

    #[test]
    fn dot_references_are_rejected() {
        assert!(resolve("/tmp/..").is_err());
        assert!(resolve("/tmp/.").is_err());
    }

    #[test]
    fn splits_at_last_separator() {
        let dir = tempfile::tempdir().unwrap();
        let raw = format!("{}/report.csv", dir.path().display());

        let target = resolve(&raw).unwrap();

        assert_eq!(target.file_name(), "report.csv");
        assert_eq!(target.directory(), fs::canonicalize(dir.path()).unwrap());
        assert!(target.directory().is_absolute());
        assert_eq!(target.path(), target.directory().join("report.csv"));
    }

    #[test]
    fn backslash_separates_too() {
        let dir = tempfile::tempdir().unwrap();
        let raw = format!("{}\\data.bin", dir.path().display());

        let target = resolve(&raw).unwrap();

        assert_eq!(target.file_name(), "data.bin");
        assert!(!target.file_name().contains(['/', '\\']));
    }

    #[test]
    fn bare_name_uses_working_directory() {
        let target = resolve("report.csv").unwrap();

        assert_eq!(target.file_name(), "report.csv");
        assert_eq!(
            target.directory(),
            fs::canonicalize(env::current_dir().unwrap()).unwrap()
        );
    }

    #[test]
    fn missing_directory_is_still_absolute() {
        let target = resolve("no-such-dir-for-isthere/x.txt").unwrap();

        assert!(target.directory().is_absolute());
        assert!(target.directory().ends_with("no-such-dir-for-isthere/"));
        assert_eq!(target.file_name(), "x.txt");
    }
}
