//! Pid marker files.
//!
//! The marker lives at `<dir>/<process name>.pid` and holds the OS process id
//! as plain decimal text. External tooling uses it to find and signal the
//! process.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct PidFile {
    dir: PathBuf,
}

impl PidFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic marker path for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.pid"))
    }

    /// Writes the current process id, creating the directory if needed.
    pub fn write(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.path_for(name);
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, std::process::id().to_string())?;
        debug!(pid_file = %path.display(), "Pid marker written");
        Ok(path)
    }

    /// Deletes the marker. A missing file is not an error.
    pub fn remove(&self, name: &str) -> io::Result<()> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(pid_file = %path.display(), "Pid marker removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Reads a marker back. Used by tooling and tests.
    pub fn read(&self, name: &str) -> io::Result<u32> {
        let content = fs::read_to_string(self.path_for(name))?;
        content
            .trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path());

        let path = pid_file.write("gate3").unwrap();
        assert_eq!(path, dir.path().join("gate3.pid"));
        assert_eq!(pid_file.read("gate3").unwrap(), std::process::id());

        pid_file.remove("gate3").unwrap();
        assert!(!path.exists());

        // Removing twice is fine
        pid_file.remove("gate3").unwrap();
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("run").join("pids");
        let pid_file = PidFile::new(&nested);

        pid_file.write("gate").unwrap();
        assert!(nested.join("gate.pid").exists());
    }

    #[test]
    fn test_write_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let pid_file = PidFile::new(&blocker);
        assert!(pid_file.write("gate").is_err());
    }
}
