use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch harness root plus distribution directories for one test.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    /// Harness root passed as `--root`
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("robotest")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root().join("settings.py")
    }

    /// A legacy binary tree with the bosserver marker.
    pub fn legacy_dist(&self) -> Result<PathBuf> {
        let dist = self.path().join("legacy");
        let bin = dist.join("root.server/usr/afs/bin");
        fs::create_dir_all(&bin)?;
        fs::write(bin.join("bosserver"), "")?;
        fs::create_dir_all(dist.join("root.client/usr/vice/etc"))?;
        Ok(dist)
    }

    /// A directory of empty package files.
    pub fn rpm_dist(&self, files: &[&str]) -> Result<PathBuf> {
        let dist = self.path().join("rpms");
        fs::create_dir_all(&dist)?;
        for file in files {
            fs::write(dist.join(file), "")?;
        }
        Ok(dist)
    }

    pub fn empty_dist(&self) -> Result<PathBuf> {
        let dist = self.path().join("empty");
        fs::create_dir_all(&dist)?;
        Ok(dist)
    }

    pub fn write_script(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
