use std::path::{Path, PathBuf};

use super::{DistKind, InstallError, Installer};
use crate::common::Executor;
use crate::common::command::quote;

/// Client configuration directory, relative to the install root.
const CLIENT_ETC: &str = "usr/vice/etc";
/// Client tools directory, relative to the install root.
const CLIENT_TOOLS: &str = "usr/afsws";
/// Server binaries directory, relative to the install root.
const SERVER_BIN: &str = "usr/afs/bin";

/// Subtrees of the distribution copied into the client tools directory.
const CLIENT_TOOL_TREES: &[&str] = &["bin", "etc", "include", "lib", "man"];

/// Installs a legacy binary tree by copying it into the fixed locations.
///
/// Nothing is rolled back when a copy fails part way through.
pub struct LegacyInstall {
    dist: PathBuf,
    root: PathBuf,
    exec: Box<dyn Executor>,
}

impl LegacyInstall {
    pub fn new(dist: &Path, exec: Box<dyn Executor>) -> Self {
        Self::with_root(dist, Path::new("/"), exec)
    }

    /// Install under `root` instead of `/`.
    pub fn with_root(dist: &Path, root: &Path, exec: Box<dyn Executor>) -> Self {
        Self {
            dist: dist.to_path_buf(),
            root: root.to_path_buf(),
            exec,
        }
    }

    fn target(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn arg(path: &Path) -> String {
        quote(&path.to_string_lossy())
    }

    fn mkdir(&self, path: &Path) -> Result<(), InstallError> {
        self.exec.sudo(&format!("mkdir -p {}", Self::arg(path)))?;
        Ok(())
    }

    /// Recursive copy preserving mode, ownership and timestamps.
    fn copy(&self, from: &Path, into: &Path) -> Result<(), InstallError> {
        self.exec
            .sudo(&format!("cp -r -p {} {}", Self::arg(from), Self::arg(into)))?;
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<(), InstallError> {
        self.exec.sudo(&format!("rm -rf {}", Self::arg(path)))?;
        Ok(())
    }
}

impl Installer for LegacyInstall {
    fn kind(&self) -> DistKind {
        DistKind::Legacy
    }

    fn dist(&self) -> &Path {
        &self.dist
    }

    fn client_is_installed(&self) -> Result<bool, InstallError> {
        Ok(self.target(CLIENT_ETC).is_dir() && self.target(CLIENT_TOOLS).is_dir())
    }

    fn install_client(&self) -> Result<(), InstallError> {
        let etc = self.target(CLIENT_ETC);
        self.mkdir(&etc)?;
        self.copy(
            &self.dist.join("root.client").join(CLIENT_ETC),
            &self.target("usr/vice"),
        )?;

        let tools = self.target(CLIENT_TOOLS);
        self.mkdir(&tools)?;
        for tree in CLIENT_TOOL_TREES {
            self.copy(&self.dist.join(tree), &tools)?;
        }
        Ok(())
    }

    fn remove_client(&self) -> Result<(), InstallError> {
        self.remove_tree(&self.target(CLIENT_ETC))?;
        self.remove_tree(&self.target(CLIENT_TOOLS))
    }

    fn server_is_installed(&self) -> Result<bool, InstallError> {
        Ok(self.target(SERVER_BIN).is_dir())
    }

    fn install_server(&self) -> Result<(), InstallError> {
        self.mkdir(&self.target("usr/afs"))?;
        self.copy(
            &self.dist.join("root.server").join(SERVER_BIN),
            &self.target("usr/afs"),
        )
    }

    fn remove_server(&self) -> Result<(), InstallError> {
        self.remove_tree(&self.target(SERVER_BIN))
    }
}
