use std::path::{Path, PathBuf};

use super::{DistKind, InstallError, Installer, RpmInfo};
use crate::common::command::quote;
use crate::common::{CommandError, Executor};
use crate::ui::prelude::*;

const CLIENT_PACKAGE: &str = "openafs-client";
const SERVER_PACKAGE: &str = "openafs-server";
const KMOD_PACKAGE: &str = "kmod-openafs";

/// Query matching every installed OpenAFS package, shared ones included.
const ALL_PACKAGES_QUERY: &str = "rpm -qa '*openafs*'";

/// Installs OpenAFS from the rpm files in a distribution directory.
pub struct RpmInstall {
    dist: PathBuf,
    info: RpmInfo,
    exec: Box<dyn Executor>,
}

impl RpmInstall {
    pub fn new(dist: &Path, exec: Box<dyn Executor>) -> Result<Self, InstallError> {
        if which::which("rpm").is_err() {
            emit(
                Level::Warn,
                "rpm.missing",
                "rpm command not found; package operations will fail",
                None,
            );
        }
        let info = RpmInfo::resolve(dist)?;
        Ok(Self::with_info(dist, info, exec))
    }

    pub fn with_info(dist: &Path, info: RpmInfo, exec: Box<dyn Executor>) -> Self {
        Self {
            dist: dist.to_path_buf(),
            info,
            exec,
        }
    }

    fn package_file(&self, name: &str) -> PathBuf {
        self.info.package_file(&self.dist, name)
    }

    fn kmod_package_file(&self) -> PathBuf {
        self.info.kmod_package_file(&self.dist)
    }

    /// Install the files in a single rpm transaction.
    fn rpm_install(&self, files: &[PathBuf]) -> Result<(), InstallError> {
        let args: Vec<String> = files
            .iter()
            .map(|f| quote(&f.to_string_lossy()))
            .collect();
        self.exec
            .sudo(&format!("rpm -v --install --replacepkgs {}", args.join(" ")))?;
        Ok(())
    }

    fn rpm_remove<S: AsRef<str>>(&self, packages: &[S]) -> Result<(), InstallError> {
        let args: Vec<String> = packages.iter().map(|p| quote(p.as_ref())).collect();
        self.exec.sudo(&format!("rpm -v -e {}", args.join(" ")))?;
        Ok(())
    }

    /// `rpm -q` exits nonzero for a package that is not installed.
    fn package_installed(&self, package: &str) -> Result<bool, InstallError> {
        match self.exec.run(&format!("rpm -q {}", package)) {
            Ok(_) => Ok(true),
            Err(CommandError::Failed { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove whatever OpenAFS packages are left, if any.
    fn remove_openafs_packages(&self) -> Result<(), InstallError> {
        let output = self.exec.run(ALL_PACKAGES_QUERY)?;
        let packages: Vec<&str> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if packages.is_empty() {
            return Ok(());
        }
        emit(
            Level::Debug,
            "rpm.sweep",
            &format!("Removing remaining packages: {}", packages.join(" ")),
            None,
        );
        self.rpm_remove(&packages)
    }
}

impl Installer for RpmInstall {
    fn kind(&self) -> DistKind {
        DistKind::Rpm
    }

    fn dist(&self) -> &Path {
        &self.dist
    }

    fn client_is_installed(&self) -> Result<bool, InstallError> {
        self.package_installed(CLIENT_PACKAGE)
    }

    fn install_client(&self) -> Result<(), InstallError> {
        emit(Level::Debug, "rpm.install", "Installing OpenAFS client packages", None);
        self.rpm_install(&[
            self.package_file("openafs"),
            self.package_file("openafs-krb5"),
            self.package_file(CLIENT_PACKAGE),
            self.kmod_package_file(),
        ])
    }

    fn remove_client(&self) -> Result<(), InstallError> {
        self.rpm_remove(&[CLIENT_PACKAGE, KMOD_PACKAGE])?;
        // the shared packages go only once the server is gone too
        if !self.server_is_installed()? {
            self.remove_openafs_packages()?;
        }
        Ok(())
    }

    fn server_is_installed(&self) -> Result<bool, InstallError> {
        self.package_installed(SERVER_PACKAGE)
    }

    fn install_server(&self) -> Result<(), InstallError> {
        emit(Level::Debug, "rpm.install", "Installing OpenAFS server packages", None);
        self.rpm_install(&[
            self.package_file("openafs"),
            self.package_file("openafs-krb5"),
            self.package_file(SERVER_PACKAGE),
        ])
    }

    fn remove_server(&self) -> Result<(), InstallError> {
        self.rpm_remove(&[SERVER_PACKAGE])?;
        if !self.client_is_installed()? {
            self.remove_openafs_packages()?;
        }
        Ok(())
    }
}
