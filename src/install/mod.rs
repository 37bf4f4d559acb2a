//! OpenAFS installation keywords.
//!
//! A distribution directory is inspected once by [`detect`] and the matching
//! [`Installer`] is kept for the rest of the session:
//!
//! - [`RpmInstall`]: packaged install through the rpm database
//! - [`LegacyInstall`]: copies a legacy ("transarc") binary tree into place
//!
//! Both variants install and remove the client and server roles
//! independently.

mod detect;
mod legacy;
mod rpm;
mod rpminfo;

pub use detect::{DistKind, detect};
pub use legacy::LegacyInstall;
pub use rpm::RpmInstall;
pub use rpminfo::RpmInfo;

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::common::{CommandError, Executor};
use crate::ui::prelude::*;

/// An independently installable part of OpenAFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("DIST is not set")]
    DistNotSet,

    #[error("DIST is not directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Could not determine distribution type from files in DIST: {0}")]
    UnknownDistribution(PathBuf),

    #[error("rpm version not found in DIST: {0}")]
    VersionNotFound(PathBuf),

    #[error("rpm rel not found in DIST: {0}")]
    ReleaseNotFound(PathBuf),

    #[error("OpenAFS {0} is not installed")]
    NotInstalled(Role),

    #[error("OpenAFS {0} is installed")]
    Installed(Role),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to query host: {0}")]
    Host(#[from] nix::Error),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// The operations every installation variant provides.
pub trait Installer {
    fn kind(&self) -> DistKind;

    /// The distribution directory this installer reads from.
    fn dist(&self) -> &Path;

    fn client_is_installed(&self) -> Result<bool, InstallError>;
    fn install_client(&self) -> Result<(), InstallError>;
    fn remove_client(&self) -> Result<(), InstallError>;

    fn server_is_installed(&self) -> Result<bool, InstallError>;
    fn install_server(&self) -> Result<(), InstallError>;
    fn remove_server(&self) -> Result<(), InstallError>;

    fn is_installed(&self, role: Role) -> Result<bool, InstallError> {
        match role {
            Role::Client => self.client_is_installed(),
            Role::Server => self.server_is_installed(),
        }
    }

    fn install(&self, role: Role) -> Result<(), InstallError> {
        match role {
            Role::Client => self.install_client(),
            Role::Server => self.install_server(),
        }
    }

    fn remove(&self, role: Role) -> Result<(), InstallError> {
        match role {
            Role::Client => self.remove_client(),
            Role::Server => self.remove_server(),
        }
    }
}

/// An installation session bound to one distribution directory.
///
/// The variant is chosen once in [`Installation::setup`] and never changes.
pub struct Installation {
    installer: Box<dyn Installer>,
}

impl Installation {
    /// Detect the kind of distribution in `dist` and prepare the matching
    /// installer.
    pub fn setup(dist: &Path, exec: Box<dyn Executor>) -> Result<Self, InstallError> {
        emit(
            Level::Debug,
            "install.setup",
            &format!("installation setup: DIST={}", dist.display()),
            None,
        );
        let installer: Box<dyn Installer> = match detect(dist)? {
            DistKind::Rpm => {
                emit(Level::Debug, "install.detected", "Detected rpm distribution.", None);
                Box::new(RpmInstall::new(dist, exec)?)
            }
            DistKind::Legacy => {
                emit(Level::Debug, "install.detected", "Detected binary distribution.", None);
                Box::new(LegacyInstall::new(dist, exec))
            }
        };
        Ok(Self { installer })
    }

    #[cfg(test)]
    pub fn from_installer(installer: Box<dyn Installer>) -> Self {
        Self { installer }
    }

    pub fn kind(&self) -> DistKind {
        self.installer.kind()
    }

    pub fn dist(&self) -> &Path {
        self.installer.dist()
    }

    /// Fail unless `role` is installed.
    pub fn require_installed(&self, role: Role) -> Result<(), InstallError> {
        if self.installer.is_installed(role)? {
            Ok(())
        } else {
            Err(InstallError::NotInstalled(role))
        }
    }

    /// Fail if `role` is installed.
    pub fn require_not_installed(&self, role: Role) -> Result<(), InstallError> {
        if self.installer.is_installed(role)? {
            Err(InstallError::Installed(role))
        } else {
            Ok(())
        }
    }

    pub fn install(&self, role: Role) -> Result<(), InstallError> {
        emit(
            Level::Info,
            "install.role",
            &format!(
                "Installing OpenAFS {} ({}) from {}",
                role,
                self.kind(),
                self.dist().display()
            ),
            None,
        );
        self.installer.install(role)
    }

    pub fn remove(&self, role: Role) -> Result<(), InstallError> {
        emit(
            Level::Info,
            "install.remove",
            &format!(
                "Removing OpenAFS {} ({}) from {}",
                role,
                self.kind(),
                self.dist().display()
            ),
            None,
        );
        self.installer.remove(role)
    }
}
