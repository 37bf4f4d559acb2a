//! Package file names for an rpm distribution directory.
//!
//! The names follow the OpenAFS packaging convention:
//!
//! ```text
//! openafs[-<component>]-<version>-<release><dist>.<arch>.rpm
//! kmod-openafs-<version>-<release>.<kernel_tag>.rpm
//! ```

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::InstallError;
use super::detect::{RPM_PATTERN, glob_in};
use crate::common::host::{self, Uname};
use crate::ui;

/// Everything needed to name the package files of one OpenAFS build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmInfo {
    /// rpm `dist` tag of the host, e.g. `.el6`; may be empty
    pub dist_tag: String,
    pub arch: String,
    pub kernel_tag: String,
    pub version: String,
    pub release: String,
}

impl RpmInfo {
    /// Resolve host facts and the version/release found in `dist`.
    pub fn resolve(dist: &Path) -> Result<Self, InstallError> {
        let uname = Uname::current()?;
        Ok(Self {
            dist_tag: host::host_dist_tag(),
            arch: uname.machine.clone(),
            kernel_tag: uname.kernel_tag(),
            version: afs_version(dist)?,
            release: afs_release(dist)?,
        })
    }

    /// `<dist>/<name>-<version>-<release><dist_tag>.<arch>.rpm`
    pub fn package_file(&self, dist: &Path, name: &str) -> PathBuf {
        dist.join(format!(
            "{}-{}-{}{}.{}.rpm",
            name, self.version, self.release, self.dist_tag, self.arch
        ))
    }

    /// The kernel module package is tagged with the kernel, not the distribution.
    pub fn kmod_package_file(&self, dist: &Path) -> PathBuf {
        dist.join(format!(
            "kmod-openafs-{}-{}.{}.rpm",
            self.version, self.release, self.kernel_tag
        ))
    }
}

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^openafs-(\d+\.\d+\.\d+)-.*\.rpm$").expect("valid version pattern"));

static RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^openafs-\d+\.\d+\.\d+-([^.]+).*\.rpm$").expect("valid release pattern"));

fn capture<'a>(re: &Regex, file_name: &'a str) -> Option<&'a str> {
    re.captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Version (`X.Y.Z`) embedded in a base `openafs-` package file name.
pub fn parse_version(file_name: &str) -> Option<&str> {
    capture(&VERSION, file_name)
}

/// Release embedded in a base `openafs-` package file name: everything up
/// to the next dot after the version.
pub fn parse_release(file_name: &str) -> Option<&str> {
    capture(&RELEASE, file_name)
}

/// First value `parse` finds among the rpm files in `dist`.
///
/// Files are visited in glob order, so a directory holding several builds
/// yields whichever one sorts first.
fn first_match(dist: &Path, parse: fn(&str) -> Option<&str>) -> Result<Option<String>, InstallError> {
    for rpm in glob_in(dist, RPM_PATTERN)? {
        let Some(name) = rpm.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(found) = parse(&name) {
            return Ok(Some(found.to_string()));
        }
    }
    Ok(None)
}

pub fn afs_version(dist: &Path) -> Result<String, InstallError> {
    ui::debug("rpm.version", &format!("Looking for afs version in {}", dist.display()));
    let version = first_match(dist, parse_version)?
        .ok_or_else(|| InstallError::VersionNotFound(dist.to_path_buf()))?;
    ui::debug("rpm.version", &format!("Found rpm version: {}", version));
    Ok(version)
}

pub fn afs_release(dist: &Path) -> Result<String, InstallError> {
    ui::debug("rpm.release", &format!("Looking for afs rel in {}", dist.display()));
    let release = first_match(dist, parse_release)?
        .ok_or_else(|| InstallError::ReleaseNotFound(dist.to_path_buf()))?;
    ui::debug("rpm.release", &format!("Found rpm rel: {}", release));
    Ok(release)
}
