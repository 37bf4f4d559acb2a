use std::fmt;
use std::path::Path;

use super::InstallError;

/// Glob (relative to the distribution directory) identifying an rpm distribution.
pub const RPM_PATTERN: &str = "openafs-*.rpm";

/// File whose presence identifies a legacy binary tree.
pub const LEGACY_MARKER: &str = "root.server/usr/afs/bin/bosserver";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistKind {
    /// Packaged install through rpm
    Rpm,
    /// Legacy ("transarc") binary tree copied into place
    Legacy,
}

impl DistKind {
    pub fn name(&self) -> &'static str {
        match self {
            DistKind::Rpm => "rpm",
            DistKind::Legacy => "legacy",
        }
    }
}

impl fmt::Display for DistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Paths in `dir` matching `pattern`, in glob order.
pub(super) fn glob_in(dir: &Path, pattern: &str) -> Result<Vec<std::path::PathBuf>, InstallError> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    Ok(glob::glob(&full)?.filter_map(Result::ok).collect())
}

/// Decide which kind of distribution `dir` holds.
///
/// Rpm files win over a legacy tree when both are present.
pub fn detect(dir: &Path) -> Result<DistKind, InstallError> {
    if dir.as_os_str().is_empty() {
        return Err(InstallError::DistNotSet);
    }
    if !dir.is_dir() {
        return Err(InstallError::NotADirectory(dir.to_path_buf()));
    }
    if !glob_in(dir, RPM_PATTERN)?.is_empty() {
        return Ok(DistKind::Rpm);
    }
    if dir.join(LEGACY_MARKER).exists() {
        return Ok(DistKind::Legacy);
    }
    Err(InstallError::UnknownDistribution(dir.to_path_buf()))
}
