//! Facts about the running host that end up in package file names.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Release identifier file on Red Hat family systems.
pub const REDHAT_RELEASE: &str = "/etc/redhat-release";

/// Distribution family as encoded in the rpm `dist` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseFamily {
    /// Fedora (`fc`)
    Fedora,
    /// RHEL, CentOS and other enterprise rebuilds (`el`)
    Enterprise,
    /// Pre-RHEL Red Hat Linux (`rhl`)
    RedHatLinux,
}

impl ReleaseFamily {
    /// Classify a release string. Fedora is checked first, then the
    /// enterprise family; "Red Hat Linux Advanced Server" counts as
    /// enterprise, not as old Red Hat Linux.
    pub fn classify(release: &str) -> Option<Self> {
        if release.contains("Fedora") {
            Some(Self::Fedora)
        } else if ["Enterprise", "Advanced", "CentOS"]
            .iter()
            .any(|word| release.contains(word))
        {
            Some(Self::Enterprise)
        } else if release.contains("Red Hat Linux") && !release.contains("Advanced") {
            Some(Self::RedHatLinux)
        } else {
            None
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Fedora => "fc",
            Self::Enterprise => "el",
            Self::RedHatLinux => "rhl",
        }
    }
}

static VERSION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9.]+").expect("valid version pattern"));

/// Major release number: the leading component of the first numeric run
/// before any parenthesized codename.
pub fn release_number(release: &str) -> Option<&str> {
    let version = release.split('(').next().unwrap_or_default();
    let run = VERSION_RUN.find(version)?.as_str();
    let major = run.split('.').next().unwrap_or_default();
    (!major.is_empty()).then_some(major)
}

/// The rpm `dist` tag for a release string, e.g. `.fc20` or `.el6`.
///
/// An unrecognized release yields an empty tag, which callers treat as
/// "no distribution suffix".
pub fn dist_tag(release: &str) -> String {
    match (release_number(release), ReleaseFamily::classify(release)) {
        (Some(number), Some(family)) => format!(".{}{}", family.tag(), number),
        _ => String::new(),
    }
}

/// First line of the release file, or an empty string when it cannot be read.
pub fn read_release(path: &Path) -> String {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| content.lines().next().map(|line| line.trim_end().to_string()))
        .unwrap_or_default()
}

/// The `dist` tag of this host.
pub fn host_dist_tag() -> String {
    dist_tag(&read_release(Path::new(REDHAT_RELEASE)))
}

/// Kernel release in package naming form: hyphens become underscores.
pub fn kernel_tag(kernel_release: &str) -> String {
    kernel_release.replace('-', "_")
}

/// Machine hardware name and kernel release of the running host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uname {
    pub machine: String,
    pub release: String,
}

impl Uname {
    pub fn current() -> nix::Result<Self> {
        let uts = nix::sys::utsname::uname()?;
        Ok(Self {
            machine: uts.machine().to_string_lossy().into_owned(),
            release: uts.release().to_string_lossy().into_owned(),
        })
    }

    pub fn kernel_tag(&self) -> String {
        kernel_tag(&self.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fedora_tag() {
        assert_eq!(dist_tag("Fedora release 20 (Heisenbug)"), ".fc20");
    }

    #[test]
    fn test_centos_tag() {
        assert_eq!(dist_tag("CentOS release 6.5 (Final)"), ".el6");
        assert_eq!(dist_tag("CentOS Linux release 7.0.1406 (Core)"), ".el7");
    }

    #[test]
    fn test_rhel_tag() {
        assert_eq!(
            dist_tag("Red Hat Enterprise Linux Server release 5.11 (Tikanga)"),
            ".el5"
        );
    }

    #[test]
    fn test_advanced_server_is_enterprise() {
        let release = "Red Hat Linux Advanced Server release 2.1AS (Pensacola)";
        assert_eq!(ReleaseFamily::classify(release), Some(ReleaseFamily::Enterprise));
        assert_eq!(dist_tag(release), ".el2");
    }

    #[test]
    fn test_old_red_hat_linux() {
        assert_eq!(dist_tag("Red Hat Linux release 9 (Shrike)"), ".rhl9");
    }

    #[test]
    fn test_unknown_family_is_empty() {
        assert_eq!(dist_tag("openSUSE 13.1 (Bottle)"), "");
        assert_eq!(dist_tag("Debian GNU/Linux 7"), "");
    }

    #[test]
    fn test_missing_number_is_empty() {
        assert_eq!(dist_tag("Fedora release rawhide"), "");
        assert_eq!(dist_tag(""), "");
    }

    #[test]
    fn test_number_ignores_codename() {
        assert_eq!(release_number("Fedora release (21) 20"), None);
        assert_eq!(release_number("Fedora release 20 (Heisenbug 99)"), Some("20"));
    }

    #[test]
    fn test_number_is_first_numeric_run() {
        assert_eq!(release_number("CentOS Linux release 7.1.1503 (Core)"), Some("7"));
        assert_eq!(release_number("Red Hat Enterprise Linux Server release 6.5"), Some("6"));
        assert_eq!(release_number("Scientific Linux 6 r.2"), Some("6"));
        // a lone dot is the first run and has no leading component
        assert_eq!(release_number("Linux v. 6"), None);
    }

    #[test]
    fn test_read_release_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_release(&dir.path().join("redhat-release")), "");
    }

    #[test]
    fn test_read_release_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redhat-release");
        fs::write(&path, "CentOS release 6.5 (Final)  \nsecond line\n").unwrap();
        assert_eq!(read_release(&path), "CentOS release 6.5 (Final)");
    }

    #[test]
    fn test_kernel_tag() {
        assert_eq!(kernel_tag("2.6.32-431.el6.x86_64"), "2.6.32_431.el6.x86_64");
    }

    #[test]
    fn test_uname_current() {
        let uname = Uname::current().unwrap();
        assert!(!uname.machine.is_empty());
        assert!(!uname.kernel_tag().contains('-'));
    }
}
