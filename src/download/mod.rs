//! Fetch OpenAFS release packages from the project's release index pages.

mod links;

pub use links::release_from_files;
use links::{extract_links, filter_rpm_links};

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::common::create_spinner;
use crate::common::host::{Uname, kernel_tag};
use crate::common::paths::DEFAULT_RPM_DIR;
use crate::common::progress::finish_spinner;
use crate::ui::prelude::*;

pub const DEFAULT_SITE: &str = "http://openafs.org";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Unexpected platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Error retrieving urls from {url}: {source}")]
    Index {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error downloading file: url={url}, error={source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("No files found for version {version}, platform {platform}")]
    NoFiles { version: String, platform: Platform },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to query host: {0}")]
    Host(#[from] nix::Error),
}

/// Platforms the release site publishes rpm indexes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Rhel5,
    Rhel6,
    OpenSuse123,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Rhel5, Platform::Rhel6, Platform::OpenSuse123];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Rhel5 => "rhel5",
            Platform::Rhel6 => "rhel6",
            Platform::OpenSuse123 => "openSUSE_12.3",
        }
    }

    /// Red Hat platforms ship kernel module packages.
    pub fn has_kmods(&self) -> bool {
        matches!(self, Platform::Rhel5 | Platform::Rhel6)
    }
}

impl FromStr for Platform {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DownloadError::UnsupportedPlatform(s.to_string()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub site: String,
    pub arch: String,
    /// Kernel release as reported by the host; hyphens are allowed.
    pub kernel: String,
    pub directory: PathBuf,
    pub dry_run: bool,
}

impl DownloadOptions {
    /// Options for the running host, downloading into `directory`.
    pub fn for_host(directory: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        let uname = Uname::current()?;
        Ok(Self {
            site: DEFAULT_SITE.to_string(),
            arch: uname.machine,
            kernel: uname.release,
            directory: directory.into(),
            dry_run: false,
        })
    }

    /// Download into `directory`, ignoring a trailing `/`.
    pub fn with_directory(mut self, directory: &str) -> Self {
        let trimmed = directory.trim_end_matches('/');
        self.directory = PathBuf::from(if trimmed.is_empty() { directory } else { trimmed });
        self
    }

    pub fn kernel_tag(&self) -> String {
        kernel_tag(&self.kernel)
    }

    fn site(&self) -> &str {
        self.site.trim_end_matches('/')
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            site: DEFAULT_SITE.to_string(),
            arch: String::new(),
            kernel: String::new(),
            directory: PathBuf::from(DEFAULT_RPM_DIR),
            dry_run: false,
        }
    }
}

/// `<site>/pages/release/<version>/index-<platform>.html`
pub fn index_url(site: &str, version: &str, platform: Platform) -> String {
    [
        site.trim_end_matches('/'),
        "pages",
        "release",
        version,
        &format!("index-{}.html", platform),
    ]
    .join("/")
}

fn client() -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(format!("afs-robotest/{}", env!("CARGO_PKG_VERSION")))
        .build()
}

fn fetch_index(client: &reqwest::blocking::Client, url: &str) -> Result<String, DownloadError> {
    let wrap = |source| DownloadError::Index {
        url: url.to_string(),
        source,
    };
    let response = client.get(url).send().map_err(wrap)?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    response.text().map_err(wrap)
}

fn fetch_file(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> Result<(), DownloadError> {
    let wrap = |source| DownloadError::Fetch {
        url: url.to_string(),
        source,
    };
    let mut response = client.get(url).send().map_err(wrap)?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    let io_err = |source| DownloadError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = File::create(dest).map_err(io_err)?;
    response.copy_to(&mut file).map_err(wrap)?;
    Ok(())
}

/// Package URLs for `version` on `platform`.
///
/// Links are returned without their leading `/`, relative to the site
/// unless the index points elsewhere. Finding none is an error.
pub fn retrieve_rpm_urls(
    version: &str,
    platform: Platform,
    options: &DownloadOptions,
) -> Result<Vec<String>, DownloadError> {
    let index = index_url(options.site(), version, platform);
    let message = "Getting list of URLs ...";
    let spinner = create_spinner(message.to_string());

    let html = match client()
        .map_err(|source| DownloadError::Index {
            url: index.clone(),
            source,
        })
        .and_then(|c| fetch_index(&c, &index))
    {
        Ok(html) => html,
        Err(e) => {
            finish_spinner(spinner, "download.index", message, Status::Error);
            return Err(e);
        }
    };

    let kernel = options.kernel_tag();
    let selected = filter_rpm_links(&extract_links(&html), &options.arch, &kernel);

    if selected.urls.is_empty() {
        finish_spinner(spinner, "download.index", message, Status::Error);
        return Err(DownloadError::NoFiles {
            version: version.to_string(),
            platform,
        });
    }

    finish_spinner(spinner, "download.index", message, Status::Ok);
    if platform.has_kmods() && !selected.kmod_found {
        emit(
            Level::Warn,
            "download.kmod_missing",
            &format!("Warning: kmod not found for kernel version {}", kernel),
            None,
        );
    }
    Ok(selected.urls)
}

/// Absolute URL for a link taken from the index page.
pub fn absolute_url(site: &str, url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("{}/{}", site.trim_end_matches('/'), url.trim_start_matches('/'))
    }
}

/// Download every URL into the options' directory.
///
/// Returns the paths written; a dry run writes nothing and returns an empty
/// list. The first failure aborts the remaining downloads.
pub fn download_files(urls: &[String], options: &DownloadOptions) -> Result<Vec<PathBuf>, DownloadError> {
    let directory = options.directory.as_path();
    if !urls.is_empty() && !options.dry_run && !directory.is_dir() {
        fs::create_dir_all(directory).map_err(|source| DownloadError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
    }
    emit(
        Level::Info,
        "download.directory",
        &format!("Downloading to {}", directory.display()),
        None,
    );

    let client = if options.dry_run {
        None
    } else {
        Some(client().map_err(|source| DownloadError::Fetch {
            url: options.site.clone(),
            source,
        })?)
    };

    let mut files = Vec::new();
    for url in urls {
        let url = absolute_url(options.site(), url);
        let basename = url.rsplit('/').next().unwrap_or_default().to_string();
        let filename = directory.join(&basename);
        let message = format!("Downloading {} ...", basename);

        let Some(client) = &client else {
            status_line("download.file", &message, Status::Skipped);
            continue;
        };

        let spinner = create_spinner(message.clone());
        match fetch_file(client, &url, &filename) {
            Ok(()) => {
                finish_spinner(spinner, "download.file", &message, Status::Ok);
                files.push(filename);
            }
            Err(e) => {
                finish_spinner(spinner, "download.file", &message, Status::Error);
                return Err(e);
            }
        }
    }
    Ok(files)
}

/// Fetch the packages of `version` for `platform`.
///
/// The platform is checked before anything touches the network.
pub fn download(version: &str, platform: &str, options: &DownloadOptions) -> Result<Vec<PathBuf>, DownloadError> {
    let platform: Platform = platform.parse()?;
    let urls = retrieve_rpm_urls(version, platform, options)?;
    download_files(&urls, options)
}


#[cfg(test)]
mod tests {
    use super::testing::{INDEX_PATH, RPM_PATH, index_page, options, release_site, serve};
    use super::*;

    const BASE: &str = "openafs-1.6.10-2.el6.x86_64.rpm";
    const CLIENT: &str = "openafs-client-1.6.10-2.el6.x86_64.rpm";
    const KMOD: &str = "kmod-openafs-1.6.10-2.2.6.32_431.el6.x86_64.rpm";

    #[test]
    fn test_download_from_release_index() {
        let site = release_site(&[BASE, CLIENT, KMOD, "kmod-openafs-1.6.10-2.2.6.32_358.el6.x86_64.rpm"]);
        let dir = tempfile::tempdir().unwrap();
        let rpms = dir.path().join("rpms");

        let files = download("1.6.10", "rhel6", &options(&site, &rpms)).unwrap();
        assert_eq!(files, vec![rpms.join(BASE), rpms.join(CLIENT), rpms.join(KMOD)]);
        assert_eq!(fs::read_to_string(rpms.join(CLIENT)).unwrap(), format!("contents of {}", CLIENT));
        assert!(!rpms.join("kmod-openafs-1.6.10-2.2.6.32_358.el6.x86_64.rpm").exists());
    }

    #[test]
    fn test_missing_kmod_still_downloads() {
        let site = release_site(&[BASE, CLIENT]);
        let dir = tempfile::tempdir().unwrap();
        let urls = retrieve_rpm_urls("1.6.10", Platform::Rhel6, &options(&site, dir.path())).unwrap();
        assert_eq!(
            urls,
            vec![
                format!("{}/{}", RPM_PATH.trim_start_matches('/'), BASE),
                format!("{}/{}", RPM_PATH.trim_start_matches('/'), CLIENT),
            ]
        );
    }

    #[test]
    fn test_index_without_packages_is_an_error() {
        let site = serve(vec![(INDEX_PATH.to_string(), index_page(&["openafs-1.6.10-2.el6.src.rpm.txt"]))]);
        let dir = tempfile::tempdir().unwrap();
        let rpms = dir.path().join("rpms");

        let err = download("1.6.10", "rhel6", &options(&site, &rpms)).unwrap_err();
        assert!(matches!(err, DownloadError::NoFiles { .. }));
        assert_eq!(err.to_string(), "No files found for version 1.6.10, platform rhel6");
        assert!(!rpms.exists());
    }

    #[test]
    fn test_missing_index_reports_status() {
        let site = serve(Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let err = download("1.6.10", "rhel6", &options(&site, dir.path())).unwrap_err();
        match err {
            DownloadError::Status { url, status } => {
                assert!(url.ends_with(INDEX_PATH));
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_package_stops_download() {
        // the index links a file the server does not have
        let site = serve(vec![(INDEX_PATH.to_string(), index_page(&[BASE]))]);
        let dir = tempfile::tempdir().unwrap();
        let err = download("1.6.10", "rhel6", &options(&site, dir.path())).unwrap_err();
        match err {
            DownloadError::Status { url, status } => {
                assert!(url.ends_with(BASE));
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_platforms() {
        assert_eq!("rhel5".parse::<Platform>().unwrap(), Platform::Rhel5);
        assert_eq!("rhel6".parse::<Platform>().unwrap(), Platform::Rhel6);
        assert_eq!("openSUSE_12.3".parse::<Platform>().unwrap(), Platform::OpenSuse123);
        assert!(!Platform::OpenSuse123.has_kmods());
    }

    #[test]
    fn test_unknown_platform() {
        for bad in ["rhel7", "RHEL6", "opensuse_12.3", ""] {
            let err = bad.parse::<Platform>().unwrap_err();
            assert!(matches!(err, DownloadError::UnsupportedPlatform(_)));
        }
    }

    #[test]
    fn test_download_rejects_platform_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let options = DownloadOptions {
            // nothing listens here; reaching the network would give a different error
            site: "http://127.0.0.1:9".to_string(),
            directory: dir.path().join("rpms"),
            ..DownloadOptions::default()
        };
        let err = download("1.6.10", "fedora20", &options).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected platform: fedora20");
        assert!(!dir.path().join("rpms").exists());
    }

    #[test]
    fn test_index_url() {
        assert_eq!(
            index_url("http://openafs.org/", "1.6.10", Platform::Rhel6),
            "http://openafs.org/pages/release/1.6.10/index-rhel6.html"
        );
        assert_eq!(
            index_url(DEFAULT_SITE, "1.6.5", Platform::OpenSuse123),
            "http://openafs.org/pages/release/1.6.5/index-openSUSE_12.3.html"
        );
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("http://openafs.org", "dl/openafs/1.6.10/rhel6/x86_64/openafs-1.6.10-1.el6.x86_64.rpm"),
            "http://openafs.org/dl/openafs/1.6.10/rhel6/x86_64/openafs-1.6.10-1.el6.x86_64.rpm"
        );
        assert_eq!(absolute_url("http://a", "https://b/c.rpm"), "https://b/c.rpm");
    }

    #[test]
    fn test_dry_run_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let options = DownloadOptions {
            directory: dir.path().join("rpms"),
            dry_run: true,
            ..DownloadOptions::default()
        };
        let urls = vec!["dl/openafs/1.6.10/rhel6/x86_64/openafs-1.6.10-1.el6.x86_64.rpm".to_string()];
        let files = download_files(&urls, &options).unwrap();
        assert!(files.is_empty());
        assert!(!options.directory.exists());
    }

    #[test]
    fn test_directory_trailing_slash() {
        let options = DownloadOptions::default().with_directory("site/rpms/");
        assert_eq!(options.directory, PathBuf::from("site/rpms"));
        assert_eq!(DownloadOptions::default().with_directory("/").directory, PathBuf::from("/"));
    }

    #[test]
    fn test_kernel_tag_option() {
        let options = DownloadOptions {
            kernel: "2.6.32-431.el6.x86_64".to_string(),
            ..DownloadOptions::default()
        };
        assert_eq!(options.kernel_tag(), "2.6.32_431.el6.x86_64");
    }
}
