//! Link extraction and filtering for release index pages.

use regex::Regex;
use std::sync::LazyLock;

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("valid anchor pattern"));

/// The `href` attribute itself, not one that merely ends in `href`.
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid href pattern")
});

static BASE_RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^openafs-\d+\.\d+\.\d+-(\d+)\.").expect("valid release pattern"));

/// `href` values of every `<a>` tag, in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    ANCHOR
        .captures_iter(html)
        .filter_map(|tag| {
            let attrs = tag.get(1)?.as_str();
            let caps = HREF.captures(attrs)?;
            let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
            Some(unescape(value.as_str()))
        })
        .collect()
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Package links selected for one architecture and kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpmLinks {
    pub urls: Vec<String>,
    /// Whether a kernel module matching the kernel was among them.
    pub kmod_found: bool,
}

/// Keep the package links for `arch`.
///
/// A link qualifies when it ends in `.rpm` and, with any leading `/`
/// removed, has exactly six path segments with the architecture in the
/// fifth. OpenAFS packages always qualify; kernel module packages only when
/// they are built for `kernel_tag`.
pub fn filter_rpm_links(links: &[String], arch: &str, kernel_tag: &str) -> RpmLinks {
    let kmod_suffix = format!("{}.rpm", kernel_tag);
    let mut selected = RpmLinks::default();

    for link in links {
        if !link.ends_with(".rpm") {
            continue;
        }
        let url = link.trim_start_matches('/');
        let parts: Vec<&str> = url.split('/').collect();
        if parts.len() != 6 || parts[4] != arch {
            continue;
        }
        let file = parts[5];
        if file.starts_with("openafs-") {
            selected.urls.push(url.to_string());
        } else if file.starts_with("kmod-openafs-") && file.ends_with(&kmod_suffix) {
            selected.kmod_found = true;
            selected.urls.push(url.to_string());
        }
    }
    selected
}

/// Release number of the last downloaded base package, e.g. `2` for
/// `openafs-1.6.10-2.el6.x86_64.rpm`.
pub fn release_from_files<S: AsRef<str>>(file_names: &[S]) -> Option<String> {
    file_names
        .iter()
        .filter_map(|name| {
            BASE_RELEASE
                .captures(name.as_ref())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .last()
}
