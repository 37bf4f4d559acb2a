//! Built-in settings and their defaults.

use std::fmt;

/// How text assigned to a setting is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Int,
    String,
    /// A filesystem path; stored as a string.
    Path,
    /// One of a fixed list of words; stored as a string.
    Enum,
}

impl SettingKind {
    pub fn name(&self) -> &'static str {
        match self {
            SettingKind::Bool => "bool",
            SettingKind::Int => "int",
            SettingKind::String => "string",
            SettingKind::Path => "path",
            SettingKind::Enum => "enum",
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One row of the settings table.
#[derive(Debug, Clone, Copy)]
pub struct SettingDef {
    pub name: &'static str,
    pub kind: SettingKind,
    /// Text assigned on load and on `reset`; `None` leaves the setting empty.
    pub default: Option<&'static str>,
    pub description: &'static str,
    /// Suggested values for [`SettingKind::Enum`] settings.
    pub choices: &'static [&'static str],
}

impl SettingDef {
    const fn new(
        name: &'static str,
        kind: SettingKind,
        default: Option<&'static str>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            default,
            description,
            choices: &[],
        }
    }

    const fn choice(
        name: &'static str,
        default: &'static str,
        description: &'static str,
        choices: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind: SettingKind::Enum,
            default: Some(default),
            description,
            choices,
        }
    }
}

use SettingKind::{Bool, Int, Path, String};

pub const SETTINGS: &[SettingDef] = &[
    SettingDef::new("AFS_CELL", String, None, "AFS cell name"),
    SettingDef::new("AFS_ADMIN", String, Some("robotest/admin"), "AFS admin principal"),
    SettingDef::new("AFS_USER", String, Some("robotest"), "AFS test user principal"),
    SettingDef::new("AFS_AKIMPERSONATE", Bool, Some("false"), "Use aklog -akimpersonate to bypass the KDC"),
    SettingDef::choice(
        "AFS_DIST",
        "transarc",
        "OpenAFS distribution style",
        &["rhel6", "suse", "transarc"],
    ),
    SettingDef::new("AFS_DIST_DIR", Path, None, "Location of the binary distribution to install"),
    SettingDef::new("AFS_CSDB_DIST", Bool, Some("false"), "Install CellServDB from the distribution"),
    SettingDef::new("AFS_DB_SERVERS", Int, Some("1"), "Number of database servers"),
    SettingDef::new("AFS_FILE_SERVERS", Int, Some("1"), "Number of file servers"),
    SettingDef::new("AFS_PARTITIONS", Int, Some("1"), "Number of fileserver partitions"),
    SettingDef::new("KRB_REALM", String, None, "Kerberos realm name"),
    SettingDef::new("KRB_VERBOSE", Bool, Some("false"), "Show kerberos admin commands"),
    SettingDef::new("KRB_AFS_KEYTAB", Path, Some("./site/afs.keytab"), "AFS service keytab"),
    SettingDef::new("KRB_USER_KEYTAB", Path, Some("./site/user.keytab"), "Test user keytab"),
    SettingDef::new("KRB_ADMIN_KEYTAB", Path, Some("./site/admin.keytab"), "Admin user keytab"),
    SettingDef::choice(
        "KRB_AFS_ENCTYPE",
        "aes256-cts-hmac-sha1-96",
        "AFS service key encryption type",
        &[
            "aes256-cts-hmac-sha1-96",
            "aes128-cts-hmac-sha1-96",
            "des3-cbc-sha1",
            "des-cbc-crc",
        ],
    ),
    SettingDef::new("RPM_AFSVERSION", String, None, "OpenAFS rpm version, e.g. 1.6.10"),
    SettingDef::new("RPM_AFSRELEASE", String, None, "OpenAFS rpm release number"),
    SettingDef::new("RPM_PACKAGE_DIR", Path, Some("./site/rpms"), "Location of downloaded rpm files"),
    SettingDef::new("DO_TEARDOWN", Bool, Some("true"), "Remove the installation when tests finish"),
];

pub fn lookup(name: &str) -> Option<&'static SettingDef> {
    SETTINGS.iter().find(|def| def.name == name)
}
