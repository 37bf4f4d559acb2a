//! Kerberos principals and keytabs for the test cell.

use anyhow::{Context, Result, bail};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fs;
use std::path::Path;

use crate::common::Executor;
use crate::common::command::quote;
use crate::ui::prelude::*;

pub const DEFAULT_ENCTYPE: &str = "aes256-cts-hmac-sha1-96";

/// Creates principals and writes their keys to keytab files.
pub trait Keytabs {
    /// Key for the `afs/<cell>@<REALM>` service principal.
    ///
    /// With `akimpersonate` the key is made up locally and never reaches a
    /// KDC.
    fn create_service_keytab(
        &self,
        keytab: &Path,
        cell: &str,
        realm: &str,
        enctype: &str,
        akimpersonate: bool,
    ) -> Result<()>;

    fn create_user_keytab(&self, keytab: &Path, principal: &str, realm: &str) -> Result<()>;

    /// Echo admin commands before they run.
    fn set_verbose(&mut self, verbose: bool);
}

/// `<principal>@<REALM>` unless the principal already names a realm.
pub fn qualify(principal: &str, realm: &str) -> String {
    if principal.contains('@') {
        principal.to_string()
    } else {
        format!("{}@{}", principal, realm)
    }
}

/// Keytabs made with `kadmin.local` on the KDC host, or with `ktutil` alone
/// when impersonating.
pub struct KadminKeytabs {
    exec: Box<dyn Executor>,
    verbose: bool,
}

impl KadminKeytabs {
    pub fn new(exec: Box<dyn Executor>) -> Self {
        Self {
            exec,
            verbose: false,
        }
    }

    fn require_tool(tool: &str) -> Result<()> {
        if which::which(tool).is_err() {
            bail!("{} not found; genkey must run where the kerberos admin tools are installed", tool);
        }
        Ok(())
    }

    fn kadmin(&self, query: &str) -> Result<String> {
        let cmdline = format!("kadmin.local -q {}", quote(query));
        if self.verbose {
            emit(Level::Info, "keytab.kadmin", &cmdline, None);
        }
        self.exec
            .sudo(&cmdline)
            .with_context(|| format!("kadmin.local query failed: {}", query))
    }

    fn add_principal(&self, principal: &str) -> Result<()> {
        // kadmin.local reports an existing principal and carries on
        self.kadmin(&format!("addprinc -randkey {}", principal))?;
        Ok(())
    }

    fn ktadd(&self, keytab: &Path, principal: &str, enctype: Option<&str>) -> Result<()> {
        let mut query = format!("ktadd -k {}", keytab.display());
        if let Some(enctype) = enctype {
            query.push_str(&format!(" -e {}:normal", enctype));
        }
        query.push(' ');
        query.push_str(principal);
        self.kadmin(&query)?;
        Ok(())
    }

    /// Write a key derived from a random password. The password only ever
    /// travels on ktutil's stdin.
    fn ktutil_entry(&self, keytab: &Path, principal: &str, enctype: &str) -> Result<()> {
        let password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let script = format!(
            "add_entry -password -p {} -k 1 -e {}\n{}\nwkt {}\n",
            principal,
            enctype,
            password,
            keytab.display()
        );
        if self.verbose {
            emit(
                Level::Info,
                "keytab.ktutil",
                &format!("ktutil: add_entry {} ({}), wkt {}", principal, enctype, keytab.display()),
                None,
            );
        }
        self.exec.run_with_input("ktutil", &script).context("ktutil failed")?;
        Ok(())
    }
}

fn ensure_parent(keytab: &Path) -> Result<()> {
    if let Some(parent) = keytab.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating keytab directory {}", parent.display()))?;
    }
    Ok(())
}

impl Keytabs for KadminKeytabs {
    fn create_service_keytab(
        &self,
        keytab: &Path,
        cell: &str,
        realm: &str,
        enctype: &str,
        akimpersonate: bool,
    ) -> Result<()> {
        ensure_parent(keytab)?;
        let principal = format!("afs/{}@{}", cell, realm);
        if akimpersonate {
            Self::require_tool("ktutil")?;
            return self.ktutil_entry(keytab, &principal, enctype);
        }
        Self::require_tool("kadmin.local")?;
        self.add_principal(&principal)?;
        self.ktadd(keytab, &principal, Some(enctype))
    }

    fn create_user_keytab(&self, keytab: &Path, principal: &str, realm: &str) -> Result<()> {
        ensure_parent(keytab)?;
        Self::require_tool("kadmin.local")?;
        let principal = qualify(principal, realm);
        self.add_principal(&principal)?;
        self.ktadd(keytab, &principal, None)
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }
}

#[cfg(test)]
pub mod testing {
    //! Records keytab requests instead of talking to a KDC.

    use super::Keytabs;
    use anyhow::{Result, bail};
    use std::cell::{Cell, RefCell};
    use std::path::Path;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    pub struct FakeKeytabs {
        requests: Rc<RefCell<Vec<String>>>,
        verbose: Rc<Cell<bool>>,
        fail: bool,
    }

    impl FakeKeytabs {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }

        pub fn verbose(&self) -> bool {
            self.verbose.get()
        }

        fn record(&self, request: String) -> Result<()> {
            self.requests.borrow_mut().push(request);
            if self.fail {
                bail!("kadmin.local not found");
            }
            Ok(())
        }
    }

    impl Keytabs for FakeKeytabs {
        fn create_service_keytab(
            &self,
            keytab: &Path,
            cell: &str,
            realm: &str,
            enctype: &str,
            akimpersonate: bool,
        ) -> Result<()> {
            self.record(format!(
                "service {} {} {} {} {}",
                keytab.display(),
                cell,
                realm,
                enctype,
                akimpersonate
            ))
        }

        fn create_user_keytab(&self, keytab: &Path, principal: &str, realm: &str) -> Result<()> {
            self.record(format!("user {} {} {}", keytab.display(), principal, realm))
        }

        fn set_verbose(&mut self, verbose: bool) {
            self.verbose.set(verbose);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("robotest", "EXAMPLE.COM"), "robotest@EXAMPLE.COM");
        assert_eq!(qualify("robotest/admin", "EXAMPLE.COM"), "robotest/admin@EXAMPLE.COM");
        assert_eq!(qualify("alice@OTHER.ORG", "EXAMPLE.COM"), "alice@OTHER.ORG");
    }

    #[test]
    fn test_kadmin_queries() {
        use crate::common::command::testing::RecordingExecutor;

        let exec = RecordingExecutor::new();
        let keytabs = KadminKeytabs::new(Box::new(exec.clone()));
        let principal = "afs/example.com@EXAMPLE.COM";
        keytabs.add_principal(principal).unwrap();
        keytabs
            .ktadd(Path::new("site/afs.keytab"), principal, Some(DEFAULT_ENCTYPE))
            .unwrap();
        keytabs.ktadd(Path::new("site/user.keytab"), "robotest@EXAMPLE.COM", None).unwrap();
        assert_eq!(
            exec.calls(),
            vec![
                "sudo -n kadmin.local -q 'addprinc -randkey afs/example.com@EXAMPLE.COM'",
                "sudo -n kadmin.local -q 'ktadd -k site/afs.keytab -e aes256-cts-hmac-sha1-96:normal afs/example.com@EXAMPLE.COM'",
                "sudo -n kadmin.local -q 'ktadd -k site/user.keytab robotest@EXAMPLE.COM'",
            ]
        );
    }

    #[test]
    fn test_ktutil_password_stays_off_the_command_line() {
        use crate::common::command::testing::RecordingExecutor;

        let exec = RecordingExecutor::new();
        let keytabs = KadminKeytabs::new(Box::new(exec.clone()));
        keytabs
            .ktutil_entry(Path::new("site/afs.keytab"), "afs/example.com@EXAMPLE.COM", DEFAULT_ENCTYPE)
            .unwrap();

        assert_eq!(exec.calls(), vec!["ktutil"]);
        let inputs = exec.inputs();
        let lines: Vec<&str> = inputs[0].lines().collect();
        assert_eq!(
            lines[0],
            "add_entry -password -p afs/example.com@EXAMPLE.COM -k 1 -e aes256-cts-hmac-sha1-96"
        );
        assert_eq!(lines[1].len(), 32);
        assert!(lines[1].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(lines[2], "wkt site/afs.keytab");
        assert!(!exec.calls()[0].contains(lines[1]));
    }

    #[test]
    fn test_ensure_parent_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let keytab = dir.path().join("site").join("afs.keytab");
        ensure_parent(&keytab).unwrap();
        assert!(dir.path().join("site").is_dir());
        ensure_parent(Path::new("afs.keytab")).unwrap();
    }
}
