use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::file;
use super::table::{SETTINGS, SettingDef, SettingKind};
use super::SettingsError;
use crate::common::paths;
use crate::ui::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    fn empty(kind: SettingKind) -> Self {
        match kind {
            SettingKind::Bool => SettingValue::Bool(false),
            SettingKind::Int => SettingValue::Int(0),
            _ => SettingValue::Str(String::new()),
        }
    }

    /// False, zero and the empty string.
    pub fn is_unset(&self) -> bool {
        match self {
            SettingValue::Bool(b) => !b,
            SettingValue::Int(n) => *n == 0,
            SettingValue::Str(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(true) => f.write_str("True"),
            SettingValue::Bool(false) => f.write_str("False"),
            SettingValue::Int(n) => write!(f, "{}", n),
            SettingValue::Str(s) => f.write_str(s),
        }
    }
}

/// A named value together with the rules for assigning it.
#[derive(Debug, Clone)]
pub struct Setting {
    name: String,
    kind: SettingKind,
    value: SettingValue,
    default: Option<&'static str>,
}

impl Setting {
    fn from_def(def: &SettingDef) -> Self {
        let mut setting = Self {
            name: def.name.to_string(),
            kind: def.kind,
            value: SettingValue::empty(def.kind),
            default: def.default,
        };
        setting.reset();
        setting
    }

    /// A setting outside the table; its kind follows the value.
    fn from_value(name: &str, value: SettingValue) -> Self {
        let kind = match value {
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Str(_) => SettingKind::String,
        };
        Self {
            name: name.to_string(),
            kind,
            value,
            default: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    /// Assign from text according to the setting's kind.
    ///
    /// Invalid text leaves the current value in place.
    pub fn assign(&mut self, text: &str) -> Result<(), SettingsError> {
        self.value = match self.kind {
            SettingKind::Bool => match text.to_lowercase().as_str() {
                "1" | "yes" | "true" => SettingValue::Bool(true),
                "0" | "no" | "false" => SettingValue::Bool(false),
                _ => {
                    return Err(SettingsError::InvalidBool {
                        name: self.name.clone(),
                        value: text.to_string(),
                    });
                }
            },
            SettingKind::Int => {
                let n = text.trim().parse().map_err(|_| SettingsError::InvalidInt {
                    name: self.name.clone(),
                    value: text.to_string(),
                })?;
                SettingValue::Int(n)
            }
            SettingKind::String | SettingKind::Path | SettingKind::Enum => {
                SettingValue::Str(text.to_string())
            }
        };
        Ok(())
    }

    /// Back to the default; settings without one keep their value.
    pub fn reset(&mut self) {
        if let Some(default) = self.default
            && let Err(e) = self.assign(default)
        {
            debug("settings.default", &e.to_string());
        }
    }
}

/// All settings of a harness root, keyed by upper-case name.
#[derive(Debug, Clone)]
pub struct Settings {
    root: PathBuf,
    entries: BTreeMap<String, Setting>,
}

impl Settings {
    /// Table defaults only; nothing is read from disk.
    pub fn defaults(root: &Path) -> Self {
        Self::from_table(root, SETTINGS)
    }

    pub fn from_table(root: &Path, table: &[SettingDef]) -> Self {
        let entries = table
            .iter()
            .map(|def| (def.name.to_string(), Setting::from_def(def)))
            .collect();
        Self {
            root: root.to_path_buf(),
            entries,
        }
    }

    /// Defaults overlaid with the previously saved file, if there is one.
    ///
    /// Lines of the file that cannot be read are skipped with a warning.
    pub fn load(root: &Path) -> Result<Self, SettingsError> {
        let mut settings = Self::defaults(root);
        let path = settings.path();
        match fs::read_to_string(&path) {
            Ok(contents) => settings.overlay(file::parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug("settings.load", &format!("No settings file at {}", path.display()));
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        }
        Ok(settings)
    }

    /// Known names are assigned through their kind; unknown names are kept as is.
    fn overlay(&mut self, lines: Vec<Result<(String, SettingValue), SettingsError>>) {
        for line in lines {
            let (name, value) = match line {
                Ok(entry) => entry,
                Err(e) => {
                    emit(Level::Warn, "settings.load", &format!("Ignoring {}", e), None);
                    continue;
                }
            };
            let name = name.to_uppercase();
            match self.entries.get_mut(&name) {
                Some(setting) => {
                    if let Err(e) = setting.assign(&value.to_string()) {
                        emit(Level::Warn, "settings.load", &format!("Ignoring saved value: {}", e), None);
                    }
                }
                None => {
                    let setting = Setting::from_value(&name, value);
                    self.entries.insert(name, setting);
                }
            }
        }
    }

    pub fn path(&self) -> PathBuf {
        paths::settings_file(&self.root)
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.entries.get(&name.to_uppercase()).map(Setting::value)
    }

    /// The value as text, or `None` when missing or unset.
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name)
            .filter(|value| !value.is_unset())
            .map(ToString::to_string)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_unset())
    }

    /// Assign `value` to `name` and save.
    ///
    /// Names outside the table become string settings.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        let name = valid_name(name)?;
        match self.entries.get_mut(&name) {
            Some(setting) => setting.assign(value)?,
            None => {
                let setting = Setting::from_value(&name, SettingValue::Str(value.to_string()));
                self.entries.insert(name, setting);
            }
        }
        self.save()
    }

    /// Remove `name` and save. Returns whether it existed.
    pub fn unset(&mut self, name: &str) -> Result<bool, SettingsError> {
        let removed = self.entries.remove(&name.to_uppercase()).is_some();
        self.save()?;
        Ok(removed)
    }

    pub fn reset(&mut self) -> Result<(), SettingsError> {
        for setting in self.entries.values_mut() {
            setting.reset();
        }
        self.save()
    }

    /// Write every setting, sorted by name.
    pub fn save(&self) -> Result<(), SettingsError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SettingsError::Io { path, source }
        };
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;
        let path = self.path();
        let contents = file::render(self.entries.iter().map(|(name, s)| (name.as_str(), s.value())));
        fs::write(&path, contents).map_err(io_err(&path))?;
        debug("settings.save", &format!("Saved {}", path.display()));
        Ok(())
    }

    /// `(name, value)` rows for display, sorted by name.
    /// Every setting name, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<(String, String)> {
        self.entries
            .values()
            .map(|s| {
                let value = match s.value() {
                    SettingValue::Str(v) if v.is_empty() => "(empty)".to_string(),
                    other => other.to_string(),
                };
                (s.name().to_string(), value)
            })
            .collect()
    }
}

fn valid_name(name: &str) -> Result<String, SettingsError> {
    let upper = name.to_uppercase();
    let mut chars = upper.chars();
    let ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(upper)
    } else {
        Err(SettingsError::InvalidName(name.to_string()))
    }
}
