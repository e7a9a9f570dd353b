// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! INI-style persistence for user-entered option strings.
//!
//! Front ends keep one section per notional settings tab; keys are field
//! keys and values are the user's raw entry strings. Lists serialize as
//! one `|`-separated value; a literal `|` inside a member is escaped to
//! ASCII RS (0x1E) on save and restored on load.
//!

use crate::Error;
use std::{
    collections::BTreeMap,
    fs,
    io::Write,
};
use tracing::warn;

/// List separator in serialized values.
const LIST_SEP: char = '|';
/// Stand-in for a literal list separator inside a member.
const LIST_SEP_ESC: char = '\u{1E}';

/// A loaded or to-be-saved settings file: section → key → value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Settings {
    /// Empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a single value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Set a single value.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
    }

    /// Get a list value, un-escaping embedded separators.
    pub fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        let raw = self.get(section, key)?;
        if raw.is_empty() {
            return Some(Vec::new());
        }
        Some(
            raw.split(LIST_SEP)
                .map(|m| m.replace(LIST_SEP_ESC, &LIST_SEP.to_string()))
                .collect(),
        )
    }

    /// Set a list value, escaping embedded separators.
    pub fn set_list(&mut self, section: &str, key: &str, members: &[String]) {
        let cooked: Vec<String> = members
            .iter()
            .map(|m| m.replace(LIST_SEP, &LIST_SEP_ESC.to_string()))
            .collect();
        self.set(section, key, &cooked.join(&LIST_SEP.to_string()));
    }

    /// Load settings from `path`. Unparseable lines are skipped w/ a
    /// warning; a missing file is an [`Error::IoOpen`].
    pub fn load(path: &str) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|source| Error::IoOpen {
            path: path.into(),
            source,
        })?;

        let mut result = Settings::new();
        let mut section = String::new();
        for (no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = name.trim().to_owned();
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) if !section.is_empty() => {
                    result.set(&section, key.trim(), value.trim());
                }
                _ => {
                    warn!("Skipping malformed settings line #{}: '{line}'", no + 1);
                }
            }
        }
        Ok(result)
    }

    /// Write settings to `path`, one `[section]` block per section.
    pub fn save(&self, path: &str) -> Result<(), Error> {
        let mut out = fs::File::create(path).map_err(|source| Error::IoOpen {
            path: path.into(),
            source,
        })?;
        for (section, entries) in &self.sections {
            writeln!(out, "[{section}]").map_err(|source| Error::IoOpen {
                path: path.into(),
                source,
            })?;
            for (key, value) in entries {
                writeln!(out, "{key} = {value}").map_err(|source| Error::IoOpen {
                    path: path.into(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_round_trip_with_escaping() {
        let mut s = Settings::new();
        let members = vec![
            "plain".to_owned(),
            "with|pipe".to_owned(),
            "".to_owned(),
        ];
        s.set_list("input", "files", &members);

        // the stored value must not contain a raw pipe from a member
        let raw = s.get("input", "files").unwrap();
        assert_eq!(raw.matches(LIST_SEP).count(), 2);

        assert_eq!(s.get_list("input", "files").unwrap(), members);
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = std::env::temp_dir().join("survey_gis_settings_test.s2g");
        let path = path.to_str().unwrap().to_owned();

        let mut s = Settings::new();
        s.set("parser", "schema", "survey.schema");
        s.set("reproj", "proj_in", "utm32n");
        s.set_list(
            "input",
            "files",
            &["a.dat".to_owned(), "b|c.dat".to_owned()],
        );
        s.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, s);
        assert_eq!(
            loaded.get_list("input", "files").unwrap(),
            vec!["a.dat".to_owned(), "b|c.dat".to_owned()]
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let path = std::env::temp_dir().join("survey_gis_settings_bad.s2g");
        let path = path.to_str().unwrap().to_owned();
        std::fs::write(&path, "orphan = 1\n[ok]\nkey = v\ngarbage\n").unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.get("ok", "key"), Some("v"));
        assert_eq!(s.get("", "orphan"), None);
        let _ = std::fs::remove_file(&path);
    }
}
