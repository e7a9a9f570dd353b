// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Configuration parameters affecting the behaviour of this library.
//!

use dotenvy::var;
use std::sync::OnceLock;

/// Process-level defaults, read once from the environment.
#[derive(Debug)]
pub struct Config {
    decimal_point: char,
    decimal_group: Option<char>,
    proj_data: Option<String>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();
/// This library configuration Singleton.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

impl Default for Config {
    fn default() -> Self {
        let decimal_point = var("SURVEY_DECIMAL_POINT")
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or('.');
        let decimal_group = var("SURVEY_DECIMAL_GROUP")
            .ok()
            .and_then(|s| s.chars().next());
        let proj_data = var("SURVEY_PROJ_DATA").ok().filter(|s| !s.is_empty());

        Self {
            decimal_point,
            decimal_group,
            proj_data,
        }
    }
}

impl Config {
    /// Decimal point character assumed for numeric input data unless the
    /// run options override it.
    pub fn decimal_point(&self) -> char {
        self.decimal_point
    }

    /// Digit grouping (thousands) character assumed for numeric input
    /// data, if any.
    pub fn decimal_group(&self) -> Option<char> {
        self.decimal_group
    }

    /// Optional override for the PROJ resource directory.
    pub fn proj_data(&self) -> Option<&str> {
        self.proj_data.as_deref()
    }
}
