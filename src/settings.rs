//! Program settings, read from `settings.toml` in the user's config directory.
//!
//! Settings apply to every run. Options given on the command line take precedence.
use crate::get_gridplan_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for gridplan.
#
# Every setting is commented out, so the value shown is the default. Uncomment a line to change it.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_gridplan_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// The default program log level (overridden by the GRIDPLAN_LOG_LEVEL environment variable)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Whether to write the sizing model's inputs to a CSV file
    #[serde(default)]
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Read the settings file.
    ///
    /// Default values are used if there is no settings file. An invalid file is an error.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// Switch on the flags which were given on the command line
    pub fn with_overrides(self, overwrite: bool, debug_model: bool) -> Self {
        Self {
            overwrite: self.overwrite || overwrite,
            debug_model: self.debug_model || debug_model,
            ..self
        }
    }

    /// The settings as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Could not convert settings to TOML")
    }

    /// The contents of a settings file with every field commented out, set to its default
    pub fn default_file_contents() -> String {
        let defaults = Settings::default()
            .to_toml()
            .expect("Default settings are always valid TOML");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in defaults.lines().filter(|line| !line.is_empty()) {
            let field = line.split_once('=').map_or(line, |(field, _)| field).trim();
            let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");

            out.push('\n');
            for doc_line in docs.lines() {
                out.push_str(&format!("# # {}\n", doc_line.trim()));
            }
            out.push_str(&format!("# {}\n", line.trim()));
        }

        out
    }
}
