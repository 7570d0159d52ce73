//! Loader and report settings, optionally read from a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::processor::DEFAULT_AGE_CATEGORY;
use crate::data::schema::{default_columns, ColumnSpec};
use crate::data::sniff::DEFAULT_DELIMITERS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Settings for parsing and normalizing a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Column specs in resolution order.
    pub columns: Vec<ColumnSpec>,
    /// Delimiters considered by the sniffer, in tie-break order.
    pub delimiters: Vec<char>,
    /// Leading lines inspected when sniffing.
    pub sniff_lines: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            delimiters: DEFAULT_DELIMITERS.iter().map(|&b| b as char).collect(),
            sniff_lines: 50,
        }
    }
}

impl LoaderConfig {
    /// Single-byte delimiters usable by the CSV reader.
    pub fn delimiter_bytes(&self) -> Vec<u8> {
        self.delimiters
            .iter()
            .filter(|c| c.is_ascii())
            .map(|&c| c as u8)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of locations kept in the ranking.
    pub top_n: usize,
    /// `StratificationCategory1` value marking age-group rows.
    pub age_category: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            age_category: DEFAULT_AGE_CATEGORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
