//! Healthy Aging - ingestion and normalization of cognitive-decline prevalence extracts.
//!
//! Loads a delimited surveillance extract of unknown dialect into a typed,
//! immutable table and aggregates it into the views a dashboard renders.

pub mod config;
pub mod data;
pub mod report;
pub mod stats;

pub use config::{AppConfig, ConfigError, LoaderConfig, ReportConfig};
pub use data::{extract_coordinates, load_dataset, DataLoader, Dataset, DatasetCache, LoadError, Record};
pub use report::DashboardReport;
