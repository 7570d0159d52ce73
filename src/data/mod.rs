//! Data module - loading, normalization and aggregation

pub mod cache;
pub mod coerce;
pub mod geo;
pub mod loader;
pub mod processor;
pub mod record;
pub mod schema;
pub mod sniff;

pub use cache::{load_dataset, DataSource, DatasetCache, FileSystem, SourceFingerprint};
pub use geo::{extract_coordinates, parse_point, Coordinates};
pub use loader::{DataLoader, LoadError};
pub use processor::{DataProcessor, GroupMean, MapPoint, ProcessorError, RecordFilter};
pub use record::{Dataset, Field, Record};
pub use schema::{ColumnSpec, ResolvedSchema};
