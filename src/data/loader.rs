//! Dataset Loader Module
//! Parses a delimited extract of unknown dialect into a normalized [`Dataset`].

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::coerce::{coerce_number, coerce_year};
use super::geo::parse_point;
use super::record::{Dataset, Field, Record};
use super::schema::ResolvedSchema;
use super::sniff::sniff_delimiter;
use crate::config::LoaderConfig;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Fatal load failures. Per-cell and per-row problems never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Cannot read dataset {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("Dataset {} is missing required column(s): {}", .path.display(), .missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },
}

impl LoadError {
    pub(crate) fn unreadable(path: &Path, reason: impl Display) -> Self {
        LoadError::Unreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Missing column descriptions for a schema mismatch.
    pub fn missing_columns(&self) -> &[String] {
        match self {
            LoadError::SchemaMismatch { missing, .. } => missing,
            LoadError::Unreadable { .. } => &[],
        }
    }
}

/// Runs parse, schema check, coercion and geolocation decomposition.
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    config: LoaderConfig,
}

impl DataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Read and normalize the file at `path` without caching.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<Dataset, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| LoadError::unreadable(path, e))?;
        self.parse(path, &bytes)
    }

    /// Normalize already-read file contents. `path` is only used in errors and logs.
    pub fn parse(&self, path: &Path, bytes: &[u8]) -> Result<Dataset, LoadError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(LoadError::unreadable(path, "file is empty"));
        }

        let candidates = self.config.delimiter_bytes();
        let delimiter = match sniff_delimiter(bytes, &candidates, self.config.sniff_lines) {
            Some(d) => d,
            None => {
                let fallback = candidates.first().copied().unwrap_or(b',');
                debug!(
                    "No delimiter detected in {}, reading as single column with {:?}",
                    path.display(),
                    fallback as char
                );
                fallback
            }
        };
        debug!("Detected delimiter {:?} for {}", delimiter as char, path.display());

        let (headers, rows, skipped) = read_rows(path, bytes, delimiter)?;
        if rows.is_empty() {
            return Err(LoadError::unreadable(path, "no parseable data rows"));
        }

        let schema = ResolvedSchema::resolve(&headers, &self.config.columns).map_err(|missing| {
            LoadError::SchemaMismatch {
                path: path.to_path_buf(),
                missing,
            }
        })?;

        let has_geolocation = schema.contains(Field::Geolocation);
        let records: Vec<Record> = rows.iter().map(|row| normalize_row(&schema, row)).collect();

        if skipped > 0 {
            warn!(
                "Dropped {} malformed row(s) from {} (bad encoding or field count differs from header)",
                skipped,
                path.display()
            );
        }
        info!(
            "Loaded {} rows, {} columns from {}",
            records.len(),
            headers.len(),
            path.display()
        );

        Ok(Dataset::new(headers, delimiter, records, skipped, has_geolocation))
    }
}

/// Header plus every row whose width matches it, and the count of rows dropped.
fn read_rows(
    path: &Path,
    bytes: &[u8],
    delimiter: u8,
) -> Result<(Vec<String>, Vec<StringRecord>, usize), LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::unreadable(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::unreadable(path, "missing header row"));
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(row) if row.len() == headers.len() => rows.push(row),
            Ok(row) => {
                debug!(
                    "Skipping row {}: {} fields, expected {}",
                    idx + 2,
                    row.len(),
                    headers.len()
                );
                skipped += 1;
            }
            Err(e) => {
                debug!("Skipping row {}: {}", idx + 2, e);
                skipped += 1;
            }
        }
    }

    Ok((headers, rows, skipped))
}

fn normalize_row(schema: &ResolvedSchema, row: &StringRecord) -> Record {
    let text = |field| schema.get(row, field).unwrap_or_default().to_string();
    let optional_text = |field| {
        schema
            .get(row, field)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let number = |field| schema.get(row, field).and_then(coerce_number);

    let geolocation_raw = optional_text(Field::Geolocation);
    let coordinates = geolocation_raw.as_deref().and_then(parse_point);

    Record {
        year: schema.get(row, Field::Year).and_then(coerce_year),
        location_code: text(Field::LocationCode),
        location_name: text(Field::LocationName),
        topic: optional_text(Field::Topic),
        stratification_category_1: text(Field::StratificationCategory1),
        stratification_1: text(Field::Stratification1),
        stratification_2: text(Field::Stratification2),
        value: number(Field::Value),
        low_ci: number(Field::LowCi),
        high_ci: number(Field::HighCi),
        geolocation_raw,
        coordinates,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const HEADER: &str = "YearStart,LocationAbbr,LocationDesc,Topic,StratificationCategory1,Stratification1,Stratification2,Data_Value,Low_Confidence_Limit,High_Confidence_Limit,Geolocation";

    pub(crate) fn write_fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn sample_csv() -> String {
        format!(
            "{HEADER}\n\
             2020,CA,California,Subjective cognitive decline,Age Group,65 years or older,Female,12.5,10.1,14.9,\"POINT (-120.99 37.64)\"\n\
             2020,TX,Texas,Subjective cognitive decline,Age Group,50-64 years,Male,abc,,~,\n\
             2021,NY,New York,Subjective cognitive decline,Age Group,65 years or older\n\
             2021,US,United States,Subjective cognitive decline,Age Group,Overall,Female,9.0,8.0,10.0,POINT EMPTY\n"
        )
    }

    #[test]
    fn test_load_normalizes_rows() {
        let file = write_fixture(&sample_csv());
        let dataset = DataLoader::default().load_path(file.path()).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.skipped_rows(), 1);
        assert_eq!(dataset.delimiter(), b',');
        assert!(dataset.has_geolocation());

        let ca = &dataset.records()[0];
        assert_eq!(ca.year, Some(2020));
        assert_eq!(ca.location_code, "CA");
        assert_eq!(ca.value, Some(12.5));
        assert_eq!(ca.low_ci, Some(10.1));
        assert_eq!(ca.high_ci, Some(14.9));
        assert_eq!(ca.latitude(), Some(37.64));
        assert_eq!(ca.longitude(), Some(-120.99));

        let tx = &dataset.records()[1];
        assert_eq!(tx.value, None);
        assert_eq!(tx.low_ci, None);
        assert_eq!(tx.high_ci, None);
        assert_eq!(tx.geolocation_raw, None);
        assert_eq!(tx.coordinates, None);

        // Row order is kept; the malformed NY row is gone.
        let codes: Vec<&str> = dataset.records().iter().map(|r| r.location_code.as_str()).collect();
        assert_eq!(codes, vec!["CA", "TX", "US"]);
        assert_eq!(dataset.records()[2].coordinates, None);
    }

    #[test]
    fn test_semicolon_file_with_decimal_commas() {
        let text = "\u{feff}YearStart;LocationAbbr;LocationDesc;Question;StratificationCategory1;Stratification1;Stratification2;Prevalence_Value;Geolocation\n\
                    2019;AL;Alabama;Q;Age Group;Overall;Male;12,5;POINT (-86,63 32,84)\n\
                    2019;AK;Alaska;Q;Age Group;Overall;Female;7;\n";
        let file = write_fixture(text);
        let dataset = DataLoader::default().load_path(file.path()).unwrap();

        assert_eq!(dataset.delimiter(), b';');
        assert_eq!(dataset.headers()[0], "YearStart");
        let al = &dataset.records()[0];
        assert_eq!(al.value, Some(12.5));
        assert_eq!(al.topic.as_deref(), Some("Q"));
        // Comma decimals in the point split into four tokens; the first two win.
        assert_eq!(al.longitude(), Some(-86.0));
        assert_eq!(al.latitude(), Some(63.0));
        assert_eq!(dataset.records()[1].value, Some(7.0));
    }

    #[test]
    fn test_tab_file_without_optional_columns() {
        let text = "YearStart\tLocationAbbr\tLocationDesc\tStratificationCategory1\tStratification1\tStratification2\tData_Value\n\
                    2022\tWA\tWashington\tAge Group\tOverall\tMale\t11.1\n";
        let file = write_fixture(text);
        let dataset = DataLoader::default().load_path(file.path()).unwrap();

        assert_eq!(dataset.delimiter(), b'\t');
        assert!(!dataset.has_geolocation());
        let wa = &dataset.records()[0];
        assert_eq!(wa.topic, None);
        assert_eq!(wa.low_ci, None);
        assert_eq!(wa.coordinates, None);
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let mut bytes = format!(
            "{HEADER}\n2020,CA,California,T,Age Group,Overall,Female,10.0,,,\n"
        )
        .into_bytes();
        bytes.extend_from_slice(b"2020,TX,Tex\xff\xfeas,T,Age Group,Overall,Female,11.0,,,\n");
        bytes.extend_from_slice(b"2021,NY,New York,T,Age Group,Overall,Male,12.0,,,\n");

        let dataset = DataLoader::default()
            .parse(Path::new("mixed.csv"), &bytes)
            .unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped_rows(), 1);
        let codes: Vec<&str> = dataset.records().iter().map(|r| r.location_code.as_str()).collect();
        assert_eq!(codes, vec!["CA", "NY"]);
    }

    #[test]
    fn test_schema_mismatch_names_missing_columns() {
        let text = "YearStart,LocationDesc,StratificationCategory1,Stratification1,Stratification2,Other\n\
                    2020,Texas,Age Group,Overall,Male,1\n";
        let file = write_fixture(text);
        let err = DataLoader::default().load_path(file.path()).unwrap_err();

        assert!(matches!(err, LoadError::SchemaMismatch { .. }));
        assert_eq!(
            err.missing_columns(),
            &["LocationAbbr".to_string(), "Data_Value or Prevalence_Value".to_string()]
        );
        let message = err.to_string();
        assert!(message.contains("LocationAbbr"));
        assert!(message.contains("Data_Value"));
    }

    #[test]
    fn test_unreadable_sources() {
        let loader = DataLoader::default();

        let missing = loader.load_path("/no/such/dir/data.csv").unwrap_err();
        assert!(matches!(missing, LoadError::Unreadable { .. }));
        assert!(missing.missing_columns().is_empty());

        let empty = write_fixture("  \n");
        assert!(matches!(
            loader.load_path(empty.path()),
            Err(LoadError::Unreadable { .. })
        ));

        let header_only = write_fixture(&format!("{HEADER}\n"));
        assert!(matches!(
            loader.load_path(header_only.path()),
            Err(LoadError::Unreadable { .. })
        ));

        let all_malformed = write_fixture(&format!("{HEADER}\n1,2\n3,4,5\n"));
        assert!(matches!(
            loader.load_path(all_malformed.path()),
            Err(LoadError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_rows_come_from_source() {
        let contents = sample_csv();
        let file = write_fixture(&contents);
        let dataset = DataLoader::default().load_path(file.path()).unwrap();

        let data_lines = contents.lines().skip(1).count();
        assert!(dataset.len() <= data_lines);
        for record in dataset.records() {
            let line = contents
                .lines()
                .find(|l| l.starts_with(&format!("{},{},", record.year.unwrap(), record.location_code)))
                .unwrap();
            assert!(line.contains(&record.location_name));
            assert!(line.contains(&record.stratification_1));
            assert_eq!(record.latitude().is_some(), record.longitude().is_some());
        }
    }
}
