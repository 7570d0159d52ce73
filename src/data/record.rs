//! Normalized Record Module
//! Typed rows and the immutable dataset produced by the loader.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::geo::Coordinates;

/// Canonical fields of a prevalence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Year,
    LocationCode,
    LocationName,
    Topic,
    #[serde(rename = "stratification_category_1")]
    StratificationCategory1,
    #[serde(rename = "stratification_1")]
    Stratification1,
    #[serde(rename = "stratification_2")]
    Stratification2,
    Value,
    LowCi,
    HighCi,
    Geolocation,
}

impl Field {
    /// Name used for this field in downstream tables.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::LocationCode => "location_code",
            Field::LocationName => "location_name",
            Field::Topic => "topic",
            Field::StratificationCategory1 => "stratification_category_1",
            Field::Stratification1 => "stratification_1",
            Field::Stratification2 => "stratification_2",
            Field::Value => "value",
            Field::LowCi => "low_ci",
            Field::HighCi => "high_ci",
            Field::Geolocation => "geolocation_raw",
        }
    }
}

/// One normalized row of the source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub year: Option<i32>,
    pub location_code: String,
    pub location_name: String,
    pub topic: Option<String>,
    pub stratification_category_1: String,
    pub stratification_1: String,
    pub stratification_2: String,
    pub value: Option<f64>,
    pub low_ci: Option<f64>,
    pub high_ci: Option<f64>,
    pub geolocation_raw: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl Record {
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

/// The normalized table. Built once per source content and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    delimiter: u8,
    records: Vec<Record>,
    skipped_rows: usize,
    has_geolocation: bool,
}

impl Dataset {
    pub(crate) fn new(
        headers: Vec<String>,
        delimiter: u8,
        records: Vec<Record>,
        skipped_rows: usize,
        has_geolocation: bool,
    ) -> Self {
        Self {
            headers,
            delimiter,
            records,
            skipped_rows,
            has_geolocation,
        }
    }

    /// Rows in source order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row exactly as it appeared in the source.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Delimiter detected while parsing.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Rows dropped for a field count that did not match the header or undecodable text.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn has_geolocation(&self) -> bool {
        self.has_geolocation
    }

    /// Distinct survey years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .filter_map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct `stratification_1` values on rows stratified by `age_category`.
    pub fn age_groups(&self, age_category: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.stratification_category_1 == age_category)
                .map(|r| r.stratification_1.as_str()),
        )
    }

    /// Distinct `stratification_2` values.
    pub fn sexes(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.stratification_2.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
