//! Column alias resolution, run once per load against the header row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::record::Field;

/// How one canonical field is found in a source header.
///
/// Aliases are tried in order and the first one present in the header wins,
/// so `["Data_Value", "Prevalence_Value"]` prefers `Data_Value` when a file
/// carries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: Field,
    pub aliases: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl ColumnSpec {
    pub fn new(field: Field, aliases: &[&str], required: bool) -> Self {
        Self {
            field,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            required,
        }
    }

    /// Human-readable name used when reporting the column as missing.
    pub fn describe(&self) -> String {
        self.aliases.join(" or ")
    }
}

/// Column layout of the prevalence extracts.
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new(Field::Year, &["YearStart"], true),
        ColumnSpec::new(Field::LocationCode, &["LocationAbbr"], true),
        ColumnSpec::new(Field::LocationName, &["LocationDesc"], true),
        ColumnSpec::new(Field::Topic, &["Topic", "Question"], false),
        ColumnSpec::new(Field::StratificationCategory1, &["StratificationCategory1"], true),
        ColumnSpec::new(Field::Stratification1, &["Stratification1"], true),
        ColumnSpec::new(Field::Stratification2, &["Stratification2"], true),
        ColumnSpec::new(Field::Value, &["Data_Value", "Prevalence_Value"], true),
        ColumnSpec::new(Field::LowCi, &["Low_Confidence_Limit"], false),
        ColumnSpec::new(Field::HighCi, &["High_Confidence_Limit"], false),
        ColumnSpec::new(Field::Geolocation, &["Geolocation"], false),
    ]
}

/// Field positions within a parsed header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSchema {
    columns: HashMap<Field, (usize, String)>,
}

impl ResolvedSchema {
    /// Resolve every spec against `headers`.
    ///
    /// Returns the descriptions of all required columns that could not be
    /// found, in spec order.
    pub fn resolve(headers: &[String], specs: &[ColumnSpec]) -> Result<Self, Vec<String>> {
        let mut columns = HashMap::new();
        let mut missing = Vec::new();

        for spec in specs {
            let found = spec.aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h == alias)
                    .map(|idx| (idx, alias.clone()))
            });
            match found {
                Some(column) => {
                    columns.entry(spec.field).or_insert(column);
                }
                None if spec.required => missing.push(spec.describe()),
                None => {}
            }
        }

        if missing.is_empty() {
            Ok(Self { columns })
        } else {
            Err(missing)
        }
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).map(|(idx, _)| *idx)
    }

    /// Header name that satisfied `field`.
    pub fn source_name(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(|(_, name)| name.as_str())
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Cell for `field` in `row`, if the column was resolved.
    pub fn get<'r>(&self, row: &'r csv::StringRecord, field: Field) -> Option<&'r str> {
        self.index(field).and_then(|idx| row.get(idx))
    }
}
