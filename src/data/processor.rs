//! Data Processor Module
//! Filtering and grouped averages over a loaded dataset.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

use super::geo::Coordinates;
use super::record::{Dataset, Record};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("CSV export failed: {0}")]
    CsvError(#[from] csv::Error),
}

/// `StratificationCategory1` value marking age-group rows in the extracts.
pub const DEFAULT_AGE_CATEGORY: &str = "Age Group";

/// Dashboard selection. Unset fields match everything.
///
/// An age group only matches rows whose `stratification_category_1` is
/// `age_category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub year: Option<i32>,
    pub age_group: Option<String>,
    pub sex: Option<String>,
    pub age_category: String,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            year: None,
            age_group: None,
            sex: None,
            age_category: DEFAULT_AGE_CATEGORY.to_string(),
        }
    }
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        self.year.map_or(true, |y| record.year == Some(y))
            && self.age_group.as_deref().map_or(true, |a| {
                record.stratification_category_1 == self.age_category
                    && record.stratification_1 == a
            })
            && self
                .sex
                .as_deref()
                .map_or(true, |s| record.stratification_2 == s)
    }

    /// Matching rows in source order.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Record> {
        dataset.records().iter().filter(|r| self.matches(r)).collect()
    }

    /// Same selection across every year, as used by the trend view.
    pub fn without_year(&self) -> Self {
        Self {
            year: None,
            ..self.clone()
        }
    }
}

/// Average of `value` for one group. Missing values are not counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: String,
    pub mean: Option<f64>,
    pub count: usize,
}

/// Per-location average with the location's point, for the choropleth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub location_code: String,
    pub location_name: String,
    pub mean: Option<f64>,
    pub coordinates: Option<Coordinates>,
}

/// Handles grouping and averaging on top of polars.
pub struct DataProcessor;

impl DataProcessor {
    /// Build a polars table with the canonical column names.
    pub fn to_dataframe(rows: &[&Record]) -> Result<DataFrame, ProcessorError> {
        let years: Vec<Option<i32>> = rows.iter().map(|r| r.year).collect();
        let codes: Vec<&str> = rows.iter().map(|r| r.location_code.as_str()).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.location_name.as_str()).collect();
        let topics: Vec<Option<&str>> = rows.iter().map(|r| r.topic.as_deref()).collect();
        let categories: Vec<&str> = rows
            .iter()
            .map(|r| r.stratification_category_1.as_str())
            .collect();
        let strat_1: Vec<&str> = rows.iter().map(|r| r.stratification_1.as_str()).collect();
        let strat_2: Vec<&str> = rows.iter().map(|r| r.stratification_2.as_str()).collect();
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();
        let low: Vec<Option<f64>> = rows.iter().map(|r| r.low_ci).collect();
        let high: Vec<Option<f64>> = rows.iter().map(|r| r.high_ci).collect();
        let lat: Vec<Option<f64>> = rows.iter().map(|r| r.latitude()).collect();
        let lon: Vec<Option<f64>> = rows.iter().map(|r| r.longitude()).collect();

        let df = DataFrame::new(vec![
            Column::new("year".into(), years),
            Column::new("location_code".into(), codes),
            Column::new("location_name".into(), names),
            Column::new("topic".into(), topics),
            Column::new("stratification_category_1".into(), categories),
            Column::new("stratification_1".into(), strat_1),
            Column::new("stratification_2".into(), strat_2),
            Column::new("value".into(), values),
            Column::new("low_ci".into(), low),
            Column::new("high_ci".into(), high),
            Column::new("latitude".into(), lat),
            Column::new("longitude".into(), lon),
        ])?;

        Ok(df)
    }

    /// Mean value per distinct `key`, in first-seen order.
    pub fn mean_by(df: &DataFrame, key: &str) -> Result<Vec<GroupMean>, ProcessorError> {
        let grouped = Self::grouped_means(df, key)?.collect()?;
        Self::collect_group_means(&grouped)
    }

    /// Locations ordered by descending mean, missing means last.
    pub fn location_ranking(
        df: &DataFrame,
        top_n: usize,
    ) -> Result<Vec<GroupMean>, ProcessorError> {
        let ranked = Self::grouped_means(df, "location_name")?
            .sort(
                ["mean"],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .limit(IdxSize::try_from(top_n).unwrap_or(IdxSize::MAX))
            .collect()?;
        Self::collect_group_means(&ranked)
    }

    /// Mean value per year, ascending.
    pub fn time_series(df: &DataFrame) -> Result<Vec<GroupMean>, ProcessorError> {
        let series = df
            .clone()
            .lazy()
            .filter(col("year").is_not_null())
            .group_by_stable([col("year")])
            .agg([
                col("value").mean().alias("mean"),
                col("value").count().cast(DataType::UInt32).alias("count"),
            ])
            .sort(["year"], SortMultipleOptions::default())
            .select([
                col("year").cast(DataType::String).alias("key"),
                col("mean"),
                col("count"),
            ])
            .collect()?;
        Self::collect_group_means(&series)
    }

    /// Mean value per location code, carrying the first available point.
    pub fn map_points(df: &DataFrame) -> Result<Vec<MapPoint>, ProcessorError> {
        let points = df
            .clone()
            .lazy()
            .group_by_stable([col("location_code")])
            .agg([
                col("location_name").first(),
                col("value").mean().alias("mean"),
                col("latitude").drop_nulls().first().alias("latitude"),
                col("longitude").drop_nulls().first().alias("longitude"),
            ])
            .collect()?;

        let codes = points.column("location_code")?.str()?;
        let names = points.column("location_name")?.str()?;
        let means = points.column("mean")?.f64()?;
        let lats = points.column("latitude")?.f64()?;
        let lons = points.column("longitude")?.f64()?;

        let result = (0..points.height())
            .filter_map(|i| {
                let coordinates = match (lats.get(i), lons.get(i)) {
                    (Some(latitude), Some(longitude)) => Some(Coordinates {
                        latitude,
                        longitude,
                    }),
                    _ => None,
                };
                Some(MapPoint {
                    location_code: codes.get(i)?.to_string(),
                    location_name: names.get(i).unwrap_or_default().to_string(),
                    mean: means.get(i),
                    coordinates,
                })
            })
            .collect();

        Ok(result)
    }

    /// Write rows as a normalized CSV table.
    pub fn write_csv<W: Write>(rows: &[&Record], writer: W) -> Result<(), ProcessorError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "year",
            "location_code",
            "location_name",
            "topic",
            "stratification_category_1",
            "stratification_1",
            "stratification_2",
            "value",
            "low_ci",
            "high_ci",
            "geolocation_raw",
            "latitude",
            "longitude",
        ])?;

        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        for r in rows {
            wtr.write_record([
                r.year.map(|y| y.to_string()).unwrap_or_default(),
                r.location_code.clone(),
                r.location_name.clone(),
                r.topic.clone().unwrap_or_default(),
                r.stratification_category_1.clone(),
                r.stratification_1.clone(),
                r.stratification_2.clone(),
                opt(r.value),
                opt(r.low_ci),
                opt(r.high_ci),
                r.geolocation_raw.clone().unwrap_or_default(),
                opt(r.latitude()),
                opt(r.longitude()),
            ])?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    fn grouped_means(df: &DataFrame, key: &str) -> Result<LazyFrame, ProcessorError> {
        // Fail early with a polars error rather than at collect time.
        df.column(key)?;
        Ok(df
            .clone()
            .lazy()
            .filter(col(key).is_not_null())
            .group_by_stable([col(key)])
            .agg([
                col("value").mean().alias("mean"),
                col("value").count().cast(DataType::UInt32).alias("count"),
            ])
            .select([
                col(key).cast(DataType::String).alias("key"),
                col("mean"),
                col("count"),
            ]))
    }

    fn collect_group_means(df: &DataFrame) -> Result<Vec<GroupMean>, ProcessorError> {
        let keys = df.column("key")?.str()?;
        let means = df.column("mean")?.f64()?;
        let counts = df.column("count")?.u32()?;

        Ok(keys
            .into_iter()
            .zip(means.into_iter())
            .zip(counts.into_iter())
            .filter_map(|((key, mean), count)| {
                Some(GroupMean {
                    key: key?.to_string(),
                    mean,
                    count: count.unwrap_or(0) as usize,
                })
            })
            .collect())
    }
}
