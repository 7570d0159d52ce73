//! Statistics Calculator Module
//! Descriptive statistics over prevalence values, per group in parallel.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::data::Record;

/// Descriptive statistics for one set of values.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for SummaryStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Present `value`s of `rows`; missing values are skipped.
    pub fn values(rows: &[&Record]) -> Vec<f64> {
        rows.iter().filter_map(|r| r.value).collect()
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> SummaryStats {
        let n = values.len();
        if n == 0 {
            return SummaryStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        SummaryStats {
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Statistics per group, keyed by `key_fn`. Rows with an empty key are ignored.
    pub fn summarize_by<F>(rows: &[&Record], key_fn: F) -> BTreeMap<String, SummaryStats>
    where
        F: Fn(&Record) -> &str,
    {
        let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
        for row in rows {
            let key = key_fn(*row);
            if key.is_empty() {
                continue;
            }
            let values = groups.entry(key).or_default();
            if let Some(v) = row.value {
                values.push(v);
            }
        }

        groups
            .par_iter()
            .map(|(key, values)| (key.to_string(), Self::compute_descriptive_stats(values)))
            .collect()
    }
}
