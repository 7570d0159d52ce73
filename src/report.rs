//! Headless dashboard report: everything the presentation layer renders, as data.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ReportConfig;
use crate::data::{DataProcessor, Dataset, GroupMean, MapPoint, ProcessorError, Record, RecordFilter};
use crate::stats::{StatsCalculator, SummaryStats};

/// Values available to the year, age-group and sex selectors.
#[derive(Debug, Clone, Serialize)]
pub struct Selectors {
    pub years: Vec<i32>,
    pub age_groups: Vec<String>,
    pub sexes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub source: String,
    pub delimiter: String,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub rows_selected: usize,
    pub filters: RecordFilter,
    pub selectors: Selectors,
    pub summary: SummaryStats,
    pub location_ranking: Vec<GroupMean>,
    pub time_series: Vec<GroupMean>,
    pub age_groups: BTreeMap<String, SummaryStats>,
    pub sexes: BTreeMap<String, SummaryStats>,
    pub map_points: Vec<MapPoint>,
}

impl DashboardReport {
    /// Aggregate `dataset` under `filter`.
    ///
    /// The trend ignores the year selection; every other view honours the
    /// full filter. Age breakdowns only use rows of the configured category.
    pub fn build(
        source: &Path,
        dataset: &Dataset,
        filter: &RecordFilter,
        config: &ReportConfig,
    ) -> Result<Self, ProcessorError> {
        let selected = filter.apply(dataset);
        let df = DataProcessor::to_dataframe(&selected)?;

        let trend_rows = filter.without_year().apply(dataset);
        let trend_df = DataProcessor::to_dataframe(&trend_rows)?;

        let age_rows: Vec<&Record> = selected
            .iter()
            .copied()
            .filter(|r| r.stratification_category_1 == config.age_category)
            .collect();

        Ok(Self {
            source: source.display().to_string(),
            delimiter: (dataset.delimiter() as char).to_string(),
            rows_loaded: dataset.len(),
            rows_skipped: dataset.skipped_rows(),
            rows_selected: selected.len(),
            filters: filter.clone(),
            selectors: Selectors {
                years: dataset.years(),
                age_groups: dataset.age_groups(&config.age_category),
                sexes: dataset.sexes(),
            },
            summary: StatsCalculator::compute_descriptive_stats(&StatsCalculator::values(
                &selected,
            )),
            location_ranking: DataProcessor::location_ranking(&df, config.top_n)?,
            time_series: DataProcessor::time_series(&trend_df)?,
            age_groups: StatsCalculator::summarize_by(&age_rows, |r| r.stratification_1.as_str()),
            sexes: StatsCalculator::summarize_by(&selected, |r| r.stratification_2.as_str()),
            map_points: DataProcessor::map_points(&df)?,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::{write_fixture, HEADER};
    use crate::data::DataLoader;

    fn fixture() -> String {
        format!(
            "{HEADER}\n\
             2020,CA,California,T,Age Group,65 years or older,Female,12.0,,,\"POINT (-120.99 37.64)\"\n\
             2020,CA,California,T,Age Group,50-64 years,Female,8.0,,,\"POINT (-120.99 37.64)\"\n\
             2020,TX,Texas,T,Age Group,65 years or older,Female,15.0,,,\"POINT (-99.42 31.82)\"\n\
             2021,TX,Texas,T,Age Group,65 years or older,Female,17.0,,,\"POINT (-99.42 31.82)\"\n\
             2020,TX,Texas,T,Age Group,65 years or older,Male,11.0,,,\"POINT (-99.42 31.82)\"\n\
             2020,US,United States,T,Overall,Overall,Female,9.0,,,\n"
        )
    }

    #[test]
    fn test_report_views() {
        let file = write_fixture(&fixture());
        let dataset = DataLoader::default().load_path(file.path()).unwrap();
        let filter = RecordFilter {
            year: Some(2020),
            age_group: None,
            sex: Some("Female".to_string()),
            ..RecordFilter::default()
        };
        let report =
            DashboardReport::build(file.path(), &dataset, &filter, &ReportConfig::default())
                .unwrap();

        assert_eq!(report.rows_loaded, 6);
        assert_eq!(report.rows_selected, 4);
        assert_eq!(report.delimiter, ",");
        assert_eq!(report.selectors.years, vec![2020, 2021]);
        assert_eq!(
            report.selectors.age_groups,
            vec!["50-64 years".to_string(), "65 years or older".to_string()]
        );

        assert_eq!(report.summary.count, 4);
        assert_eq!(report.summary.max, 15.0);

        let ranking: Vec<&str> = report.location_ranking.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(ranking, vec!["Texas", "California", "United States"]);

        // Trend keeps every year for the selected sex.
        let years: Vec<&str> = report.time_series.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(years, vec!["2020", "2021"]);

        assert_eq!(report.age_groups.len(), 2);
        assert_eq!(report.age_groups["65 years or older"].mean, 13.5);
        assert_eq!(report.sexes.len(), 1);

        let us = report.map_points.iter().find(|p| p.location_code == "US").unwrap();
        assert_eq!(us.coordinates, None);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"location_ranking\""));
    }

    #[test]
    fn test_age_group_ignores_other_categories() {
        let file = write_fixture(&fixture());
        let dataset = DataLoader::default().load_path(file.path()).unwrap();
        let filter = RecordFilter {
            age_group: Some("Overall".to_string()),
            ..RecordFilter::default()
        };
        let report =
            DashboardReport::build(file.path(), &dataset, &filter, &ReportConfig::default())
                .unwrap();

        // The only `Overall` row is stratified by `Overall`, not by age.
        assert_eq!(report.rows_selected, 0);
        assert!(report.location_ranking.is_empty());
        assert!(report.map_points.is_empty());
    }
}
