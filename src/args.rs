use clap::Parser;

use healthy_aging::data::RecordFilter;

/// Summarize a cognitive-decline prevalence extract as a dashboard report.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The delimited extract to load. Comma, semicolon, tab and pipe are detected.
    #[arg(short, long)]
    pub input: String,

    /// (file path, optional) JSON file with `loader` and `report` settings.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Only keep rows for this survey year. The trend view still spans all years.
    #[arg(long)]
    pub year: Option<i32>,

    /// Only keep rows whose Stratification1 equals this age group.
    #[arg(long)]
    pub age_group: Option<String>,

    /// Only keep rows whose Stratification2 equals this value.
    #[arg(long)]
    pub sex: Option<String>,

    /// Number of locations in the ranking. Overrides the config file.
    #[arg(long)]
    pub top: Option<usize>,

    /// (file path, 'stdout' or empty) Where the JSON report is written.
    #[arg(short, long)]
    pub out: Option<String>,

    /// (file path, optional) Also write the filtered, normalized rows as CSV.
    #[arg(long)]
    pub export_csv: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    /// Selection from the command line; `age_category` comes from the report config.
    pub fn filter(&self, age_category: &str) -> RecordFilter {
        RecordFilter {
            year: self.year,
            age_group: self.age_group.clone(),
            sex: self.sex.clone(),
            age_category: age_category.to_string(),
        }
    }
}
