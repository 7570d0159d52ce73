//! Healthy Aging - headless dashboard report for prevalence extracts.

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use args::Args;
use healthy_aging::data::{DataLoader, DataProcessor};
use healthy_aging::{AppConfig, DashboardReport};

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(top) = args.top {
        config.report.top_n = top;
    }
    debug!("Config: {:?}", config);

    let input = Path::new(&args.input);
    let dataset = DataLoader::new(config.loader.clone())
        .load_path(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let filter = args.filter(&config.report.age_category);
    let report = DashboardReport::build(input, &dataset, &filter, &config.report)
        .context("Failed to aggregate dataset")?;
    let json = report.to_json()?;

    match args.out.as_deref() {
        None | Some("") | Some("stdout") => println!("{}", json),
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write report to {}", path))?;
            info!("Report written to {}", path);
        }
    }

    if let Some(path) = &args.export_csv {
        let rows = filter.apply(&dataset);
        let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
        DataProcessor::write_csv(&rows, BufWriter::new(file))?;
        info!("Exported {} rows to {}", rows.len(), path);
    }

    Ok(())
}
