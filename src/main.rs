use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser as _, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use crate::{
    config::{Config, ExportFormat},
    parser::Parser,
    summary::{Table, ValueBar, ValueHist}
};

mod batch;
mod config;
mod document;
mod export;
mod items;
mod pager;
mod parser;
mod summary;
#[cfg(test)]
mod test_site;


/// Scrapes a paginated job listing into a spreadsheet and summarizes the result.
#[derive(clap::Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command
}


#[derive(Subcommand)]
enum Command {
    /// Fetch every listing page and job, then export the jobs
    Scrape {
        /// Configuration file. Defaults apply when the default file is missing
        #[arg(long)]
        config: Option<PathBuf>,
        /// First page of the listing, overriding the configured one
        #[arg(long)]
        base_url: Option<Url>,
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<ExportFormat>
    },
    /// Print a chart of one column of an exported file
    Summarize {
        #[arg(long, short, default_value = "export.csv")]
        input: PathBuf,
        #[arg(long, short)]
        column: String,
        #[arg(long, value_enum, default_value_t = ChartKind::Bar)]
        kind: ChartKind,
        /// Number of histogram bins
        #[arg(long, default_value_t = 10)]
        bins: usize,
        /// Value for empty histogram cells. Empty cells are skipped without it
        #[arg(long)]
        fill: Option<f64>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat
    }
}


#[derive(Clone, Copy, ValueEnum)]
enum ChartKind {
    Bar,
    Hist
}


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "job_scraper=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Scrape { config, base_url, output, format } => {
            let mut config = Config::load_or_default(config.as_deref())?;
            if let Some(base_url) = base_url {
                config.site.base_url = base_url;
            }
            if let Some(output) = output {
                config.export.output = output;
            }
            if let Some(format) = format {
                config.export.format = format;
            }

            let mut parser = Parser::new(&config).context("Failed to set up the HTTP client")?;
            let report = parser.run().await;
            let written = parser
                .export(&config.export.output, config.export.format)
                .with_context(|| format!("Failed to export jobs to {}", config.export.output.display()))?;
            info!(rows = written, jobs_seen = report.jobs.total(), "Scrape completed");
        }
        Command::Summarize { input, column, kind, bins, fill, format } => {
            let table = Table::open(&input, format)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let chart = match kind {
                ChartKind::Bar => ValueBar::new(&table, &column)?.to_string(),
                ChartKind::Hist => ValueHist::new(&table, &column, fill)?.histogram(bins).to_string()
            };
            print!("{chart}");
        }
    }

    Ok(())
}
