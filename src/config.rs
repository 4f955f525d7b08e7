use std::{path::{Path, PathBuf}, time::Duration};

use anyhow::Context;
use clap::ValueEnum;
use serde::Deserialize;
use url::Url;
use validator::Validate;


pub(super) const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_BASE_URL: &str = "https://www.work.ua/ru/jobs-kharkiv-it/";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";


/// Everything a scraping run needs, usually read from `config.toml`.
///
/// Every section may be omitted, in which case the defaults target the IT listings
/// of work.ua with its russian-language labels.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub(crate) struct Config {
    #[validate]
    pub(crate) site: Site,
    #[validate]
    pub(crate) throttle: Throttle,
    pub(crate) export: ExportSettings
}


impl Config {
    /// Reads and validates the config file at `path`.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Loads `path` if given, else `config.toml` if it exists, else the defaults.
    pub(crate) fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(Path::new(DEFAULT_CONFIG_PATH)),
            None => Ok(Self::default())
        }
    }
}


/// The site being scraped and the markup it is scraped by.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub(crate) struct Site {
    /// The first listing page. Later pages are addressed by appending `?page=N`.
    pub(crate) base_url: Url,
    pub(crate) markers: Markers,
    pub(crate) labels: Labels,
    pub(crate) keywords: Keywords
}


impl Default for Site {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("Default base URL should have been valid"),
            markers: Markers::default(),
            labels: Labels::default(),
            keywords: Keywords::default()
        }
    }
}


/// Ids, tags and classes that locate things in the site's HTML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct Markers {
    /// Id of the heading holding a job's title on a job page.
    pub(crate) title_id: String,
    /// Tag of the siblings after the title heading that carry the job's data.
    pub(crate) paragraph_tag: String,
    /// Id of the element wrapping the job list on a listing page.
    pub(crate) jobs_container_id: String,
    pub(crate) card_tag: String,
    /// A card is any `card_tag` element carrying at least one of these classes.
    pub(crate) card_classes: Vec<String>,
    /// Only cards with this class link to a job page.
    pub(crate) job_link_class: String,
    /// The job link is the first anchor inside this element of a card.
    pub(crate) card_heading_tag: String,
    pub(crate) paginator_tag: String,
    pub(crate) paginator_class: String
}


impl Default for Markers {
    fn default() -> Self {
        Self {
            title_id: "h1-name".into(),
            paragraph_tag: "p".into(),
            jobs_container_id: "pjax-job-list".into(),
            card_tag: "div".into(),
            card_classes: vec!["card".into(), "job-link".into()],
            job_link_class: "job-link".into(),
            card_heading_tag: "h2".into(),
            paginator_tag: "ul".into(),
            paginator_class: "pagination".into()
        }
    }
}


/// Values of the `title` attribute that mark what a paragraph of a job page is about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct Labels {
    pub(crate) salary: String,
    pub(crate) company: String,
    pub(crate) conditions: String
}


impl Default for Labels {
    fn default() -> Self {
        Self {
            salary: "Зарплата".into(),
            company: "Данные о компании".into(),
            conditions: "Условия и требования".into()
        }
    }
}


/// Substrings that classify a clause of the conditions paragraph.
///
/// A clause is checked against the categories in field order and counts toward the
/// first one that matches, so `part_time` must come before a `full_time` keyword it contains.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct Keywords {
    pub(crate) experience: Vec<String>,
    pub(crate) part_time: Vec<String>,
    pub(crate) full_time: Vec<String>,
    pub(crate) students: Vec<String>,
    pub(crate) disabled: Vec<String>,
    pub(crate) degree: Vec<String>
}


impl Default for Keywords {
    fn default() -> Self {
        Self {
            experience: vec!["опыт".into()],
            part_time: vec!["неполная".into()],
            full_time: vec!["полная".into()],
            students: vec!["студента".into()],
            disabled: vec!["с инвалидностью".into()],
            degree: vec!["высшее образование".into()]
        }
    }
}


/// How politely the site is crawled.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub(crate) struct Throttle {
    /// How many listing pages are fetched at once.
    #[validate(range(min = 1))]
    pub(crate) page_batch_size: usize,
    /// Pause before each batch of listing pages.
    pub(crate) page_batch_delay_ms: u64,
    /// Pause before fetching the jobs of each listing page.
    pub(crate) job_burst_delay_ms: u64,
    #[validate(range(min = 1))]
    pub(crate) request_timeout_secs: u64,
    pub(crate) user_agent: String
}


impl Throttle {
    pub(crate) fn page_batch_delay(&self) -> Duration {
        Duration::from_millis(self.page_batch_delay_ms)
    }

    pub(crate) fn job_burst_delay(&self) -> Duration {
        Duration::from_millis(self.job_burst_delay_ms)
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}


impl Default for Throttle {
    fn default() -> Self {
        Self {
            page_batch_size: 10,
            page_batch_delay_ms: 50,
            job_burst_delay_ms: 1000,
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.into()
        }
    }
}


#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct ExportSettings {
    pub(crate) output: PathBuf,
    pub(crate) format: ExportFormat
}


impl Default for ExportSettings {
    fn default() -> Self {
        Self { output: PathBuf::from("export.csv"), format: ExportFormat::Csv }
    }
}


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ExportFormat {
    #[default]
    Csv,
    Tsv
}


impl ExportFormat {
    pub(crate) fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Csv => b',',
            ExportFormat::Tsv => b'\t'
        }
    }
}
