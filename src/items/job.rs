use std::fmt;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::{config::{Keywords, Labels, Site}, document::{Document, Node}};

use super::{FetchContext, Fetchable, Item};


/// Compiled patterns used to pick apart the free text of a job page.
pub(crate) struct Patterns {
    non_alphanumeric: Regex,
    wide_gap: Regex,
    whitespace: Regex,
    clause_separator: Regex,
    digits: Regex
}


impl Default for Patterns {
    fn default() -> Self {
        Self {
            non_alphanumeric: Regex::new("[^A-Za-z0-9]").unwrap(),
            wide_gap: Regex::new(r"\s{2,}").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
            clause_separator: Regex::new("[.,]").unwrap(),
            digits: Regex::new("[0-9]+").unwrap()
        }
    }
}


impl Patterns {
    /// Every number in a salary line.
    ///
    /// Anything that is not an ASCII letter or digit becomes a space, so thousands
    /// separators (`40 000`, `40&nbsp;000`) collapse into one number while currency
    /// words and dashes open a gap of at least two spaces between numbers.
    fn salary_numbers(&self, text: &str) -> Vec<u64> {
        let cleaned = self.non_alphanumeric.replace_all(text, " ");
        self.wide_gap
            .split(cleaned.trim())
            .map(|token| token.replace(' ', ""))
            .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|token| match token.parse() {
                Ok(number) => Some(number),
                Err(error) => {
                    debug!(token = token.as_str(), %error, "Skipping salary figure");
                    None
                }
            })
            .collect()
    }

    /// Lowercased, trimmed clauses of a conditions paragraph.
    fn clauses(&self, text: &str) -> Vec<String> {
        let normalized = self.whitespace.replace_all(text, " ");
        self.clause_separator
            .split(&normalized)
            .map(|clause| clause.trim().to_lowercase())
            .collect()
    }

    fn first_number(&self, text: &str) -> Option<u32> {
        self.digits.find(text)?.as_str().parse().ok()
    }
}


/// What a paragraph after the title heading describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Salary,
    Company,
    Conditions
}


impl Role {
    fn of(paragraph: Node<'_>, labels: &Labels) -> Option<Self> {
        let marked = |label: &str| paragraph.find_by_attr("title", label).is_some();

        if marked(&labels.salary) {
            Some(Role::Salary)
        } else if marked(&labels.company) {
            Some(Role::Company)
        } else if marked(&labels.conditions) {
            Some(Role::Conditions)
        } else {
            None
        }
    }
}


/// The structured data pulled out of a job page.
///
/// Every field stays absent (or `false`) when the page lacks the markup it is read
/// from. Extraction never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct JobDetails {
    pub(crate) title: Option<String>,
    pub(crate) company: Option<String>,
    /// Salaries carry no currency. A single advertised figure sets both bounds.
    pub(crate) min_salary: Option<u64>,
    pub(crate) max_salary: Option<u64>,
    pub(crate) experience_years: Option<u32>,
    pub(crate) degree_required: bool,
    pub(crate) for_disabled: bool,
    pub(crate) for_students: bool,
    pub(crate) full_time: bool,
    pub(crate) half_time: bool
}


impl JobDetails {
    pub(crate) fn extract(document: &Document, site: &Site, patterns: &Patterns) -> Self {
        let mut details = Self::default();

        let Some(heading) = document.find_by_id(&site.markers.title_id) else {
            return details
        };
        details.title = Some(heading.text().trim().to_string());

        for paragraph in heading.next_siblings(&site.markers.paragraph_tag) {
            match Role::of(paragraph, &site.labels) {
                Some(Role::Salary) => details.read_salary(&paragraph.text(), patterns),
                Some(Role::Company) => {
                    let company = paragraph
                        .find_first("a")
                        .unwrap_or(paragraph)
                        .text();
                    details.company = Some(company.trim().to_string());
                }
                Some(Role::Conditions) => {
                    for clause in patterns.clauses(&paragraph.text()) {
                        details.apply_condition(&clause, &site.keywords, patterns);
                    }
                }
                None => { }
            }
        }

        details
    }

    fn read_salary(&mut self, text: &str, patterns: &Patterns) {
        let numbers = patterns.salary_numbers(text);
        self.min_salary = numbers.iter().copied().min();
        self.max_salary = numbers.iter().copied().max();
    }

    /// Applies one lowercased clause. The first matching category wins.
    fn apply_condition(&mut self, clause: &str, keywords: &Keywords, patterns: &Patterns) {
        let mentions = |words: &[String]| words.iter().any(|word| clause.contains(&word.to_lowercase()));

        if mentions(&keywords.experience) {
            if let Some(years) = patterns.first_number(clause) {
                self.experience_years = Some(years);
            }
        } else if mentions(&keywords.part_time) {
            self.half_time = true;
        } else if mentions(&keywords.full_time) {
            self.full_time = true;
        } else if mentions(&keywords.students) {
            self.for_students = true;
        } else if mentions(&keywords.disabled) {
            self.for_disabled = true;
        } else if mentions(&keywords.degree) {
            self.degree_required = true;
        }
    }

    /// The salary as shown to people: a `min - max` range, a single figure, or nothing.
    pub(crate) fn salary_display(&self) -> Option<String> {
        match (self.min_salary, self.max_salary) {
            (Some(min), Some(max)) if min != max => Some(format!("{min} - {max}")),
            (Some(value), _) | (None, Some(value)) => Some(value.to_string()),
            (None, None) => None
        }
    }
}


impl fmt::Display for JobDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_unknown = |value: Option<&str>| value.unwrap_or("?").to_string();
        write!(
            f,
            "\"{}\" at \"{}\" for {}; degree required: {}, for disabled: {}, for students: {}, experience: {}, full time: {}, half time: {}",
            or_unknown(self.title.as_deref()),
            or_unknown(self.company.as_deref()),
            self.salary_display().unwrap_or_else(|| "?".into()),
            self.degree_required,
            self.for_disabled,
            self.for_students,
            self.experience_years.map_or_else(|| "?".into(), |x| format!("{x} years")),
            self.full_time,
            self.half_time
        )
    }
}


/// A single job posting.
#[derive(Debug)]
pub(crate) struct Job {
    item: Item,
    details: JobDetails
}


impl Job {
    pub(crate) fn new(source: Url) -> Self {
        Self { item: Item::new(source), details: JobDetails::default() }
    }

    pub(crate) fn details(&self) -> &JobDetails {
        &self.details
    }
}


impl Fetchable for Job {
    fn item(&self) -> &Item {
        &self.item
    }

    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }

    fn on_loaded(&mut self, ctx: &FetchContext) {
        if let Some(document) = self.item.document() {
            self.details = JobDetails::extract(document, ctx.site(), ctx.patterns());
            debug!(url = %self.item.source(), job = %self.details, "Parsed job");
        }
    }
}
