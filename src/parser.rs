use std::{ops::Add, path::Path};

use tracing::info;

use crate::{
    batch::{settle_in_turn, Tally},
    config::{Config, ExportFormat, Throttle},
    export::{self, ExportError},
    items::{FetchContext, FetchError, Fetchable, Job, JobDetails},
    pager::Pager
};


/// What a finished run fetched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunReport {
    pub(crate) pages: Tally,
    pub(crate) jobs: Tally
}


/// Drives a whole scrape: the listing pages first, then the jobs of each page.
pub(crate) struct Parser {
    pager: Pager,
    ctx: FetchContext,
    throttle: Throttle
}


impl Parser {
    pub(crate) fn new(config: &Config) -> Result<Self, FetchError> {
        let ctx = FetchContext::new(config.site.clone(), &config.throttle)?;
        Ok(Self::with_context(ctx, config.throttle.clone()))
    }

    pub(crate) fn with_context(ctx: FetchContext, throttle: Throttle) -> Self {
        Self { pager: Pager::new(ctx.site().base_url.clone()), ctx, throttle }
    }

    pub(crate) async fn run(&mut self) -> RunReport {
        info!(url = %self.ctx.site().base_url, "Scraping job listing");
        let pages = self.pager.load(&self.ctx, &self.throttle).await;

        let ctx = &self.ctx;
        let per_page = settle_in_turn(
            self.pager.pages_mut().iter_mut().map(|page| page.load_jobs(ctx)),
            self.throttle.job_burst_delay()
        ).await;
        let jobs = per_page.into_iter().fold(Tally::default(), Add::add);

        let report = RunReport { pages, jobs };
        info!(
            pages_loaded = pages.succeeded,
            pages_failed = pages.failed,
            jobs_loaded = jobs.succeeded,
            jobs_failed = jobs.failed,
            "Run finished"
        );
        report
    }

    /// Every job found so far, in page order and then in the order the page lists them.
    pub(crate) fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.pager.pages().iter().flat_map(|page| page.jobs())
    }

    /// Writes the details of every loaded job to `destination`.
    pub(crate) fn export(&self, destination: &Path, format: ExportFormat) -> Result<usize, ExportError> {
        let details: Vec<&JobDetails> = self
            .jobs()
            .filter(|job| job.item().is_loaded())
            .map(Job::details)
            .collect();

        let written = export::write_file(destination, &details, format)?;
        info!(path = %destination.display(), rows = written, "Exported jobs");
        Ok(written)
    }
}


#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_site::{self, TestSite};

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("job-scraper-{}", std::process::id()))
            .join(name)
    }

    #[tokio::test]
    async fn scrapes_every_page_and_exports_in_order() {
        let first = test_site::listing_page(&["/jobs/a/", "/jobs/b/"], 1, &["1", "2", "Next"]);
        let second = test_site::listing_page(&["/jobs/c/", "/jobs/missing/"], 0, &[]);
        let job_a = test_site::job_page("Rust developer", &[
            r#"<span title="Зарплата"></span>40 000 – 60 000 грн"#,
            r#"<span title="Данные о компании"></span><a href="/c/1/">Acme</a>"#
        ]);
        let job_b = test_site::job_page("QA", &[
            r#"<span title="Условия и требования"></span>Неполная занятость. Можно без опыта, подходит для студента"#
        ]);
        let job_c = test_site::job_page("DevOps", &[]);
        let site = TestSite::serve(vec![
            ("/list/", 200, first.as_str()),
            ("/list/?page=2", 200, second.as_str()),
            ("/jobs/a/", 200, job_a.as_str()),
            ("/jobs/b/", 200, job_b.as_str()),
            ("/jobs/c/", 200, job_c.as_str())
        ]).await;
        let mut parser = Parser::with_context(test_site::context(&site), test_site::throttle());

        let report = parser.run().await;

        assert_eq!(report.pages, Tally { succeeded: 2, failed: 0 });
        assert_eq!(report.jobs, Tally { succeeded: 3, failed: 1 });
        let titles: Vec<Option<&str>> = parser.jobs().map(|job| job.details().title.as_deref()).collect();
        assert_eq!(titles, vec![Some("Rust developer"), Some("QA"), Some("DevOps"), None]);

        let path = scratch_path("nested/export.csv");
        let written = parser.export(&path, ExportFormat::Csv).unwrap();
        assert_eq!(written, 3);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with(",60000,40000,Acme,Rust developer"));
        assert!(lines[2].starts_with("false,false,true,false,true,"));
        assert!(lines[3].ends_with(",DevOps"));

        fs::remove_dir_all(scratch_path("")).ok();
    }

    #[tokio::test]
    async fn every_page_waits_before_its_jobs_are_fetched() {
        let first = test_site::listing_page(&["/jobs/a/"], 0, &["1", "2", "Next"]);
        let second = test_site::listing_page(&["/jobs/b/"], 0, &[]);
        let job = test_site::job_page("Backend", &[]);
        let site = TestSite::serve(vec![
            ("/list/", 200, first.as_str()),
            ("/list/?page=2", 200, second.as_str()),
            ("/jobs/a/", 200, job.as_str()),
            ("/jobs/b/", 200, job.as_str())
        ]).await;
        let throttle = Throttle { job_burst_delay_ms: 150, ..test_site::throttle() };
        let mut parser = Parser::with_context(test_site::context(&site), throttle);

        let start = std::time::Instant::now();
        let report = parser.run().await;

        assert_eq!(report.jobs, Tally { succeeded: 2, failed: 0 });
        assert!(start.elapsed() >= std::time::Duration::from_millis(300));
    }

    #[tokio::test]
    async fn unreachable_listing_exports_nothing() {
        let site = TestSite::serve(vec![]).await;
        let mut parser = Parser::with_context(test_site::context(&site), test_site::throttle());

        let report = parser.run().await;

        assert_eq!(report.pages, Tally { succeeded: 0, failed: 1 });
        assert_eq!(report.jobs, Tally::default());
        let path = scratch_path("empty.csv");
        assert!(matches!(parser.export(&path, ExportFormat::Csv), Err(ExportError::NoJobs)));
        assert!(!path.exists());
    }
}
