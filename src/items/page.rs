use std::cell::OnceCell;

use tracing::{debug, info};
use url::Url;

use crate::{batch::{settle_all, Tally}, config::Markers, document::{Document, Node}};

use super::{FetchContext, Fetchable, Item, Job};


/// One page of the job listing and the jobs linked from it.
#[derive(Debug)]
pub(crate) struct Page {
    item: Item,
    jobs: Vec<Job>,
    /// The job list, cut out of the page on first use.
    jobs_container: OnceCell<Option<Document>>
}


impl Page {
    pub(crate) fn new(source: Url) -> Self {
        Self { item: Item::new(source), jobs: Vec::new(), jobs_container: OnceCell::new() }
    }

    pub(crate) fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// The element holding the job cards and the paginator.
    ///
    /// Resolved once, after the page has loaded. Before that it is always `None`.
    pub(crate) fn jobs_container(&self, markers: &Markers) -> Option<&Document> {
        let document = self.item.document()?;
        self.jobs_container
            .get_or_init(|| {
                document
                    .find_by_id(&markers.jobs_container_id)
                    .map(|container| Document::parse_fragment(&container.html()))
            })
            .as_ref()
    }

    /// The pagination widget. Only the first page's is ever consulted.
    pub(crate) fn paginator(&self, markers: &Markers) -> Option<Node<'_>> {
        self.jobs_container(markers)?
            .find_all(&markers.paginator_tag, std::slice::from_ref(&markers.paginator_class))
            .into_iter()
            .next()
    }

    /// Every card in the job list, whether it links to a job or not.
    pub(crate) fn job_cards(&self, markers: &Markers) -> Vec<Node<'_>> {
        self.jobs_container(markers)
            .map(|container| container.find_all(&markers.card_tag, &markers.card_classes))
            .unwrap_or_default()
    }

    /// Absolute URLs of the job pages this page links to, in page order.
    ///
    /// Links are resolved against the address the page was finally served from.
    pub(crate) fn job_links(&self, markers: &Markers) -> Vec<Url> {
        let base = self.item.response().map_or(self.item.source(), |response| &response.url);
        self.job_cards(markers)
            .into_iter()
            .filter(|card| card.has_class(&markers.job_link_class))
            .filter_map(|card| {
                let href = card
                    .find_first(&markers.card_heading_tag)?
                    .find_first("a")?
                    .attr("href")?;
                match base.join(href) {
                    Ok(url) => Some(url),
                    Err(error) => {
                        debug!(href, %error, "Skipping unresolvable job link");
                        None
                    }
                }
            })
            .collect()
    }

    /// Creates a [`Job`] for every job link and loads them all at once.
    ///
    /// Jobs that fail to load are kept, without details.
    pub(crate) async fn load_jobs(&mut self, ctx: &FetchContext) -> Tally {
        if !self.item.is_loaded() {
            debug!(url = %self.item.source(), "Page never loaded, it has no jobs");
            return Tally::default();
        }

        self.jobs = self
            .job_links(&ctx.site().markers)
            .into_iter()
            .map(Job::new)
            .collect();

        let outcomes = settle_all(self.jobs.iter_mut().map(|job| job.load(ctx))).await;
        let tally = Tally::of(&outcomes);
        info!(url = %self.item.source(), loaded = tally.succeeded, failed = tally.failed, "Loaded jobs of page");
        tally
    }
}


impl Fetchable for Page {
    fn item(&self) -> &Item {
        &self.item
    }

    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }
}
