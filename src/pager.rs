use std::cell::OnceCell;

use tracing::{info, warn};
use url::Url;

use crate::{
    batch::{settle_in_batches, Tally},
    config::{Markers, Throttle},
    document::Node,
    items::{FetchContext, Fetchable, Page}
};


/// All pages of the listing, in page order.
#[derive(Debug)]
pub(crate) struct Pager {
    base_url: Url,
    /// `pages[0]` is always the page at `base_url` itself.
    pages: Vec<Page>,
    page_count: OnceCell<u32>
}


impl Pager {
    pub(crate) fn new(base_url: Url) -> Self {
        Self { pages: vec![Page::new(base_url.clone())], base_url, page_count: OnceCell::new() }
    }

    pub(crate) fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub(crate) fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// How many pages the listing has, as advertised by the first page's paginator.
    ///
    /// `None` until the first page has loaded; computed once after that.
    pub(crate) fn page_count(&self, markers: &Markers) -> Option<u32> {
        let first = &self.pages[0];
        if !first.item().is_loaded() {
            return None;
        }
        Some(*self.page_count.get_or_init(|| count_pages(first.paginator(markers))))
    }

    fn page_url(&self, number: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("page", &number.to_string());
        url
    }

    /// Loads the first page, then every other page it advertises.
    pub(crate) async fn load(&mut self, ctx: &FetchContext, throttle: &Throttle) -> Tally {
        let mut tally = Tally::default();
        match self.pages[0].load(ctx).await {
            Ok(()) => tally.succeeded += 1,
            Err(error) => {
                warn!(%error, "First listing page failed, no further pages can be discovered");
                tally.failed += 1;
            }
        }

        let count = self.page_count(&ctx.site().markers).unwrap_or(1);
        info!(count, "Discovered listing pages");

        tally + self.load_remaining_pages(ctx, throttle).await
    }

    /// Loads pages `2..=page_count` in batches and appends them in page order.
    ///
    /// Does nothing before the first page has loaded, or once the remaining pages exist.
    pub(crate) async fn load_remaining_pages(&mut self, ctx: &FetchContext, throttle: &Throttle) -> Tally {
        let count = self.page_count(&ctx.site().markers).unwrap_or(1);
        if count < 2 || self.pages.len() > 1 {
            return Tally::default();
        }

        let mut pages: Vec<Page> = (2..=count).map(|number| self.page_url(number)).map(Page::new).collect();
        let outcomes = settle_in_batches(
            pages.iter_mut().map(|page| page.load(ctx)),
            throttle.page_batch_size,
            throttle.page_batch_delay()
        ).await;
        self.pages.extend(pages);

        Tally::of(&outcomes)
    }
}


/// The number on the second-to-last paginator link. The last one is "next".
fn count_pages(paginator: Option<Node<'_>>) -> u32 {
    let anchors = paginator.map(|x| x.find_tag("a")).unwrap_or_default();
    if anchors.len() < 2 {
        return 1;
    }
    anchors[anchors.len() - 2]
        .text()
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&count| count >= 1)
        .unwrap_or(1)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_site::{self, TestSite};

    fn paginator_counts(anchors: &[&str]) -> u32 {
        let html = test_site::listing_page(&[], 0, anchors);
        let document = crate::document::Document::parse(&html);
        count_pages(document.find_all("ul", &["pagination"]).into_iter().next())
    }

    #[test]
    fn page_count_is_the_second_to_last_anchor() {
        assert_eq!(paginator_counts(&["1", "2", "…", "17", "Next"]), 17);
    }

    #[test]
    fn page_count_defaults_to_one() {
        assert_eq!(count_pages(None), 1);
        assert_eq!(paginator_counts(&[]), 1);
        assert_eq!(paginator_counts(&["Next"]), 1);
        assert_eq!(paginator_counts(&["…", "Next"]), 1);
    }

    #[test]
    fn page_urls_use_the_page_query_parameter() {
        let pager = Pager::new(Url::parse("https://example.com/jobs-it/").unwrap());
        assert_eq!(pager.page_url(4).as_str(), "https://example.com/jobs-it/?page=4");
    }

    #[tokio::test]
    async fn page_count_waits_for_the_first_page() {
        let listing = test_site::listing_page(&[], 0, &["1", "2", "3", "Next"]);
        let site = TestSite::serve(vec![("/list/", 200, listing.as_str())]).await;
        let ctx = test_site::context(&site);
        let mut pager = Pager::new(site.url("/list/"));

        assert_eq!(pager.page_count(&ctx.site().markers), None);
        pager.pages_mut()[0].load(&ctx).await.unwrap();
        assert_eq!(pager.page_count(&ctx.site().markers), Some(3));
    }

    #[tokio::test]
    async fn remaining_pages_keep_page_order_despite_failures() {
        let first = test_site::listing_page(&["/jobs/1/"], 0, &["1", "2", "12", "Next"]);
        let mut routes = vec![("/list/".to_string(), 200, first)];
        for number in 2..=12 {
            let status = if number == 5 { 500 } else { 200 };
            let job_path = format!("/jobs/{number}/");
            let body = test_site::listing_page(&[job_path.as_str()], 0, &[]);
            routes.push((format!("/list/?page={number}"), status, body));
        }
        let site = TestSite::serve(routes.iter().map(|(path, status, body)| (path.as_str(), *status, body.as_str())).collect()).await;
        let ctx = test_site::context(&site);
        let throttle = test_site::throttle();
        let mut pager = Pager::new(site.url("/list/"));

        let tally = pager.load(&ctx, &throttle).await;

        assert_eq!(tally, Tally { succeeded: 11, failed: 1 });
        assert_eq!(pager.pages().len(), 12);
        for (index, page) in pager.pages().iter().enumerate().skip(1) {
            assert_eq!(page.item().source(), &site.url(&format!("/list/?page={}", index + 1)));
            assert_eq!(page.item().is_loaded(), index + 1 != 5);
        }
        for number in 2..=12 {
            assert_eq!(site.hits(&format!("/list/?page={number}")), 1);
        }
    }

    #[tokio::test]
    async fn single_page_listing_fetches_nothing_else() {
        let listing = test_site::listing_page(&["/jobs/1/"], 0, &[]);
        let site = TestSite::serve(vec![("/list/", 200, listing.as_str())]).await;
        let ctx = test_site::context(&site);
        let mut pager = Pager::new(site.url("/list/"));

        let tally = pager.load(&ctx, &test_site::throttle()).await;

        assert_eq!(tally, Tally { succeeded: 1, failed: 0 });
        assert_eq!(pager.pages().len(), 1);
    }

    #[tokio::test]
    async fn failed_first_page_means_a_single_page() {
        let site = TestSite::serve(vec![]).await;
        let ctx = test_site::context(&site);
        let mut pager = Pager::new(site.url("/list/"));

        let tally = pager.load(&ctx, &test_site::throttle()).await;

        assert_eq!(tally, Tally { succeeded: 0, failed: 1 });
        assert_eq!(pager.page_count(&ctx.site().markers), None);
        assert_eq!(pager.pages().len(), 1);
    }
}
