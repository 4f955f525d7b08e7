use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{config::{Site, Throttle}, document::Document};

pub(crate) use self::job::{Job, JobDetails, Patterns};
pub(crate) use self::page::Page;

mod job;
mod page;


#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error
    },
    #[error("{url} responded with HTTP {status}")]
    Status {
        url: Url,
        status: StatusCode
    },
    #[error("failed to build the HTTP client: {0}")]
    Client(#[source] reqwest::Error)
}


/// The response an item was loaded from.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    /// Where the response came from after following redirects.
    pub(crate) url: Url,
    pub(crate) status: StatusCode,
    pub(crate) body: String
}


/// Shared, read-only state that every fetch in a run borrows.
pub(crate) struct FetchContext {
    client: reqwest::Client,
    site: Site,
    patterns: Patterns
}


impl FetchContext {
    pub(crate) fn new(site: Site, throttle: &Throttle) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(throttle.user_agent.as_str())
            .timeout(throttle.request_timeout())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self::with_client(client, site))
    }

    pub(crate) fn with_client(client: reqwest::Client, site: Site) -> Self {
        Self { client, site, patterns: Patterns::default() }
    }

    pub(crate) fn site(&self) -> &Site {
        &self.site
    }

    pub(crate) fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    async fn get(&self, url: &Url) -> Result<RawResponse, FetchError> {
        let request_error = |source: reqwest::Error| FetchError::Request { url: url.clone(), source };

        let response = self.client
            .get(url.clone())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.clone(), status });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(request_error)?;
        Ok(RawResponse { url: final_url, status, body })
    }
}


/// A remote page that is fetched once and kept as a parsed document.
#[derive(Debug)]
pub(crate) struct Item {
    source: Url,
    document: Option<Document>,
    response: Option<RawResponse>
}


impl Item {
    pub(crate) fn new(source: Url) -> Self {
        Self { source, document: None, response: None }
    }

    pub(crate) fn source(&self) -> &Url {
        &self.source
    }

    /// The parsed page. Present exactly when the item loaded successfully.
    pub(crate) fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub(crate) fn response(&self) -> Option<&RawResponse> {
        self.response.as_ref()
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.document.is_some()
    }
}


/// Something backed by an [`Item`] that can be fetched over HTTP.
pub(crate) trait Fetchable {
    fn item(&self) -> &Item;

    fn item_mut(&mut self) -> &mut Item;

    /// Called once, right after the document has been stored.
    fn on_loaded(&mut self, _ctx: &FetchContext) { }

    /// Fetches and parses the item's source, then runs [`Fetchable::on_loaded`].
    ///
    /// Loading an item that is already loaded does nothing and sends no request.
    /// Items share nothing mutable, so any number of them can load concurrently.
    async fn load(&mut self, ctx: &FetchContext) -> Result<(), FetchError> {
        if self.item().is_loaded() {
            debug!(url = %self.item().source(), "Already loaded, skipping");
            return Ok(());
        }

        let source = self.item().source().clone();
        let response = ctx.get(&source).await?;
        debug!(url = %source, status = %response.status, bytes = response.body.len(), "Loaded");

        let item = self.item_mut();
        item.document = Some(Document::parse(&response.body));
        item.response = Some(response);

        self.on_loaded(ctx);
        Ok(())
    }
}
