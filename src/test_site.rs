//! A throwaway HTTP server and page builders shaped like the real site's markup.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream}
};
use url::Url;

use crate::{config::{Site, Throttle}, items::FetchContext};


type Routes = HashMap<String, (u16, String)>;


/// Serves fixed bodies by exact path (query included) and counts requests per path.
/// Unknown paths get a 404.
pub(crate) struct TestSite {
    addr: SocketAddr,
    hits: Arc<Mutex<HashMap<String, usize>>>
}


impl TestSite {
    pub(crate) async fn serve(routes: Vec<(&str, u16, &str)>) -> Self {
        Self::serve_with_latency(routes, Duration::ZERO).await
    }

    /// Like [`TestSite::serve`], but every response is held back for `latency`.
    pub(crate) async fn serve_with_latency(routes: Vec<(&str, u16, &str)>, latency: Duration) -> Self {
        let routes: Arc<Routes> = Arc::new(
            routes
                .into_iter()
                .map(|(path, status, body)| (path.to_string(), (status, body.to_string())))
                .collect()
        );
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_hits = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(respond(stream, routes.clone(), server_hits.clone(), latency));
            }
        });

        Self { addr, hits }
    }

    pub(crate) fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    pub(crate) fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}


async fn respond(mut stream: TcpStream, routes: Arc<Routes>, hits: Arc<Mutex<HashMap<String, usize>>>, latency: Duration) {
    let mut request = Vec::new();
    let mut buffer = [0u8; 1024];
    while !request.windows(4).any(|x| x == b"\r\n\r\n") {
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buffer[..n])
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
    *hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    let (status, body) = routes.get(&path).cloned().unwrap_or((404, String::new()));
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Error"
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}


/// Default site markup, rooted at the test server.
pub(crate) fn context(site: &TestSite) -> FetchContext {
    let mut config = Site::default();
    config.base_url = site.url("/list/");
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    FetchContext::with_client(client, config)
}


/// Throttling without any delays.
pub(crate) fn throttle() -> Throttle {
    Throttle { page_batch_delay_ms: 0, job_burst_delay_ms: 0, ..Throttle::default() }
}


/// A listing page with a job-link card per path, `plain_cards` cards without a
/// job link, and a paginator whose anchors carry `paginator` as text.
pub(crate) fn listing_page(job_paths: &[&str], plain_cards: usize, paginator: &[&str]) -> String {
    let mut cards = String::new();
    for (index, path) in job_paths.iter().enumerate() {
        cards.push_str(&format!(
            r#"<div class="card card-hover card-visited wordwrap job-link"><h2><a href="{path}" title="Job {index}">Job {index}</a></h2><p>Short description</p></div>"#
        ));
        if index < plain_cards {
            cards.push_str(r#"<div class="card"><h2><a href="/promo/">Promo</a></h2></div>"#);
        }
    }
    for _ in job_paths.len()..plain_cards {
        cards.push_str(r#"<div class="card"><h2><a href="/promo/">Promo</a></h2></div>"#);
    }

    let anchors: String = paginator
        .iter()
        .enumerate()
        .map(|(index, text)| format!(r#"<li><a href="?page={index}">{text}</a></li>"#))
        .collect();

    format!(
        r#"<!DOCTYPE html><html><head><title>Jobs</title></head><body>
        <div class="card"><h2><a href="/outside/">Outside the list</a></h2></div>
        <div id="pjax-job-list">{cards}<nav><ul class="pagination hidden-xs">{anchors}</ul></nav></div>
        </body></html>"#
    )
}


/// A job page whose title heading is followed by `paragraphs`, each wrapped in a `<p>`.
pub(crate) fn job_page(title: &str, paragraphs: &[&str]) -> String {
    let paragraphs: String = paragraphs.iter().map(|x| format!("<p>{x}</p>")).collect();
    format!(
        r#"<!DOCTYPE html><html><body><div class="card wordwrap">
        <h1 id="h1-name">{title}</h1>{paragraphs}
        </div></body></html>"#
    )
}
