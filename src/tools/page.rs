use super::url_guard::validate_url;
use crate::error::{FetchErrorKind, ServiceError};
use crate::models::PageContent;
use crate::tasks::assembler::truncate_chars;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const MAX_REDIRECTS: usize = 10;
pub const MAX_CONTENT_CHARS: usize = 500_000;
/// Bytes of response body read before the rest is discarded.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Elements whose text never counts as readable content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "noscript"];
/// Content roots, most specific first.
const CONTENT_ROOTS: &[&str] = &["main", "article", "body"];

/// Opaque URL → extracted text service.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> PageContent;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    Text,
}

/// Fetches pages over plain HTTP and extracts readable text from HTML.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    timeout: Duration,
    allow_private_hosts: bool,
    max_body_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, allow_private_hosts: bool) -> Self {
        Self {
            timeout,
            allow_private_hosts,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes.max(1);
        self
    }

    async fn fetch_page(&self, url: Url) -> Result<PageContent, ServiceError> {
        let allow_private = self.allow_private_hosts;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .redirect(Policy::custom(move |attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else if validate_url(attempt.url().as_str(), allow_private).is_err() {
                    attempt.stop()
                } else {
                    attempt.follow()
                }
            }))
            .build()?;

        let mut response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("HTTP {} for {}", status.as_u16(), url);
            return Ok(PageContent::failed(
                FetchErrorKind::Status,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase());
        let kind = match body_kind(content_type.as_deref()) {
            Some(kind) => kind,
            None => {
                let ct = content_type.unwrap_or_default();
                warn!("Unsupported content type {:?} for {}", ct, url);
                return Ok(PageContent::failed(
                    FetchErrorKind::Extraction,
                    format!("unsupported content type {}", ct),
                ));
            }
        };

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_body_bytes {
                debug!("Body of {} cut at {} bytes", url, self.max_body_bytes);
                break;
            }
        }
        let body = String::from_utf8_lossy(&body).into_owned();

        // Parsing is CPU-bound; keep it off the task that drives sibling fetches.
        let (title, text) = tokio::task::spawn_blocking(move || match kind {
            BodyKind::Html => extract_readable(&body),
            BodyKind::Text => (None, normalize_lines(&body)),
        })
        .await
        .map_err(|e| ServiceError::Decode(format!("extraction task failed: {}", e)))?;
        let text = truncate_chars(&text, MAX_CONTENT_CHARS).to_string();

        debug!("Fetched {}: {} chars", url, text.chars().count());
        Ok(PageContent::extracted(title, text))
    }
}

/// HTML, other text, XML and JSON are readable; a missing header is taken
/// as HTML. Anything else (PDF, images, archives) is not.
fn body_kind(content_type: Option<&str>) -> Option<BodyKind> {
    let Some(ct) = content_type else {
        return Some(BodyKind::Html);
    };
    let mime = ct.split(';').next().unwrap_or("").trim();
    if mime.contains("html") {
        Some(BodyKind::Html)
    } else if mime.starts_with("text/") || mime.ends_with("xml") || mime.ends_with("json") {
        Some(BodyKind::Text)
    } else {
        None
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> PageContent {
        let target = match validate_url(url, self.allow_private_hosts) {
            Ok(target) => target,
            Err(e) => {
                warn!("Refusing to fetch {}: {}", url, e);
                return PageContent::failed(FetchErrorKind::Blocked, e.to_string());
            }
        };

        match self.fetch_page(target).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Fetch of {} failed: {}", url, e);
                PageContent::failed(FetchErrorKind::from(&e), e.to_string())
            }
        }
    }
}

/// Pulls the document title and the readable text of the main content
/// area out of an HTML page.
pub fn extract_readable(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(element_text))
        .filter(|t| !t.is_empty());

    let root = CONTENT_ROOTS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    // Depth-first in document order; skipped elements prune their subtree.
    let mut raw = String::new();
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                raw.push_str(text);
                raw.push('\n');
            }
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            _ => {
                let children: Vec<_> = node.children().collect();
                stack.extend(children.into_iter().rev());
            }
        }
    }

    (title, normalize_lines(&raw))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
