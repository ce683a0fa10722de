use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::builder::ImageSource;

const SEARCH_URL: &str = "https://www.bing.com/images/search";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];
const IMAGE_INDICATORS: [&str; 4] = ["image", "img", "photo", "pic"];

/// Metadata Bing stores as JSON in each result anchor's `m` attribute
#[derive(Deserialize)]
struct ResultMetadata {
    murl: Option<String>,
}

/// Finds hotlinkable images by scraping the Bing Images results page
pub struct BingImageClient {
    client: Client,
}

impl BingImageClient {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub async fn search(&self, query: &str, max_count: usize) -> Result<Vec<String>> {
        if max_count == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = search_url(query);
        info!(query, "searching Bing images");

        for attempt in 0..3 {
            match self.fetch_results_page(&url).await {
                Ok(html) => {
                    let mut urls = parse_image_urls(&html, candidate_limit(max_count));
                    urls.truncate(max_count);
                    info!(count = urls.len(), query, "image URLs found");
                    return Ok(urls);
                }
                Err(e) => {
                    if attempt == 2 {
                        return Err(e.context(format!("Image search failed for '{}'", query)));
                    }
                    warn!(attempt = attempt + 1, error = %e, "Bing request failed, retrying");
                    let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Ok(Vec::new())
    }

    async fn fetch_results_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Bing returned HTTP error: {}", status);
        }

        response.text().await.context("Failed to read response body")
    }
}

#[async_trait]
impl ImageSource for BingImageClient {
    async fn search_images(&self, query: &str, max_count: usize) -> Result<Vec<String>> {
        self.search(query, max_count).await
    }
}

/// Candidates to collect before capping at `max_count`
fn candidate_limit(max_count: usize) -> usize {
    max_count.saturating_mul(2)
}

fn search_url(query: &str) -> String {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect();
    format!(
        "{}?q={}&form=HDRSC2&first=1&tsc=ImageBasicHover",
        SEARCH_URL,
        terms.join("+")
    )
}

/// Up to `max` distinct, valid image URLs from a results page, in page order
pub fn parse_image_urls(html: &str, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a.iusc") {
        Ok(s) => s,
        Err(_) => return vec![],
    };

    let mut urls: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        if urls.len() >= max {
            break;
        }
        let Some(metadata) = element.value().attr("m") else {
            continue;
        };
        let murl = match serde_json::from_str::<ResultMetadata>(metadata) {
            Ok(ResultMetadata { murl: Some(murl) }) => murl,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "skipping result with unreadable metadata");
                continue;
            }
        };

        if murl.starts_with("data:") || murl.contains("base64") {
            continue;
        }
        if is_valid_image_url(&murl) && !urls.contains(&murl) {
            urls.push(murl);
        }
    }

    urls
}

/// http(s) URL with a host that looks like it points at an image
pub fn is_valid_image_url(candidate: &str) -> bool {
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return false;
    }

    let path = parsed.path().to_lowercase();
    let has_extension = IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
    let lowered = candidate.to_lowercase();
    let has_indicator = IMAGE_INDICATORS.iter().any(|word| lowered.contains(word));

    has_extension || has_indicator
}
