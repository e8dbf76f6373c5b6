use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use url::Url;
use wm_domain::error::{Error, Result};

use crate::traits::{CrawlOutcome, PageCrawler};

/// Breadth-first link/image discovery over `reqwest`. Per-page failures are
/// folded into `broken_links` rather than aborting the crawl, matching the
/// collaborator contract in spec §6.
pub struct ReqwestCrawler {
    client: reqwest::Client,
}

impl ReqwestCrawler {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for ReqwestCrawler {
    fn default() -> Self {
        Self::new().expect("building the default reqwest client never fails")
    }
}

#[async_trait]
impl PageCrawler for ReqwestCrawler {
    async fn crawl(
        &self,
        start_url: &str,
        max_depth: u32,
        exclude_keywords: &[String],
    ) -> Result<CrawlOutcome> {
        let base = Url::parse(start_url).map_err(|e| Error::Other(format!("invalid start url: {e}")))?;
        let host = base.host_str().map(str::to_owned);

        let mut outcome = CrawlOutcome::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((start_url.to_string(), 0));
        visited.insert(start_url.to_string());

        outcome.has_sitemap = self.probe_sitemap(&base).await;

        while let Some((page_url, depth)) = queue.pop_front() {
            if is_excluded(&page_url, exclude_keywords) {
                continue;
            }

            let body = match self.fetch(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url = %page_url, error = %e, "crawl: page fetch failed");
                    outcome.broken_links.push(page_url.clone());
                    continue;
                }
            };

            outcome.pages.push(page_url.clone());
            if !has_title_and_description(&body) {
                outcome.missing_meta_tags.push(page_url.clone());
            }

            let page_base = Url::parse(&page_url).unwrap_or_else(|_| base.clone());
            for link in extract_attr(&body, "a", "href") {
                let Some(resolved) = resolve(&page_base, &link) else { continue };
                let is_internal = resolved.host_str() == host.as_deref();
                if is_internal {
                    outcome.internal_links += 1;
                    if depth < max_depth && !visited.contains(resolved.as_str()) {
                        visited.insert(resolved.as_str().to_string());
                        queue.push_back((resolved.to_string(), depth + 1));
                    }
                } else {
                    outcome.external_links += 1;
                }
            }

            for img in extract_attr(&body, "img", "src") {
                if let Some(resolved) = resolve(&page_base, &img) {
                    outcome.images.push(resolved.to_string());
                }
            }
        }

        Ok(outcome)
    }
}

impl ReqwestCrawler {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, "website-monitor/1.0")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!("{} responded {}", url, resp.status())));
        }
        resp.text().await.map_err(|e| Error::Http(e.to_string()))
    }

    async fn probe_sitemap(&self, base: &Url) -> bool {
        let Ok(sitemap_url) = base.join("/sitemap.xml") else { return false };
        matches!(
            self.client.get(sitemap_url).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }
}

/// Matches `exclude_keywords` against the page URL's path only (spec §8
/// boundary behavior), consistent with `Website::is_page_excluded` — a
/// keyword appearing only in the host or query string must not exclude the
/// page.
fn is_excluded(url: &str, exclude_keywords: &[String]) -> bool {
    let path = Url::parse(url).map(|u| u.path().to_ascii_lowercase()).unwrap_or_default();
    exclude_keywords.iter().any(|kw| path.contains(&kw.to_ascii_lowercase()))
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok().filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Minimal attribute scraper, in the teacher's hand-rolled-tag-scanning
/// style (no HTML parsing crate pulled in for this).
fn extract_attr(html: &str, tag: &str, attr: &str) -> Vec<String> {
    let mut out = Vec::new();
    let tag_open = format!("<{tag}");
    let mut rest = html;
    while let Some(start) = find_ci(rest, &tag_open) {
        let after = &rest[start + tag_open.len()..];
        let Some(end) = after.find('>') else { break };
        let tag_body = &after[..end];
        if let Some(value) = extract_attr_value(tag_body, attr) {
            out.push(value);
        }
        rest = &after[end + 1..];
    }
    out
}

fn extract_attr_value(tag_body: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=");
    let pos = find_ci(tag_body, &needle)?;
    let after = &tag_body[pos + needle.len()..];
    let quote = after.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value_start = &after[1..];
    let end = value_start.find(quote)?;
    Some(value_start[..end].to_string())
}

fn has_title_and_description(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    lower.contains("<title>") && lower.contains("name=\"description\"")
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack_lower = haystack.to_ascii_lowercase();
    haystack_lower.find(&needle.to_ascii_lowercase())
}
