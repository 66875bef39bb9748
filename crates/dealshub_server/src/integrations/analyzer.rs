//! Product page preview from static HTML meta tags.
//!
//! # Invariants
//! - Lookups try `name=` before `property=`; the first matching tag wins.
//! - At most five image URLs are returned, resolved against the page origin.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;

use super::{IntegrationError, IntegrationResult, ensure_success, http_client};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_IMAGES: usize = 5;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; DealsHubPreview/1.0)";

static META_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static IMG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attr regex")
});
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePreview {
    pub title: String,
    pub description: String,
    pub original_price: String,
    pub current_price: String,
    pub images: Vec<String>,
    pub category: String,
    pub brand: String,
    pub availability: String,
    pub shipping_cost: String,
}

#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    async fn analyze(&self, url: &str) -> IntegrationResult<PagePreview>;
}

pub struct HttpPageAnalyzer {
    client: Client,
}

impl HttpPageAnalyzer {
    pub fn new() -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(FETCH_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl PageAnalyzer for HttpPageAnalyzer {
    async fn analyze(&self, url: &str) -> IntegrationResult<PagePreview> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(IntegrationError::Rejected(
                "URL must start with http:// or https://".to_string(),
            ));
        }
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;
        let html = ensure_success("page", response)?.text().await?;
        let preview = extract_preview(&html, url);
        info!(
            "event=analyze_url module=analyzer status=ok images={}",
            preview.images.len()
        );
        Ok(preview)
    }
}

/// Builds a preview from raw HTML.
pub fn extract_preview(html: &str, page_url: &str) -> PagePreview {
    let meta = collect_meta(html);
    let lookup = |key: &str| -> Option<String> {
        meta.get(&("name", key.to_string()))
            .or_else(|| meta.get(&("property", key.to_string())))
            .cloned()
            .filter(|value| !value.is_empty())
    };

    let title = lookup("og:title")
        .or_else(|| lookup("twitter:title"))
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .map(|caps| decode_entities(caps[1].trim()))
                .filter(|value| !value.is_empty())
        })
        .unwrap_or_default();
    let description = lookup("description")
        .or_else(|| lookup("og:description"))
        .unwrap_or_default();
    let price = lookup("product:price:amount")
        .or_else(|| lookup("og:price:amount"))
        .unwrap_or_default();
    let availability = lookup("og:availability").unwrap_or_else(|| "In Stock".to_string());

    let images = IMG_TAG_RE
        .find_iter(html)
        .filter_map(|tag| attributes(tag.as_str()).remove("src"))
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(|src| resolve_url(page_url, &src))
        .take(MAX_IMAGES)
        .collect();

    PagePreview {
        title,
        description,
        original_price: price.clone(),
        current_price: price,
        images,
        category: String::new(),
        brand: String::new(),
        availability,
        shipping_cost: "0.00".to_string(),
    }
}

fn collect_meta(html: &str) -> HashMap<(&'static str, String), String> {
    let mut meta = HashMap::new();
    for tag in META_TAG_RE.find_iter(html) {
        let attrs = attributes(tag.as_str());
        let Some(content) = attrs.get("content") else {
            continue;
        };
        for key in ["name", "property"] {
            if let Some(value) = attrs.get(key) {
                meta.entry((key, value.to_ascii_lowercase()))
                    .or_insert_with(|| content.clone());
            }
        }
    }
    meta
}

fn attributes(tag: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(tag)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (caps[1].to_ascii_lowercase(), decode_entities(value.trim()))
        })
        .collect()
}

fn resolve_url(page_url: &str, src: &str) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_string();
    }
    let scheme = if page_url.starts_with("http://") { "http" } else { "https" };
    if let Some(rest) = src.strip_prefix("//") {
        return format!("{scheme}://{rest}");
    }
    let origin_end = page_url
        .find("://")
        .map(|start| {
            let after = start + 3;
            page_url[after..]
                .find('/')
                .map(|slash| after + slash)
                .unwrap_or(page_url.len())
        })
        .unwrap_or(page_url.len());
    let origin = &page_url[..origin_end];
    if src.starts_with('/') {
        format!("{origin}{src}")
    } else {
        let base = page_url
            .rfind('/')
            .filter(|slash| *slash >= origin_end)
            .map(|slash| &page_url[..=slash])
            .unwrap_or(origin);
        if base.ends_with('/') {
            format!("{base}{src}")
        } else {
            format!("{base}/{src}")
        }
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>Fallback Title</title>
        <meta property="og:title" content="Noise Cancelling Headphones">
        <meta name="description" content="Wireless &amp; foldable">
        <meta property="product:price:amount" content="199.99">
        </head><body>
        <img src="/img/a.jpg"><img src='//cdn.shop.test/b.png'>
        <img src="https://cdn.shop.test/c.png"><img src="d.png">
        <img src="data:image/gif;base64,AAAA"><img src="/e.jpg"><img src="/f.jpg">
        </body></html>"#;

    #[test]
    fn preview_prefers_open_graph_tags() {
        let preview = extract_preview(PAGE, "https://shop.test/p/headphones");
        assert_eq!(preview.title, "Noise Cancelling Headphones");
        assert_eq!(preview.description, "Wireless & foldable");
        assert_eq!(preview.original_price, "199.99");
        assert_eq!(preview.current_price, "199.99");
        assert_eq!(preview.availability, "In Stock");
        assert_eq!(preview.shipping_cost, "0.00");
    }

    #[test]
    fn preview_takes_first_five_resolved_images() {
        let preview = extract_preview(PAGE, "https://shop.test/p/headphones");
        assert_eq!(
            preview.images,
            vec![
                "https://shop.test/img/a.jpg",
                "https://cdn.shop.test/b.png",
                "https://cdn.shop.test/c.png",
                "https://shop.test/p/d.png",
                "https://shop.test/e.jpg",
            ]
        );
    }

    #[test]
    fn title_falls_back_to_document_title() {
        let preview = extract_preview(
            "<html><head><title> Plain Page </title></head></html>",
            "https://shop.test",
        );
        assert_eq!(preview.title, "Plain Page");
        assert!(preview.images.is_empty());
        assert_eq!(preview.description, "");
    }
}
