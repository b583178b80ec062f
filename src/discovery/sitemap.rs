//! `sitemap.xml` seed expansion (SPEC_FULL.md §6), grounded on
//! `expression.go`'s `Sitemap`/`Sitemap` XML model, parsed with `quick-xml`.

use hashbrown::HashMap;
use serde::Deserialize;

use super::http_client::HttpClient;
use crate::request::{Method, Request, Source};

#[derive(Debug, Deserialize)]
struct UrlEntry {
    loc: String,
}

#[derive(Debug, Deserialize)]
struct SitemapEntry {
    loc: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename = "urlset", default)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename = "sitemapindex", default)]
struct SitemapIndex {
    #[serde(rename = "sitemap", default)]
    sitemaps: Vec<SitemapEntry>,
}

/// Fetch `<site>/sitemap.xml` relative to `seed.url` and return one GET
/// Request per `<url><loc>` and `<sitemap><loc>` entry. Best-effort: any
/// network failure, non-2xx status, or XML parse failure yields an empty
/// list.
pub async fn discover(client: &HttpClient, seed: &Request) -> Vec<Request> {
    let base = seed.url.no_query_url();
    let base = base.strip_suffix('/').unwrap_or(&base);
    let sitemap_url = format!("{base}/sitemap.xml");

    let headers: HashMap<String, String> = seed
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.clone()))
        .collect();

    let response = match client.get(&sitemap_url, &headers).await {
        Ok(resp) if resp.is_success() => resp,
        _ => return Vec::new(),
    };

    let text = String::from_utf8_lossy(&response.body);
    let mut discovered = Vec::new();

    if let Ok(url_set) = quick_xml::de::from_str::<UrlSet>(&text) {
        for entry in url_set.urls {
            if let Ok(url) = seed.url.resolve(entry.loc.trim()) {
                discovered.push(Request::new(Method::Get, url, Source::SitemapXml));
            }
        }
    }
    if let Ok(index) = quick_xml::de::from_str::<SitemapIndex>(&text) {
        for entry in index.sitemaps {
            if let Ok(url) = seed.url.resolve(entry.loc.trim()) {
                discovered.push(Request::new(Method::Get, url, Source::SitemapXml));
            }
        }
    }
    discovered
}
