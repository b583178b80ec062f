//! Dictionary path fuzzing (SPEC_FULL.md §6), grounded on
//! `expression.go`'s `DoDictRequestFuzz`/`DoHttpRequest`.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::http_client::HttpClient;
use crate::request::{Method, Request, Source};

/// Compact built-in dictionary, standing in for the original tool's larger
/// shipped wordlist; a custom dictionary file may override this via
/// `FuzzDictPath`.
pub const DEFAULT_FUZZ_DICT: &[&str] = &[
    "admin", "login", "api", "backup", "config", "console", "debug", "test", "static",
    "robots.txt", "sitemap.xml", ".git/config", ".env", "uploads", "tmp", "swagger.json",
];

const FUZZ_CONCURRENCY: usize = 20;

/// Probe `<scheme>://<host>/<path>` for every entry in `dict` relative to
/// `seed.url`'s host; a path survives if it returns 2xx, or 301 with a
/// `Location` host matching the seed host. Survivors become GET Requests
/// tagged `PathFuzz`.
pub async fn discover(client: Arc<HttpClient>, seed: &Request, dict: &[String]) -> Vec<Request> {
    let semaphore = Arc::new(Semaphore::new(FUZZ_CONCURRENCY));
    let mut join_set = JoinSet::new();
    let scheme = seed.url.scheme().to_string();
    let host = seed.url.host().to_string();
    let headers: HashMap<String, String> = seed
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.clone()))
        .collect();

    for raw_path in dict {
        let path = raw_path.trim_start_matches('/').trim_end().to_string();
        if path.is_empty() {
            continue;
        }
        let client = client.clone();
        let semaphore = semaphore.clone();
        let scheme = scheme.clone();
        let host = host.clone();
        let headers = headers.clone();

        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            let url = format!("{scheme}://{host}/{path}");
            let response = client.get(&url, &headers).await.ok()?;
            if response.is_success() {
                Some(url)
            } else if response.status == 301 {
                let location = response.location()?;
                let redirect_host = crate::url::CrawlUrl::parse(location).ok().map(|u| u.host().to_string());
                if redirect_host.as_deref() == Some(host.as_str()) {
                    Some(url)
                } else {
                    None
                }
            } else {
                None
            }
        });
    }

    let mut survivors = HashSet::new();
    while let Some(outcome) = join_set.join_next().await {
        if let Ok(Some(url)) = outcome {
            survivors.insert(url);
        }
    }

    survivors
        .into_iter()
        .filter_map(|url| crate::url::CrawlUrl::parse(&url).ok())
        .map(|url| Request::new(Method::Get, url, Source::PathFuzz))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dict_has_no_leading_slashes_or_blanks() {
        assert!(!DEFAULT_FUZZ_DICT.is_empty());
        for entry in DEFAULT_FUZZ_DICT {
            assert!(!entry.is_empty());
            assert!(!entry.starts_with('/'));
        }
    }
}
