//! Top-level crawl entrypoint (SPEC_FULL.md §2, §6), wiring the seed
//! loader, discovery helpers, and frontier together the way the teacher's
//! `website.rs` wires its crawl loop around a single `Configuration`.

use std::sync::Arc;

use crate::config::CrawlConfig;
use crate::discovery::{fuzz, robots, sitemap, HttpClient};
use crate::driver::DriverFactory;
use crate::error::{CrawlError, CrawlResult};
use crate::frontier::{Frontier, FrontierResult};
use crate::request::{Method, Request, Source};
use crate::tab::TabOrchestrator;
use crate::url::CrawlUrl;

/// Runs one crawl, from a set of seed URLs to a drained [`FrontierResult`].
/// Generic over the driver factory so the engine never depends on a
/// concrete CDP/WebDriver transport (§9).
pub struct Crawler<F: DriverFactory + 'static> {
    config: Arc<CrawlConfig>,
    factory: Arc<F>,
    http_client: Arc<HttpClient>,
}

impl<F: DriverFactory + 'static> Crawler<F> {
    pub fn new(mut config: CrawlConfig, factory: F) -> CrawlResult<Self> {
        let http_client = HttpClient::new(config.proxy.as_deref())?;
        merge_extra_headers_string(&mut config)?;
        Ok(Self {
            config: Arc::new(config),
            factory: Arc::new(factory),
            http_client: Arc::new(http_client),
        })
    }

    /// Crawl starting from `seed_urls` (§2). A lone seed is automatically
    /// paired with its http<->https counterpart (§6); multiple seeds are
    /// used as given, with no twin added.
    pub async fn run(&self, seed_urls: &[String]) -> CrawlResult<FrontierResult> {
        let mut seeds = self.build_seed_requests(seed_urls)?;
        seeds.extend(self.expand_seeds(&seeds).await);

        let root_domain = seeds.first().map(|r| r.url.root_domain()).unwrap_or_default();
        let host_limit = seeds.first().map(|r| r.url.host().to_string()).unwrap_or_default();

        let runner = TabOrchestrator::new(self.config.clone(), self.factory.clone(), self.http_client.clone());
        let frontier = Frontier::new(
            runner,
            host_limit,
            root_domain,
            self.config.filter_mode,
            self.config.max_crawler_count,
            self.config.max_tab_count,
            self.config.ignore_keywords.clone(),
        );

        log::info!("crawler: starting with {} seed(s)", seeds.len());
        Ok(frontier.run(seeds).await)
    }

    fn build_seed_requests(&self, seed_urls: &[String]) -> CrawlResult<Vec<Request>> {
        let mut seeds = Vec::new();
        for raw in seed_urls {
            let url = CrawlUrl::parse(raw)?;
            seeds.push(Request::new(Method::Get, url, Source::Target));
        }

        if seeds.len() == 1 {
            if let Some(twin) = scheme_twin(&seeds[0].url) {
                seeds.push(Request::new(Method::Get, twin, Source::Target));
            }
        }
        Ok(seeds)
    }

    async fn expand_seeds(&self, seeds: &[Request]) -> Vec<Request> {
        let Some(primary) = seeds.first() else {
            return Vec::new();
        };
        let mut discovered = Vec::new();

        if self.config.path_form_robots {
            discovered.extend(robots::discover(&self.http_client, primary).await);
        }
        if self.config.path_form_sitemap {
            discovered.extend(sitemap::discover(&self.http_client, primary).await);
        }
        if self.config.path_fuzz {
            let dict = self.fuzz_dictionary();
            discovered.extend(fuzz::discover(self.http_client.clone(), primary, &dict).await);
        }
        discovered
    }

    /// A custom dictionary file, one path per line, or the built-in
    /// default when absent or unreadable (§6).
    fn fuzz_dictionary(&self) -> Vec<String> {
        if let Some(path) = &self.config.fuzz_dict_path {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    let lines: Vec<String> = contents
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect();
                    if !lines.is_empty() {
                        return lines;
                    }
                }
                Err(e) => log::warn!("crawler: could not read fuzz dictionary {path}: {e}"),
            }
        }
        fuzz::DEFAULT_FUZZ_DICT.iter().map(|s| s.to_string()).collect()
    }
}

/// Parses `ExtraHeadersString` (a JSON object of header name -> value) and
/// merges it into `extra_headers`, entries from the string taking
/// precedence. Fatal on invalid JSON (§7's `CrawlError::Config`).
fn merge_extra_headers_string(config: &mut CrawlConfig) -> CrawlResult<()> {
    let Some(raw) = config.extra_headers_string.as_deref() else {
        return Ok(());
    };
    let parsed: std::collections::HashMap<String, String> = serde_json::from_str(raw)
        .map_err(|e| CrawlError::Config(format!("invalid ExtraHeadersString: {e}")))?;
    config.extra_headers.extend(parsed);
    Ok(())
}

/// The http<->https counterpart of `url`, or `None` for any other scheme.
fn scheme_twin(url: &CrawlUrl) -> Option<CrawlUrl> {
    let twin_scheme = match url.scheme() {
        "http" => "https",
        "https" => "http",
        _ => return None,
    };
    let swapped = url
        .as_str()
        .replacen(&format!("{}://", url.scheme()), &format!("{twin_scheme}://"), 1);
    CrawlUrl::parse(&swapped).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_twin_flips_http_and_https() {
        let http = CrawlUrl::parse("http://h/a").unwrap();
        assert_eq!(scheme_twin(&http).unwrap().as_str(), "https://h/a");

        let https = CrawlUrl::parse("https://h/a").unwrap();
        assert_eq!(scheme_twin(&https).unwrap().as_str(), "http://h/a");
    }

    #[test]
    fn scheme_twin_none_for_other_schemes() {
        let ftp = CrawlUrl::parse("ftp://h/a");
        assert!(ftp.is_err() || scheme_twin(&ftp.unwrap()).is_none());
    }

    #[test]
    fn extra_headers_string_merges_and_overrides() {
        let mut config = CrawlConfig::new();
        config.extra_headers.insert("X-A".to_string(), "one".to_string());
        config.with_extra_headers_string(r#"{"X-A":"two","X-B":"three"}"#);
        merge_extra_headers_string(&mut config).unwrap();
        assert_eq!(config.extra_headers.get("X-A").map(String::as_str), Some("two"));
        assert_eq!(config.extra_headers.get("X-B").map(String::as_str), Some("three"));
    }

    #[test]
    fn extra_headers_string_invalid_json_is_config_error() {
        let mut config = CrawlConfig::new();
        config.with_extra_headers_string("not json");
        assert!(matches!(
            merge_extra_headers_string(&mut config),
            Err(CrawlError::Config(_))
        ));
    }
}
