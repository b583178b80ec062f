use std::time::Duration;

use crawlergo_rs::config::CrawlConfig;
use crawlergo_rs::crawler::Crawler;

use crate::driver_stub::{LinkGraph, StubFactory};

fn fast_config() -> CrawlConfig {
    let mut config = CrawlConfig::new();
    config
        .with_dom_content_loaded_timeout(Duration::from_millis(20))
        .with_before_exit_delay(Duration::from_millis(5))
        .with_tab_run_timeout(Duration::from_secs(2));
    config
}

/// A seed that links to one same-domain page is followed exactly once: the
/// discovered page links back to itself, and that self-link is deduped
/// rather than re-crawled forever (§4.3's frontier loop, §4.2's dedup).
#[tokio::test]
async fn follows_a_discovered_same_domain_link() {
    let graph = LinkGraph::new()
        .with_links("http://example.com/seed", vec!["/found"])
        .with_links("http://example.com/found", vec!["/found"]);
    let factory = StubFactory::new(graph);

    let crawler = Crawler::new(fast_config(), factory).expect("valid config");
    let result = crawler
        .run(&["http://example.com/seed".to_string()])
        .await
        .expect("crawl succeeds");

    assert_eq!(result.all_domains, vec!["example.com".to_string()]);
    assert!(result.sub_domains.is_empty());

    let urls: Vec<&str> = result.all_requests.iter().map(|r| r.url.as_str()).collect();
    assert!(
        urls.iter().any(|u| u.ends_with("/found")),
        "expected the harvested /found link among captured requests, got {urls:?}"
    );
    // Exactly two distinct URLs exist in this graph (seed, found); the
    // final straight-uniqueness sweep must collapse duplicate captures of
    // each down to one.
    assert_eq!(result.all_requests.len(), 2, "got {urls:?}");
}

/// A lone seed is automatically paired with its http<->https counterpart
/// (§6), and both are crawled within the same host scope.
async fn crawl_single_seed_adds_scheme_twin_urls() -> Vec<String> {
    let graph = LinkGraph::new();
    let factory = StubFactory::new(graph);
    let crawler = Crawler::new(fast_config(), factory).expect("valid config");
    let result = crawler
        .run(&["http://example.com/only".to_string()])
        .await
        .expect("crawl succeeds");
    result
        .same_domain_requests
        .iter()
        .map(|r| r.url.as_str().to_string())
        .collect()
}

#[tokio::test]
async fn scheme_twin_is_crawled_alongside_the_seed() {
    let urls = crawl_single_seed_adds_scheme_twin_urls().await;
    assert!(urls.iter().any(|u| u == "http://example.com/only"));
    assert!(urls.iter().any(|u| u == "https://example.com/only"));
}
