use std::time::Duration;

use crawlergo_rs::config::CrawlConfig;
use crawlergo_rs::crawler::Crawler;
use crawlergo_rs::filter::FilterMode;

use crate::driver_stub::{LinkGraph, StubFactory};

fn graph_with_two_numeric_ids() -> LinkGraph {
    LinkGraph::new().with_links("http://example.com/seed", vec!["/?id=1", "/?id=2"])
}

fn config_with_mode(mode: FilterMode) -> CrawlConfig {
    let mut config = CrawlConfig::new();
    config
        .with_filter_mode(mode)
        .with_dom_content_loaded_timeout(Duration::from_millis(20))
        .with_before_exit_delay(Duration::from_millis(5))
        .with_tab_run_timeout(Duration::from_secs(2));
    config
}

/// Smart mode collapses a second numeric `id` value into the same
/// pseudo-static identity as the first (§4.2.5's `{{number}}` marking), so
/// only one of the two discovered links is actually crawled.
#[tokio::test]
async fn smart_mode_collapses_numeric_param_siblings() {
    let factory = StubFactory::new(graph_with_two_numeric_ids());
    let crawler = Crawler::new(config_with_mode(FilterMode::Smart), factory).expect("valid config");
    let result = crawler
        .run(&["http://example.com/seed".to_string()])
        .await
        .expect("crawl succeeds");

    let id_variants = result
        .same_domain_requests
        .iter()
        .filter(|r| r.url.raw_query().starts_with("id="))
        .count();
    assert_eq!(id_variants, 1, "{:?}", result.same_domain_requests.iter().map(|r| r.url.as_str()).collect::<Vec<_>>());
}

/// Simple mode only dedups exact duplicates, so both numeric-id siblings
/// survive as distinct requests.
#[tokio::test]
async fn simple_mode_keeps_numeric_param_siblings_distinct() {
    let factory = StubFactory::new(graph_with_two_numeric_ids());
    let crawler = Crawler::new(config_with_mode(FilterMode::Simple), factory).expect("valid config");
    let result = crawler
        .run(&["http://example.com/seed".to_string()])
        .await
        .expect("crawl succeeds");

    let id_variants = result
        .same_domain_requests
        .iter()
        .filter(|r| r.url.raw_query().starts_with("id="))
        .count();
    assert_eq!(id_variants, 2, "{:?}", result.same_domain_requests.iter().map(|r| r.url.as_str()).collect::<Vec<_>>());
}
