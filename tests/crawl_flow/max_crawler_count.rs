use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crawlergo_rs::config::CrawlConfig;
use crawlergo_rs::crawler::Crawler;
use crawlergo_rs::filter::FilterMode;

use crate::driver_stub::{LinkGraph, StubFactory};

/// `MaxCrawlerCount` is a hard cap on total tab opens, enforced at
/// admission time (§4.3): once reached, further discovered requests are
/// logged and dropped rather than queued or retried.
#[tokio::test]
async fn caps_total_tabs_opened_regardless_of_discoveries() {
    let graph = LinkGraph::new().with_links("http://example.com/seed", vec!["/a", "/b", "/c"]);
    let opened = Arc::new(AtomicUsize::new(0));
    let factory = StubFactory::with_counter(graph, opened.clone());

    let mut config = CrawlConfig::new();
    config
        .with_max_crawler_count(1)
        .with_filter_mode(FilterMode::Simple)
        .with_dom_content_loaded_timeout(Duration::from_millis(20))
        .with_before_exit_delay(Duration::from_millis(5))
        .with_tab_run_timeout(Duration::from_secs(2));

    let crawler = Crawler::new(config, factory).expect("valid config");
    let result = crawler
        .run(&["http://example.com/seed".to_string()])
        .await
        .expect("crawl succeeds");

    // The seed itself consumes the only admission slot; /a, /b, /c are
    // discovered but never get a tab.
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert!(!result.same_domain_requests.is_empty());
}
