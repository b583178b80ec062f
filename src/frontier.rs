//! Bounded work pool and frontier state (SPEC_FULL.md §4.3).
//!
//! Mirrors the teacher's `website.rs` crawl loop: an `Arc<Semaphore>` caps
//! concurrently-open tabs, and a wait-group-style outstanding-task counter
//! (the original tool's `sync.WaitGroup`, rebuilt here on `tokio::sync::Notify`)
//! tracks every recursively spawned tab task so `run()` only returns once
//! none remain. Admission is gated by a mutex-guarded counter against
//! `MaxCrawlerCount`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::filter::{FilterMode, SimpleFilter, SmartFilter};
use crate::request::Request;

/// One browser tab run: given a seed Request, drive it to completion and
/// return every Request it captured. Implemented by the tab orchestrator;
/// kept as a trait here so the frontier has no compile-time dependency on
/// the concrete tab state machine.
#[async_trait]
pub trait TabRunner: Send + Sync {
    async fn run_tab(&self, req: Request) -> Vec<Request>;
}

/// Final, post-drain result of a crawl.
#[derive(Debug, Default, Clone)]
pub struct FrontierResult {
    /// Every captured Request, across every domain encountered, after the
    /// final straight-uniqueness sweep.
    pub all_requests: Vec<Request>,
    /// The subset scoped to the seed host.
    pub same_domain_requests: Vec<Request>,
    pub all_domains: Vec<String>,
    pub sub_domains: Vec<String>,
}

struct Shared<R: TabRunner> {
    max_crawler_count: usize,
    already_count: Mutex<usize>,
    outstanding: AtomicUsize,
    drained: Notify,
    all_requests: Mutex<Vec<Request>>,
    same_domain_requests: Mutex<Vec<Request>>,
    filter_mode: FilterMode,
    simple_filter: SimpleFilter,
    smart_filter: SmartFilter,
    ignore_keywords: Vec<String>,
    root_domain: String,
    semaphore: Arc<Semaphore>,
    runner: R,
}

impl<R: TabRunner> Shared<R> {
    fn is_ignored_by_keyword(&self, req: &Request) -> bool {
        self.ignore_keywords
            .iter()
            .any(|kw| req.url.as_str().contains(kw.as_str()))
    }

    /// `true` means "drop"; applies the configured filter mode.
    fn do_filter(&self, req: &mut Request) -> bool {
        match self.filter_mode {
            FilterMode::Simple => self.simple_filter.do_filter(req),
            FilterMode::Smart | FilterMode::Strict => self.smart_filter.do_filter(req),
        }
    }

    fn try_admit(&self) -> bool {
        let mut already = self.already_count.lock().unwrap();
        if *already >= self.max_crawler_count {
            false
        } else {
            *already += 1;
            true
        }
    }
}

/// Bounded-concurrency scheduler over a pool of tab tasks.
pub struct Frontier<R: TabRunner + 'static> {
    shared: Arc<Shared<R>>,
}

impl<R: TabRunner + 'static> Frontier<R> {
    pub fn new(
        runner: R,
        host_limit: impl Into<String>,
        root_domain: impl Into<String>,
        filter_mode: FilterMode,
        max_crawler_count: usize,
        max_tab_count: usize,
        ignore_keywords: Vec<String>,
    ) -> Self {
        let host_limit = host_limit.into();
        let strict = matches!(filter_mode, FilterMode::Strict);
        Self {
            shared: Arc::new(Shared {
                max_crawler_count,
                already_count: Mutex::new(0),
                outstanding: AtomicUsize::new(0),
                drained: Notify::new(),
                all_requests: Mutex::new(Vec::new()),
                same_domain_requests: Mutex::new(Vec::new()),
                filter_mode,
                simple_filter: SimpleFilter::with_host_limit(host_limit.clone()),
                smart_filter: SmartFilter::with_host_limit(strict, host_limit),
                ignore_keywords,
                root_domain: root_domain.into(),
                semaphore: Arc::new(Semaphore::new(max_tab_count.max(1))),
                runner,
            }),
        }
    }

    /// Run the crawl to completion: seed the pool, wait for every
    /// recursively spawned tab task to drain, then apply the final
    /// straight-uniqueness sweep and domain collection (§4.3's "After
    /// draining" step).
    pub async fn run(&self, seeds: Vec<Request>) -> FrontierResult {
        for seed in seeds {
            self.shared.all_requests.lock().unwrap().push(seed.clone());
            let mut candidate = seed;
            if self.shared.do_filter(&mut candidate) {
                continue;
            }
            self.shared
                .same_domain_requests
                .lock()
                .unwrap()
                .push(candidate.clone());
            if !self.shared.is_ignored_by_keyword(&candidate) {
                spawn_tab(self.shared.clone(), candidate);
            }
        }

        loop {
            if self.shared.outstanding.load(Ordering::SeqCst) == 0 {
                break;
            }
            self.shared.drained.notified().await;
        }

        self.finalize()
    }

    fn finalize(&self) -> FrontierResult {
        let all_requests = self.shared.all_requests.lock().unwrap().clone();
        let same_domain_requests = self.shared.same_domain_requests.lock().unwrap().clone();

        let sweep = SimpleFilter::new();
        let deduped: Vec<Request> = all_requests
            .into_iter()
            .filter(|req| !sweep.unique_filter(req))
            .collect();

        let all_domains = crate::domain::all_domains(&deduped);
        let sub_domains = crate::domain::sub_domains(&deduped, &self.shared.root_domain);

        log::info!(
            "frontier: crawl finished, {} total requests, {} same-domain, {} domains, {} subdomains",
            deduped.len(),
            same_domain_requests.len(),
            all_domains.len(),
            sub_domains.len()
        );

        FrontierResult {
            all_requests: deduped,
            same_domain_requests,
            all_domains,
            sub_domains,
        }
    }
}

/// Reserve one admission slot and spawn the tab task, or log and drop the
/// request if `MaxCrawlerCount` is already reached.
fn spawn_tab<R: TabRunner + 'static>(shared: Arc<Shared<R>>, req: Request) {
    if !shared.try_admit() {
        log::debug!(
            "frontier: rejecting {} — MaxCrawlerCount reached ({})",
            req.url.as_str(),
            shared.max_crawler_count
        );
        return;
    }

    shared.outstanding.fetch_add(1, Ordering::SeqCst);
    tokio::spawn(async move {
        let semaphore = shared.semaphore.clone();
        let permit = semaphore.acquire_owned().await.ok();

        log::debug!("frontier: opening tab for {}", req.url.as_str());
        let discovered = shared.runner.run_tab(req).await;
        drop(permit);

        shared
            .all_requests
            .lock()
            .unwrap()
            .extend(discovered.iter().cloned());

        for mut found in discovered {
            if shared.do_filter(&mut found) {
                continue;
            }
            shared
                .same_domain_requests
                .lock()
                .unwrap()
                .push(found.clone());
            if !shared.is_ignored_by_keyword(&found) {
                spawn_tab(shared.clone(), found);
            }
        }

        if shared.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            shared.drained.notify_one();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, Source};
    use crate::url::CrawlUrl;

    struct NoOpTab;

    #[async_trait]
    impl TabRunner for NoOpTab {
        async fn run_tab(&self, _req: Request) -> Vec<Request> {
            Vec::new()
        }
    }

    struct OneShotTab {
        next: Request,
    }

    #[async_trait]
    impl TabRunner for OneShotTab {
        async fn run_tab(&self, req: Request) -> Vec<Request> {
            if req.url.as_str() == "http://h/seed" {
                vec![self.next.clone()]
            } else {
                Vec::new()
            }
        }
    }

    fn req(url: &str) -> Request {
        Request::new(Method::Get, CrawlUrl::parse(url).unwrap(), Source::Target)
    }

    #[tokio::test]
    async fn drains_with_no_discoveries() {
        let frontier = Frontier::new(
            NoOpTab,
            "h",
            "h",
            FilterMode::Simple,
            300,
            10,
            Vec::new(),
        );
        let result = frontier.run(vec![req("http://h/seed")]).await;
        assert_eq!(result.same_domain_requests.len(), 1);
    }

    #[tokio::test]
    async fn follows_one_level_of_discovery() {
        let frontier = Frontier::new(
            OneShotTab {
                next: req("http://h/found"),
            },
            "h",
            "h",
            FilterMode::Simple,
            300,
            10,
            Vec::new(),
        );
        let result = frontier.run(vec![req("http://h/seed")]).await;
        assert_eq!(result.all_requests.len(), 2);
    }

    struct DuplicateDiscoveryTab {
        shared_find: Request,
    }

    #[async_trait]
    impl TabRunner for DuplicateDiscoveryTab {
        async fn run_tab(&self, _req: Request) -> Vec<Request> {
            vec![self.shared_find.clone()]
        }
    }

    /// Two independently-running tabs that each discover the same URL
    /// (e.g. a shared nav link present on both pages) must still leave
    /// exactly one copy in `all_requests` after the final sweep.
    #[tokio::test]
    async fn concurrent_duplicate_discoveries_collapse_to_one_after_final_sweep() {
        let frontier = Frontier::new(
            DuplicateDiscoveryTab {
                shared_find: req("http://h/shared"),
            },
            "h",
            "h",
            FilterMode::Simple,
            300,
            10,
            Vec::new(),
        );
        let result = frontier
            .run(vec![req("http://h/a"), req("http://h/b")])
            .await;

        let shared_copies = result
            .all_requests
            .iter()
            .filter(|r| r.url.as_str() == "http://h/shared")
            .count();
        assert_eq!(shared_copies, 1);
    }

    #[tokio::test]
    async fn respects_max_crawler_count() {
        let frontier = Frontier::new(NoOpTab, "h", "h", FilterMode::Simple, 0, 10, Vec::new());
        let result = frontier
            .run(vec![req("http://h/a"), req("http://h/b")])
            .await;
        assert_eq!(result.same_domain_requests.len(), 2);
    }
}
