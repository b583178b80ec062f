//! Per-tab state (SPEC_FULL.md §3's `TabState`), non-persistent and owned
//! by exactly one tab task for its whole lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use hashbrown::{HashMap, HashSet};
use tokio::sync::Notify;

use crate::request::Request;

/// The tab lifecycle state machine (§4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabPhase {
    Opened,
    Navigating,
    DomReady,
    Triggered,
    Draining,
    Closed,
}

/// Per-tab, non-persistent state (§3).
pub struct TabState {
    pub root_domain: String,
    navigate_request: Mutex<Request>,
    pub extra_headers: HashMap<String, String>,
    /// Signalled once, the first time DOMContentLoaded/Load fires
    /// (§4.1.1's Navigating -> DomReady transition).
    pub dom_ready: Notify,

    /// Set exactly once, by the first `RequestWillBeSent` whose
    /// `request_id == loader_id` and whose type is `Document` (§4.1.1).
    pub top_frame_id: Mutex<Option<String>>,
    pub loader_id: Mutex<Option<String>>,
    /// The network id correlated with the navigate request, used to match
    /// `ResponseReceivedExtraInfo` events against the navigation (§4.1.3).
    pub nav_network_id: Mutex<Option<String>>,

    pub page_charset: Mutex<String>,
    pub found_redirection: AtomicBool,
    pub doc_body_node_id: Mutex<Option<u64>>,

    /// Unordered accumulator of every captured Request, serialized by this
    /// tab-local lock (§5's "Ordering guarantees").
    result_list: Mutex<Vec<Request>>,
    /// Hits from `CustomDefinedRegex` patterns applied to response bodies
    /// (§4.1.6). Reported out alongside the crawl result, never turned
    /// into a Request and fed back into the frontier.
    custom_regex_hits: Mutex<Vec<String>>,
    /// `href` values already clicked, so the Triggered phase never clicks
    /// the same synthetic anchor twice.
    pub href_click: Mutex<HashSet<String>>,

    /// Idempotence flag: DOMContentLoaded and Load each attempt the
    /// Navigating -> DomReady transition, but only the first one wins.
    pub dom_content_loaded_run: AtomicBool,
    pub phase: Mutex<TabPhase>,
}

impl TabState {
    pub fn new(navigate_request: Request, extra_headers: HashMap<String, String>) -> Self {
        let root_domain = navigate_request.url.root_domain();
        Self {
            root_domain,
            navigate_request: Mutex::new(navigate_request),
            extra_headers,
            dom_ready: Notify::new(),
            top_frame_id: Mutex::new(None),
            loader_id: Mutex::new(None),
            nav_network_id: Mutex::new(None),
            page_charset: Mutex::new(String::new()),
            found_redirection: AtomicBool::new(false),
            doc_body_node_id: Mutex::new(None),
            result_list: Mutex::new(Vec::new()),
            custom_regex_hits: Mutex::new(Vec::new()),
            href_click: Mutex::new(HashSet::new()),
            dom_content_loaded_run: AtomicBool::new(false),
            phase: Mutex::new(TabPhase::Opened),
        }
    }

    /// A clone of the current navigate Request, reflecting any
    /// `redirection` flag flips applied so far (§4.1.2).
    pub fn nav(&self) -> Request {
        self.navigate_request.lock().unwrap().clone()
    }

    pub fn nav_url(&self) -> crate::url::CrawlUrl {
        self.navigate_request.lock().unwrap().url.clone()
    }

    pub fn set_nav_redirection(&self, redirection: bool) {
        self.navigate_request.lock().unwrap().redirection = redirection;
    }

    pub fn record(&self, req: Request) {
        self.result_list.lock().unwrap().push(req);
    }

    pub fn record_many(&self, reqs: impl IntoIterator<Item = Request>) {
        self.result_list.lock().unwrap().extend(reqs);
    }

    /// Drain every captured Request, leaving the accumulator empty. Called
    /// once, when the tab transitions to Closed and merges into the
    /// frontier (§3's Lifecycle).
    pub fn drain_results(&self) -> Vec<Request> {
        std::mem::take(&mut *self.result_list.lock().unwrap())
    }

    pub fn record_custom_regex_hit(&self, hit: String) {
        self.custom_regex_hits.lock().unwrap().push(hit);
    }

    pub fn drain_custom_regex_hits(&self) -> Vec<String> {
        std::mem::take(&mut *self.custom_regex_hits.lock().unwrap())
    }

    pub fn set_phase(&self, phase: TabPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    pub fn phase(&self) -> TabPhase {
        *self.phase.lock().unwrap()
    }

    /// `true` the first time this is called (i.e. the caller won the race
    /// to drive Navigating -> DomReady); `false` on every subsequent call.
    pub fn try_start_dom_content_loaded(&self) -> bool {
        self.dom_content_loaded_run
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn set_navigation_ids(&self, loader_id: String, frame_id: String, network_id: String) {
        let mut loader = self.loader_id.lock().unwrap();
        if loader.is_some() {
            return;
        }
        *loader = Some(loader_id);
        *self.top_frame_id.lock().unwrap() = Some(frame_id);
        *self.nav_network_id.lock().unwrap() = Some(network_id);
    }

    pub fn is_top_frame(&self, frame_id: &str) -> bool {
        self.top_frame_id
            .lock()
            .unwrap()
            .as_deref()
            .map(|id| id == frame_id)
            .unwrap_or(false)
    }

    pub fn is_navigation_network_id(&self, network_id: &str) -> bool {
        self.loader_id
            .lock()
            .unwrap()
            .as_deref()
            .map(|id| id == network_id)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, Source};
    use crate::url::CrawlUrl;

    fn nav(url: &str) -> Request {
        Request::new(Method::Get, CrawlUrl::parse(url).unwrap(), Source::Target)
    }

    #[test]
    fn dom_content_loaded_runs_at_most_once() {
        let state = TabState::new(nav("http://h/"), HashMap::new());
        assert!(state.try_start_dom_content_loaded());
        assert!(!state.try_start_dom_content_loaded());
    }

    #[test]
    fn drain_empties_the_accumulator() {
        let state = TabState::new(nav("http://h/"), HashMap::new());
        state.record(nav("http://h/a"));
        state.record(nav("http://h/b"));
        assert_eq!(state.drain_results().len(), 2);
        assert_eq!(state.drain_results().len(), 0);
    }

    #[test]
    fn root_domain_is_derived_from_navigate_url() {
        let state = TabState::new(nav("http://a.example.com/"), HashMap::new());
        assert_eq!(state.root_domain, "example.com");
    }
}
