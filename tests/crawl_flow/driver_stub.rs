//! A [`BrowserDriver`]/[`DriverFactory`] pair that never touches a real
//! browser: `navigate` just remembers the URL it was given, and
//! `query_selector_all`/`attributes_all` report back whatever `href`s a
//! [`LinkGraph`] says that URL's page "contains". This is enough to drive
//! `TabOrchestrator` through a full Navigating -> DomReady -> Triggered ->
//! Draining -> Closed pass (§4.1.1) and exercise its DOM-harvesting path
//! (§4.1.5) without a CDP transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hashbrown::HashMap;

use crawlergo_rs::driver::{
    BrowserDriver, ContinueOverrides, DriverEvent, DriverFactory, NodeAttributes, NodeId, RequestId,
};
use crawlergo_rs::error::CrawlResult;

/// Maps a navigated-to URL (exactly as passed to `navigate`) to the `href`
/// values its page should report via `[href]` attribute harvesting.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph(HashMap<String, Vec<String>>);

impl LinkGraph {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn with_links(mut self, url: impl Into<String>, hrefs: Vec<&str>) -> Self {
        self.0
            .insert(url.into(), hrefs.into_iter().map(str::to_string).collect());
        self
    }
}

pub struct StubDriver {
    graph: Arc<LinkGraph>,
    current_nav: Mutex<String>,
}

impl StubDriver {
    fn new(graph: Arc<LinkGraph>) -> Self {
        Self {
            graph,
            current_nav: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl BrowserDriver for StubDriver {
    async fn navigate(
        &self,
        url: &str,
        _method: &str,
        _headers: &HashMap<String, String>,
        _body: Option<&[u8]>,
    ) -> CrawlResult<()> {
        *self.current_nav.lock().unwrap() = url.to_string();
        Ok(())
    }

    /// No CDP connection backs this driver, so there is never a real event
    /// stream; `drive_phases` alone carries the tab to completion and wins
    /// the `tokio::select!` race in `TabOrchestrator::drive`.
    async fn next_event(&self) -> Option<DriverEvent> {
        std::future::pending::<()>().await;
        None
    }

    async fn continue_request(&self, _request_id: &RequestId, _overrides: Option<ContinueOverrides>) -> CrawlResult<()> {
        Ok(())
    }

    async fn fail_request(&self, _request_id: &RequestId, _reason: &str) -> CrawlResult<()> {
        Ok(())
    }

    async fn fulfill_request(
        &self,
        _request_id: &RequestId,
        _status: u16,
        _body: Option<Vec<u8>>,
        _headers: Option<HashMap<String, String>>,
    ) -> CrawlResult<()> {
        Ok(())
    }

    async fn continue_with_auth(&self, _request_id: &RequestId, _username: &str, _password: &str) -> CrawlResult<()> {
        Ok(())
    }

    async fn get_response_body(&self, _request_id: &RequestId) -> CrawlResult<String> {
        Ok(String::new())
    }

    async fn evaluate(&self, _expression: &str) -> CrawlResult<String> {
        Ok(String::new())
    }

    async fn query_selector_all(&self, selector: &str) -> CrawlResult<Vec<NodeId>> {
        if selector != "[href]" {
            return Ok(Vec::new());
        }
        let nav = self.current_nav.lock().unwrap().clone();
        let count = self.graph.0.get(&nav).map(|hrefs| hrefs.len()).unwrap_or(0);
        Ok((0..count as NodeId).collect())
    }

    async fn attributes_all(&self, node: NodeId) -> CrawlResult<NodeAttributes> {
        let nav = self.current_nav.lock().unwrap().clone();
        let mut attrs = NodeAttributes::new();
        if let Some(hrefs) = self.graph.0.get(&nav) {
            if let Some(href) = hrefs.get(node as usize) {
                attrs.insert("href".to_string(), href.clone());
            }
        }
        Ok(attrs)
    }

    async fn set_attribute_value(&self, _node: NodeId, _name: &str, _value: &str) -> CrawlResult<()> {
        Ok(())
    }

    async fn send_keys(&self, _node: NodeId, _text: &str) -> CrawlResult<()> {
        Ok(())
    }

    async fn click(&self, _node: NodeId) -> CrawlResult<()> {
        Ok(())
    }

    async fn submit(&self, _node: NodeId) -> CrawlResult<()> {
        Ok(())
    }

    async fn add_script_to_evaluate_on_new_document(&self, _script: &str) -> CrawlResult<()> {
        Ok(())
    }

    async fn add_binding(&self, _name: &str) -> CrawlResult<()> {
        Ok(())
    }

    async fn set_extra_http_headers(&self, _headers: &HashMap<String, String>) -> CrawlResult<()> {
        Ok(())
    }

    async fn close(&self) -> CrawlResult<()> {
        Ok(())
    }
}

/// Hands out a fresh [`StubDriver`] per `open_tab` call, all sharing the
/// same [`LinkGraph`], and counts how many tabs were actually opened.
pub struct StubFactory {
    graph: Arc<LinkGraph>,
    opened: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(graph: LinkGraph) -> Self {
        Self::with_counter(graph, Arc::new(AtomicUsize::new(0)))
    }

    /// Like [`Self::new`], but shares `counter` with the caller so the
    /// opened-tab count can still be read after `factory` has been moved
    /// into a `Crawler`.
    pub fn with_counter(graph: LinkGraph, counter: Arc<AtomicUsize>) -> Self {
        Self {
            graph: Arc::new(graph),
            opened: counter,
        }
    }
}

#[async_trait]
impl DriverFactory for StubFactory {
    async fn open_tab(&self) -> CrawlResult<Box<dyn BrowserDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubDriver::new(self.graph.clone())))
    }
}
