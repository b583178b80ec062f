//! The embedded headless-browser driver contract (SPEC_FULL.md §6, §9).
//!
//! No DevTools wire protocol ships in this crate. `BrowserDriver` is the
//! seam a real CDP client (named and shaped after `spider_chrome`'s own
//! event/error vocabulary) would implement; the tab orchestrator is written
//! entirely against this trait.

use async_trait::async_trait;
use hashbrown::HashMap;

use crate::error::CrawlResult;

/// Opaque identifiers the driver hands back; the orchestrator only ever
/// compares or forwards them, never inspects their internals.
pub type RequestId = String;
pub type FrameId = String;
pub type NodeId = u64;

/// A paused outbound network request, as delivered by `Fetch.requestPaused`.
#[derive(Debug, Clone)]
pub struct PausedRequest {
    pub request_id: RequestId,
    pub network_id: Option<RequestId>,
    pub frame_id: FrameId,
    pub is_top_frame: bool,
    pub resource_type: String,
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub post_data: Option<Vec<u8>>,
}

/// `Network.requestWillBeSent`.
#[derive(Debug, Clone)]
pub struct RequestWillBeSent {
    pub request_id: RequestId,
    pub loader_id: RequestId,
    pub frame_id: FrameId,
    pub document_url: String,
    pub resource_type: String,
}

/// `Network.responseReceived`.
#[derive(Debug, Clone)]
pub struct ResponseReceived {
    pub request_id: RequestId,
    pub mime_type: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
}

/// `Network.responseReceivedExtraInfo`: carries the raw status line text so
/// the orchestrator can parse the 3-digit status itself (§4.1.3).
#[derive(Debug, Clone)]
pub struct ResponseReceivedExtraInfo {
    pub request_id: RequestId,
    pub raw_headers_text: String,
}

/// `Fetch.authRequired`.
#[derive(Debug, Clone)]
pub struct AuthRequired {
    pub request_id: RequestId,
    pub realm: String,
}

/// A runtime binding invocation (`addLink`/`Test`, §4.1.9).
#[derive(Debug, Clone)]
pub struct BindingCalled {
    pub name: String,
    pub payload: String,
}

/// Every driver-produced event the tab state machine reacts to.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    RequestPaused(PausedRequest),
    RequestWillBeSent(RequestWillBeSent),
    ResponseReceived(ResponseReceived),
    ResponseReceivedExtraInfo(ResponseReceivedExtraInfo),
    AuthRequired(AuthRequired),
    DomContentEventFired,
    LoadEventFired,
    JavascriptDialogOpening { message: String },
    BindingCalled(BindingCalled),
}

/// Overrides applied when continuing a paused request (§4.1.2's
/// host-binding rewrite and navigation-override cases).
#[derive(Debug, Clone, Default)]
pub struct ContinueOverrides {
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub post_data: Option<Vec<u8>>,
}

/// A DOM node's full attribute set, as returned by `AttributesAll`.
pub type NodeAttributes = HashMap<String, String>;

/// A headless-browser tab driver. One `BrowserDriver` instance corresponds
/// to one open tab; the tab orchestrator holds it for the tab's lifetime.
///
/// No method here does any I/O in this crate — every implementation is a
/// real CDP/WebDriver transport supplied by the embedding application.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Enable the runtime/network/fetch (with auth interception) domains
    /// and begin navigation, returning once the navigate command is
    /// acknowledged (not once the page has loaded).
    async fn navigate(&self, url: &str, method: &str, headers: &HashMap<String, String>, body: Option<&[u8]>) -> CrawlResult<()>;

    /// Block until the next driver event, or `None` if the tab's
    /// connection has closed.
    async fn next_event(&self) -> Option<DriverEvent>;

    async fn continue_request(&self, request_id: &RequestId, overrides: Option<ContinueOverrides>) -> CrawlResult<()>;
    async fn fail_request(&self, request_id: &RequestId, reason: &str) -> CrawlResult<()>;
    async fn fulfill_request(
        &self,
        request_id: &RequestId,
        status: u16,
        body: Option<Vec<u8>>,
        headers: Option<HashMap<String, String>>,
    ) -> CrawlResult<()>;
    async fn continue_with_auth(&self, request_id: &RequestId, username: &str, password: &str) -> CrawlResult<()>;

    /// Fetch a response body already received by the network domain, used
    /// for response-body URL harvesting (§4.1.6).
    async fn get_response_body(&self, request_id: &RequestId) -> CrawlResult<String>;

    async fn evaluate(&self, expression: &str) -> CrawlResult<String>;
    async fn query_selector_all(&self, selector: &str) -> CrawlResult<Vec<NodeId>>;
    async fn attributes_all(&self, node: NodeId) -> CrawlResult<NodeAttributes>;
    async fn set_attribute_value(&self, node: NodeId, name: &str, value: &str) -> CrawlResult<()>;
    async fn send_keys(&self, node: NodeId, text: &str) -> CrawlResult<()>;
    async fn click(&self, node: NodeId) -> CrawlResult<()>;
    async fn submit(&self, node: NodeId) -> CrawlResult<()>;

    /// Registers a script that runs before every document on the page,
    /// used to install the DOM mutation observer and the two bindings.
    async fn add_script_to_evaluate_on_new_document(&self, script: &str) -> CrawlResult<()>;
    async fn add_binding(&self, name: &str) -> CrawlResult<()>;
    async fn set_extra_http_headers(&self, headers: &HashMap<String, String>) -> CrawlResult<()>;

    /// Tear the tab down; idempotent.
    async fn close(&self) -> CrawlResult<()>;
}

/// Opens a fresh tab against the shared browser context. One
/// `BrowserDriver` per call; tab creation is serialized by a browser-level
/// mutex inside the implementation (§5's "Shared resources").
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open_tab(&self) -> CrawlResult<Box<dyn BrowserDriver>>;
}
