//! The tab orchestrator (SPEC_FULL.md §4.1): drives one browser tab
//! end-to-end through the lifecycle state machine in §4.1.1, grounded on
//! `browser_tab.go`/`intercept_tab_request.go`/`browser_tab_dom.go`.

pub mod charset;
pub mod dom;
pub mod intercept;
pub mod js;
pub mod state;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hashbrown::HashMap;

use crate::config::CrawlConfig;
use crate::discovery::HttpClient;
use crate::driver::{BrowserDriver, ContinueOverrides, DriverEvent, DriverFactory, PausedRequest};
use crate::error::CrawlResult;
use crate::frontier::TabRunner;
use crate::request::{Method, Request, Source};

use intercept::InterceptDecision;
use state::{TabPhase, TabState};

/// Drives one browser tab end-to-end (§4.1). Implements [`TabRunner`] so
/// the frontier can hold it behind its pool without depending on the
/// concrete state machine.
pub struct TabOrchestrator<F: DriverFactory> {
    config: Arc<CrawlConfig>,
    factory: Arc<F>,
    http_client: Arc<HttpClient>,
    /// Compiled once from `config.custom_defined_regex`; invalid patterns
    /// are logged and skipped rather than failing tab construction.
    custom_regexes: Vec<regex::Regex>,
}

impl<F: DriverFactory> TabOrchestrator<F> {
    pub fn new(config: Arc<CrawlConfig>, factory: Arc<F>, http_client: Arc<HttpClient>) -> Self {
        let custom_regexes = config
            .custom_defined_regex
            .iter()
            .filter_map(|pattern| match regex::Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("tab: skipping invalid CustomDefinedRegex {pattern:?}: {e}");
                    None
                }
            })
            .collect();
        Self {
            config,
            factory,
            http_client,
            custom_regexes,
        }
    }

    async fn run_one(&self, nav: Request) -> Vec<Request> {
        let driver = match self.factory.open_tab().await {
            Ok(d) => d,
            Err(e) => {
                log::warn!("tab: failed to open a tab for {}: {e}", nav.url.as_str());
                return vec![nav];
            }
        };
        let driver: Arc<dyn BrowserDriver> = Arc::from(driver);

        let extra_headers: HashMap<String, String> = self
            .config
            .extra_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let state = Arc::new(TabState::new(nav.clone(), extra_headers));
        state.record(nav.clone());

        log::debug!("tab: opened for {}", nav.url.as_str());

        if let Err(e) = self.setup(&driver, &state).await {
            log::warn!("tab: setup/navigate failed for {}: {e}", nav.url.as_str());
            let _ = driver.close().await;
            return state.drain_results();
        }

        let started = Instant::now();
        let ran_to_completion =
            tokio::time::timeout(self.config.tab_run_timeout, self.drive(&driver, &state))
                .await
                .is_ok();
        if !ran_to_completion {
            log::debug!(
                "tab: TabRunTimeout expired for {} after {:?}",
                nav.url.as_str(),
                started.elapsed()
            );
        }
        state.set_phase(TabPhase::Closed);
        let _ = driver.close().await;

        let custom_hits = state.drain_custom_regex_hits();
        if !custom_hits.is_empty() {
            log::info!(
                "tab: {} CustomDefinedRegex hit(s) for {}: {:?}",
                custom_hits.len(),
                nav.url.as_str(),
                custom_hits
            );
        }
        state.drain_results()
    }

    async fn setup(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>) -> CrawlResult<()> {
        driver.add_binding(js::BINDING_ADD_LINK).await?;
        driver.add_binding(js::BINDING_TEST).await?;
        driver
            .add_script_to_evaluate_on_new_document(js::MUTATION_OBSERVER_SCRIPT)
            .await?;
        if !state.extra_headers.is_empty() {
            driver.set_extra_http_headers(&state.extra_headers).await?;
        }

        state.set_phase(TabPhase::Navigating);
        let nav = state.nav();
        let headers: HashMap<String, String> = nav
            .headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect();
        let body = if nav.body.is_empty() {
            None
        } else {
            Some(nav.body.as_slice())
        };
        driver
            .navigate(nav.url.as_str(), nav.method.as_str(), &headers, body)
            .await
    }

    /// Races the event pump against the phase driver; whichever finishes
    /// first (phase driver reaching Closed, or the driver's event stream
    /// ending) cancels the other (§4.1.1's terminal Closed transition).
    async fn drive(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>) {
        tokio::select! {
            _ = self.pump_events(driver, state) => {},
            _ = self.drive_phases(driver, state) => {},
        }
    }

    async fn pump_events(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>) {
        while let Some(event) = driver.next_event().await {
            self.handle_event(driver, state, event).await;
        }
    }

    /// Navigating -> DomReady -> Triggered -> Draining -> Closed, driven by
    /// timers and the phase-transition signals `pump_events` raises
    /// (§4.1.1).
    async fn drive_phases(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>) {
        tokio::select! {
            _ = state.dom_ready.notified() => {}
            _ = tokio::time::sleep(self.config.dom_content_loaded_timeout) => {
                log::debug!(
                    "tab: DomContentLoadedTimeout expired for {}, forcing drain",
                    state.nav().url.as_str()
                );
            }
        }

        state.set_phase(TabPhase::DomReady);
        tokio::join!(
            dom::fill_forms(driver.as_ref(), &self.config),
            dom::install_observer(driver.as_ref()),
        );

        state.set_phase(TabPhase::Triggered);
        dom::trigger_events(driver.as_ref(), &self.config).await;

        state.set_phase(TabPhase::Draining);
        tokio::time::sleep(self.config.before_exit_delay).await;
        dom::remove_observer(driver.as_ref()).await;

        let harvested = dom::harvest_dom_urls(driver.as_ref(), &state.nav_url()).await;
        state.record_many(harvested);

        self.detect_and_reencode_charset(driver, state).await;
        state.set_phase(TabPhase::Closed);
    }

    async fn handle_event(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>, event: DriverEvent) {
        match event {
            DriverEvent::RequestWillBeSent(e) => {
                if e.request_id == e.loader_id && e.resource_type == "Document" {
                    state.set_navigation_ids(e.loader_id, e.frame_id, e.request_id);
                }
            }
            DriverEvent::DomContentEventFired | DriverEvent::LoadEventFired => {
                if state.try_start_dom_content_loaded() {
                    state.dom_ready.notify_one();
                }
            }
            DriverEvent::ResponseReceivedExtraInfo(e) => {
                if state.is_navigation_network_id(&e.request_id) {
                    if let Some(status) = parse_status_line(&e.raw_headers_text) {
                        if (300..400).contains(&status) {
                            state.found_redirection.store(true, Ordering::SeqCst);
                        }
                    }
                }
            }
            DriverEvent::ResponseReceived(e) => {
                self.harvest_response_body(driver, state, e).await;
            }
            DriverEvent::AuthRequired(e) => {
                let auth = self.config.custom_401_auth.clone().unwrap_or_default();
                let _ = driver
                    .continue_with_auth(&e.request_id, &auth.username, &auth.password)
                    .await;
            }
            DriverEvent::RequestPaused(paused) => {
                self.handle_paused_request(driver, state, paused).await;
            }
            DriverEvent::BindingCalled(call) => {
                self.handle_binding(state, call).await;
            }
            DriverEvent::JavascriptDialogOpening { message } => {
                log::debug!("tab: dismissing JS dialog: {message}");
            }
        }
    }

    async fn handle_paused_request(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>, paused: PausedRequest) {
        let nav = state.nav();
        let Some(req) = intercept::resolve_request(&nav, &paused.method, &paused.url, paused.headers.clone(), paused.post_data.clone()) else {
            let _ = driver.continue_request(&paused.request_id, None).await;
            return;
        };

        let is_navigation = state.is_navigation_network_id(paused.network_id.as_deref().unwrap_or(&paused.request_id));
        let found_redirection = if is_navigation && paused.is_top_frame {
            state.found_redirection.swap(false, Ordering::SeqCst)
        } else {
            false
        };

        let decision = intercept::classify(
            req,
            &nav,
            is_navigation,
            paused.is_top_frame,
            found_redirection,
            &self.config.ignore_keywords,
        );

        match decision {
            InterceptDecision::IgnoredByKeyword(req) | InterceptDecision::StaticResource(req) => {
                let _ = driver.fail_request(&paused.request_id, "BlockedByClient").await;
                state.record(req);
            }
            InterceptDecision::SyntheticRedirectReply(req) => {
                state.set_nav_redirection(true);
                let _ = driver
                    .fulfill_request(
                        &paused.request_id,
                        200,
                        Some(b"<html><body>crawlergo</body></html>".to_vec()),
                        None,
                    )
                    .await;
                state.record(req);
            }
            InterceptDecision::ReplayRedirect(req) => {
                self.replay_redirect(driver, state, &paused.request_id, req).await;
            }
            InterceptDecision::ContinueAsNavigation(req, overrides) => {
                let _ = driver
                    .continue_request(
                        &paused.request_id,
                        Some(ContinueOverrides {
                            url: None,
                            method: Some(overrides.method),
                            headers: Some(overrides.headers),
                            post_data: overrides.body,
                        }),
                    )
                    .await;
                state.record(req);
            }
            InterceptDecision::ContinueChildFrame(req) => {
                let _ = driver.continue_request(&paused.request_id, None).await;
                state.record(req);
            }
            InterceptDecision::SuppressNavigation(req) => {
                let _ = driver.fulfill_request(&paused.request_id, 204, None, None).await;
                state.record(req);
            }
            InterceptDecision::Xhr(req) => {
                let _ = driver.continue_request(&paused.request_id, None).await;
                state.record(req);
            }
        }
    }

    /// §4.1.2's `ReplayRedirect` branch: perform the out-of-band GET with
    /// the 1MiB range cap, strip `Location`, fulfill with that body at
    /// 200, then clear the navigate Request's redirection flag.
    async fn replay_redirect(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        state: &Arc<TabState>,
        request_id: &crate::driver::RequestId,
        req: Request,
    ) {
        let headers: HashMap<String, String> = req
            .headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect();
        match self.http_client.get_redirect_replay(req.url.as_str(), &headers).await {
            Ok(mut response) => {
                response.headers.remove("location");
                let reply_headers: HashMap<String, String> = response.headers.clone();
                let _ = driver
                    .fulfill_request(request_id, 200, Some(response.body), Some(reply_headers))
                    .await;
            }
            Err(e) => {
                log::warn!("tab: redirect replay GET failed for {}: {e}", req.url.as_str());
                let _ = driver.fail_request(request_id, "Failed").await;
            }
        }
        state.set_nav_redirection(false);
        state.record(req);
    }

    /// §4.1.6: response-body URL harvesting for css/js/html/json MIME
    /// types, plus header-based discovery on the navigate response.
    async fn harvest_response_body(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>, event: crate::driver::ResponseReceived) {
        if state.is_navigation_network_id(&event.request_id) {
            for header in ["link", "content-location", "location", "refresh"] {
                if event.headers.get(header).is_some() {
                    state.record(Request::new(Method::Get, state.nav_url(), Source::Header));
                    break;
                }
            }
        }

        let harvestable = ["css", "javascript", "html", "json"]
            .iter()
            .any(|kind| event.mime_type.contains(kind));
        if !harvestable {
            return;
        }

        let Ok(body) = driver.get_response_body(&event.request_id).await else {
            return;
        };

        let nav_url = state.nav_url();
        let mut discovered = Vec::new();
        for capture in js::SUSPECT_URL_RE.captures_iter(&body) {
            let candidate = &capture[1];
            if js::looks_like_mime_type(candidate) {
                continue;
            }
            if let Ok(url) = nav_url.resolve(candidate) {
                discovered.push(Request::new(Method::Get, url, Source::JavaScript));
            }
        }
        state.record_many(discovered);

        for pattern in &self.custom_regexes {
            for found in pattern.find_iter(&body) {
                state.record_custom_regex_hit(found.as_str().to_string());
            }
        }
    }

    async fn handle_binding(&self, state: &Arc<TabState>, call: crate::driver::BindingCalled) {
        if call.name != js::BINDING_ADD_LINK {
            return;
        }
        let Some((url, source)) = call.payload.split_once('\u{0}') else {
            return;
        };
        let Ok(resolved) = state.nav_url().resolve(url) else {
            return;
        };
        state.record(Request::new(Method::Get, resolved, parse_binding_source(source)));
    }

    /// §4.1.10: detect the page charset and, if enabled and non-UTF-8,
    /// transcode every captured Request's raw path/query.
    async fn detect_and_reencode_charset(&self, driver: &Arc<dyn BrowserDriver>, state: &Arc<TabState>) {
        let Ok(detected) = driver.evaluate(js::DETECT_CHARSET_SCRIPT).await else {
            return;
        };
        let detected = detected.trim().trim_matches('"').to_string();
        if detected.is_empty() {
            return;
        }
        *state.page_charset.lock().unwrap() = detected.clone();

        if !self.config.encode_url_with_charset || !charset::is_non_utf8(&detected) {
            return;
        }

        let mut results = state.drain_results();
        for req in results.iter_mut() {
            let new_path = charset::reencode(req.url.path(), &detected);
            let new_query = charset::reencode(req.url.raw_query(), &detected);
            req.url = req.url.with_reencoded_path_and_query(&new_path, &new_query);
        }
        state.record_many(results);
    }
}

fn parse_binding_source(tag: &str) -> Source {
    match tag {
        "DOM" => Source::Dom,
        "JavaScript" => Source::JavaScript,
        "HistoryAPI" => Source::HistoryApi,
        "OpenWindow" => Source::OpenWindow,
        "HashChange" => Source::HashChange,
        "WebSocket" => Source::WebSocket,
        "EventSource" => Source::EventSource,
        "Fetch" => Source::Fetch,
        _ => Source::JavaScript,
    }
}

/// Parse the 3-digit status code from a raw HTTP status line's first
/// space-separated triple (§4.1.3), e.g. `"HTTP/1.1 302 Found"` -> `302`.
fn parse_status_line(raw_headers_text: &str) -> Option<u16> {
    let first_line = raw_headers_text.lines().next()?;
    first_line.split_whitespace().nth(1)?.parse().ok()
}

#[async_trait]
impl<F: DriverFactory> TabRunner for TabOrchestrator<F> {
    async fn run_tab(&self, req: Request) -> Vec<Request> {
        self.run_one(req).await
    }
}
