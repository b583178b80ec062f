//! Request interception decision tree (SPEC_FULL.md §4.1.2-§4.1.4, §4.1.6,
//! §4.1.9), grounded on `intercept_tab_request.go`.

use hashbrown::HashMap;

use crate::filter::marker::is_static_suffix;
use crate::request::{Method, Request, Source};
use crate::url::CrawlUrl;

/// What the tab orchestrator should do with a paused outbound request,
/// after [`classify`] has run. Every variant already carries the finished
/// `Request` record (with `source` set) to append to the tab's result
/// list; the tab driver methods to call are named in each doc comment.
pub enum InterceptDecision {
    /// Call `fail_request(BlockedByClient)`. Source = XHR.
    IgnoredByKeyword(Request),
    /// Call `fail_request(BlockedByClient)`. Source = StaticResource.
    StaticResource(Request),
    /// Call `fulfill_request(200, synthetic body)`. The navigate Request
    /// gets `redirection=true` and is recorded with source=Navigation.
    SyntheticRedirectReply(Request),
    /// The navigate Request was already flagged `redirection`; the driver
    /// loop must perform the out-of-band GET itself (§4.1.2) and then
    /// `fulfill_request` with the replayed body. Source = Navigation.
    ReplayRedirect(Request),
    /// Call `continue_request` with the given overrides (method/headers/body
    /// taken from the navigate Request). Source = Navigation.
    ContinueAsNavigation(Request, ContinueParts),
    /// Not top frame: call `continue_request` with no overrides. Source =
    /// Navigation.
    ContinueChildFrame(Request),
    /// Top frame but URL doesn't match navigate URL (hash routing etc).
    /// Call `fulfill_request(204, None)`.
    SuppressNavigation(Request),
    /// Ordinary XHR: call `continue_request` with no overrides.
    Xhr(Request),
}

/// The override fields to apply when continuing a navigation request so a
/// POST navigation actually POSTs (§4.1.2).
pub struct ContinueParts {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Resolve a paused request's URL against the tab's navigate URL and build
/// the captured [`Request`] record, or `None` if the URL can't be parsed
/// (in which case the caller should just continue the request unmodified).
pub fn resolve_request(
    nav: &Request,
    method: &str,
    raw_url: &str,
    headers: HashMap<String, String>,
    post_data: Option<Vec<u8>>,
) -> Option<Request> {
    let url = nav.url.resolve(raw_url).ok()?;
    let mut req = Request::new(Method::parse(method), url, Source::Xhr);
    req.headers = headers
        .into_iter()
        .map(|(k, v)| (k.into(), v))
        .collect();
    req.body = post_data.unwrap_or_default();
    Some(req)
}

/// Host-binding rewrite (§4.1.2): if the navigate Request carries a `Host`
/// header that differs from the navigate URL's own hostname, and this
/// request's host matches either that `Host` header or the navigate
/// hostname, rewrite so traffic routes to the navigate host while
/// preserving the original `Host`/`Origin`/`Referer` semantics.
pub fn host_binding_rewrite(req: &mut Request, nav: &Request) {
    let Some(bound_host) = nav.header("Host").map(str::to_string) else {
        return;
    };
    let nav_host = nav.url.host();
    if nav_host == bound_host {
        return;
    }

    if req.url.host() == bound_host {
        if let Ok(rewritten) = req.url.resolve(&req.url.as_str().replacen(
            &format!("://{}", req.url.host()),
            &format!("://{}", nav_host),
            1,
        )) {
            req.url = rewritten;
        }
        req.headers.insert("Host".into(), bound_host.clone());
    } else if req.url.host() == nav_host {
        req.headers.insert("Host".into(), bound_host.clone());
    } else {
        return;
    }

    if let Some(origin) = req.headers.get(&"Origin".into()).cloned() {
        req.headers.insert(
            "Origin".into(),
            origin.replacen(&nav.url.host_port(), &bound_host, 1),
        );
    }
    let referer = req
        .headers
        .get(&"Referer".into())
        .cloned()
        .unwrap_or_else(|| nav.url.as_str().to_string());
    req.headers.insert(
        "Referer".into(),
        referer.replacen(&nav.url.host_port(), &bound_host, 1),
    );
}

/// `true` if `url` contains any configured ignore keyword (§4.1.2).
pub fn is_ignored_by_keyword(url: &CrawlUrl, ignore_keywords: &[String]) -> bool {
    ignore_keywords.iter().any(|kw| url.as_str().contains(kw.as_str()))
}

/// The full interception decision tree (§4.1.2). `is_navigation` is `true`
/// iff the paused request's network ID equals the tab's captured LoaderID.
#[allow(clippy::too_many_arguments)]
pub fn classify(
    mut req: Request,
    nav: &Request,
    is_navigation: bool,
    is_top_frame: bool,
    found_redirection: bool,
    ignore_keywords: &[String],
) -> InterceptDecision {
    if is_ignored_by_keyword(&req.url, ignore_keywords) {
        req.source = Source::Xhr;
        return InterceptDecision::IgnoredByKeyword(req);
    }

    host_binding_rewrite(&mut req, nav);

    if is_static_suffix(&req.url.file_ext()) {
        req.source = Source::StaticResource;
        return InterceptDecision::StaticResource(req);
    }

    if is_navigation {
        req.source = Source::Navigation;
        if found_redirection && is_top_frame {
            req.redirection = true;
            return InterceptDecision::SyntheticRedirectReply(req);
        }
        if nav.redirection {
            req.redirection = true;
            return InterceptDecision::ReplayRedirect(req);
        }
        if is_top_frame && req.url.no_scheme_fragment_url() == nav.url.no_scheme_fragment_url() {
            let overrides = ContinueParts {
                method: nav.method.as_str().to_string(),
                headers: nav
                    .headers
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), v.clone()))
                    .collect(),
                body: Some(nav.body.clone()),
            };
            return InterceptDecision::ContinueAsNavigation(req, overrides);
        }
        if !is_top_frame {
            return InterceptDecision::ContinueChildFrame(req);
        }
        return InterceptDecision::SuppressNavigation(req);
    }

    req.source = Source::Xhr;
    InterceptDecision::Xhr(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::CrawlUrl;

    fn nav(url: &str) -> Request {
        Request::new(Method::Get, CrawlUrl::parse(url).unwrap(), Source::Target)
    }

    #[test]
    fn static_resource_takes_priority_over_xhr() {
        let n = nav("http://h/");
        let req = Request::new(Method::Get, CrawlUrl::parse("http://h/logo.png").unwrap(), Source::Xhr);
        let decision = classify(req, &n, false, false, false, &[]);
        assert!(matches!(decision, InterceptDecision::StaticResource(_)));
    }

    #[test]
    fn ignore_keyword_takes_priority_over_static() {
        let n = nav("http://h/");
        let req = Request::new(Method::Get, CrawlUrl::parse("http://h/logout.png").unwrap(), Source::Xhr);
        let decision = classify(req, &n, false, false, false, &["logout".to_string()]);
        assert!(matches!(decision, InterceptDecision::IgnoredByKeyword(_)));
    }

    #[test]
    fn plain_xhr_continues() {
        let n = nav("http://h/");
        let req = Request::new(Method::Get, CrawlUrl::parse("http://h/api").unwrap(), Source::Xhr);
        let decision = classify(req, &n, false, false, false, &[]);
        assert!(matches!(decision, InterceptDecision::Xhr(_)));
    }

    #[test]
    fn navigation_with_found_redirection_on_top_frame_is_synthetic() {
        let n = nav("http://h/");
        let req = Request::new(Method::Get, CrawlUrl::parse("http://h/").unwrap(), Source::Target);
        let decision = classify(req, &n, true, true, true, &[]);
        assert!(matches!(decision, InterceptDecision::SyntheticRedirectReply(_)));
    }

    #[test]
    fn navigation_replays_once_the_navigate_request_is_flagged_redirection() {
        // The synthetic reply (previous test) flips `nav.redirection`; the
        // *next* paused navigation request for this tab must then take the
        // out-of-band replay path rather than synthesizing again.
        let mut n = nav("http://h/");
        n.redirection = true;
        let req = Request::new(Method::Get, CrawlUrl::parse("http://h/").unwrap(), Source::Target);
        let decision = classify(req, &n, true, true, false, &[]);
        assert!(matches!(decision, InterceptDecision::ReplayRedirect(_)));
    }
}
