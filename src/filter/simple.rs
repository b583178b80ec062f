//! Straight-uniqueness filtering: domain scoping, exact dedup, static
//! resource dropping (SPEC_FULL.md §4.2.7, §8 domain-scoping invariant).

use hashbrown::HashSet;
use std::sync::Mutex;

use super::marker::is_static_suffix;
use crate::request::Request;

/// Domain/uniqueness/static-suffix filtering. Thread-safe: the unique set
/// is behind a mutex so concurrent tabs can share one `SimpleFilter`.
#[derive(Default)]
pub struct SimpleFilter {
    unique_set: Mutex<HashSet<String>>,
    /// When set, requests whose host doesn't match are dropped by
    /// [`Self::domain_filter`].
    pub host_limit: Option<String>,
}

impl SimpleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host_limit(host_limit: impl Into<String>) -> Self {
        Self {
            unique_set: Mutex::new(HashSet::new()),
            host_limit: Some(host_limit.into()),
        }
    }

    /// `true` means "drop this request".
    pub fn do_filter(&self, req: &Request) -> bool {
        if self.host_limit.is_some() && self.domain_filter(req) {
            return true;
        }
        if self.unique_filter(req) {
            return true;
        }
        self.static_filter(req)
    }

    /// Exact dedup by `method+url+body` MD5 (with the redirection suffix
    /// folded in). Idempotent: calling this twice for the same request
    /// always filters the second call (§8 filter-idempotence invariant).
    pub fn unique_filter(&self, req: &Request) -> bool {
        let id = req.unique_id();
        let mut set = self.unique_set.lock().unwrap();
        if set.contains(&id) {
            true
        } else {
            set.insert(id);
            false
        }
    }

    /// Host scoping. Reproduces the source's incomplete port handling
    /// verbatim rather than "fixing" it (see DESIGN.md open question):
    /// an explicit `:80`/`:443` in the request URL is compared literally
    /// against `host_limit`, only the *implicit* default port is
    /// normalized away — and only when the request's own URL carries no
    /// explicit port at all, matching the Go original's `req.URL.Port() ==
    /// ""` guard.
    pub fn domain_filter(&self, req: &Request) -> bool {
        let Some(host_limit) = &self.host_limit else {
            return false;
        };
        if req.url.host_port() == *host_limit || req.url.host() == host_limit {
            return false;
        }
        let has_no_explicit_port = req.url.host_port() == req.url.host();
        if has_no_explicit_port {
            if host_limit.ends_with(":80") && req.url.scheme() == "http" {
                if format!("{}:80", req.url.host()) == *host_limit {
                    return false;
                }
            }
            if host_limit.ends_with(":443") && req.url.scheme() == "https" {
                if format!("{}:443", req.url.host()) == *host_limit {
                    return false;
                }
            }
        }
        true
    }

    /// Drop requests whose file extension is a known static resource type.
    pub fn static_filter(&self, req: &Request) -> bool {
        let ext = req.url.file_ext();
        if ext.is_empty() {
            return false;
        }
        is_static_suffix(&ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, Source};
    use crate::url::CrawlUrl;

    fn req(url: &str) -> Request {
        Request::new(Method::Get, CrawlUrl::parse(url).unwrap(), Source::Target)
    }

    #[test]
    fn unique_filter_drops_on_second_call() {
        let f = SimpleFilter::new();
        let r = req("http://h/a?x=1");
        assert!(!f.unique_filter(&r));
        assert!(f.unique_filter(&r));
    }

    #[test]
    fn static_filter_drops_known_extensions() {
        let f = SimpleFilter::new();
        assert!(f.static_filter(&req("http://h/a.png")));
        assert!(!f.static_filter(&req("http://h/a.rs")));
    }

    #[test]
    fn domain_filter_allows_exact_host() {
        let f = SimpleFilter::with_host_limit("h");
        assert!(!f.domain_filter(&req("http://h/a")));
        assert!(f.domain_filter(&req("http://other/a")));
    }

    #[test]
    fn domain_filter_default_port_normalization_requires_no_explicit_port() {
        let f = SimpleFilter::with_host_limit("h:80");
        assert!(!f.domain_filter(&req("http://h/a")));
        assert!(f.domain_filter(&req("http://h:9999/a")));
    }
}
