//! Hostname/subdomain collection over a finished request list (SPEC_FULL.md §4.3).

use hashbrown::HashSet;

use crate::request::Request;

/// Every distinct hostname seen across `requests`, in first-seen order.
pub fn all_domains(requests: &[Request]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for req in requests {
        let host = req.url.host();
        if seen.insert(host.to_string()) {
            out.push(host.to_string());
        }
    }
    out
}

/// Distinct hostnames that are a subdomain of `root_domain` (strictly: end
/// with `.`+root_domain), in first-seen order.
pub fn sub_domains(requests: &[Request], root_domain: &str) -> Vec<String> {
    let suffix = format!(".{}", root_domain);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for req in requests {
        let host = req.url.host();
        if !seen.insert(host.to_string()) {
            continue;
        }
        if host.ends_with(&suffix) {
            out.push(host.to_string());
        }
    }
    out
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
    fn collects_distinct_hosts_in_first_seen_order() {
        let reqs = vec![req("http://a.example.com/"), req("http://b.example.com/"), req("http://a.example.com/x")];
        assert_eq!(all_domains(&reqs), vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn subdomains_require_strict_suffix_match() {
        let reqs = vec![
            req("http://example.com/"),
            req("http://api.example.com/"),
            req("http://notexample.com/"),
        ];
        assert_eq!(sub_domains(&reqs, "example.com"), vec!["api.example.com"]);
    }
}
