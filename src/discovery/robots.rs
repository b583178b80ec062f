//! `robots.txt` seed expansion (SPEC_FULL.md §6), grounded on
//! `expression.go`'s `Robots` and the teacher's `packages/robotparser.rs`
//! naming for the parsed-directive shape.

use hashbrown::HashMap;
use lazy_static::lazy_static;
use regex::Regex;

use super::http_client::HttpClient;
use crate::request::{Method, Request, Source};

lazy_static! {
    static ref DIRECTIVE: Regex = Regex::new(r"(?i)(?:Disallow|Allow):\s*(/\S*)").unwrap();
}

/// Fetch `<site>/robots.txt` relative to `seed.url` and return one GET
/// Request per `Disallow:`/`Allow:` path found. On any network failure or
/// non-2xx status, returns an empty list rather than propagating — robots
/// expansion is a best-effort seed booster, never a hard requirement.
pub async fn discover(client: &HttpClient, seed: &Request) -> Vec<Request> {
    let base = seed.url.no_query_url();
    let base = base.strip_suffix('/').unwrap_or(&base);
    let robots_url = format!("{base}/robots.txt");

    let headers: HashMap<String, String> = seed
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.clone()))
        .collect();

    let response = match client.get(&robots_url, &headers).await {
        Ok(resp) if resp.is_success() => resp,
        _ => return Vec::new(),
    };

    let text = String::from_utf8_lossy(&response.body);
    let mut discovered = Vec::new();
    for capture in DIRECTIVE.captures_iter(&text) {
        let path = &capture[1];
        let Ok(url) = seed.url.resolve(path) else {
            continue;
        };
        discovered.push(Request::new(Method::Get, url, Source::RobotsTxt));
    }
    discovered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_regex_extracts_paths() {
        let text = "User-agent: *\nDisallow: /admin\nAllow: /public/\n";
        let paths: Vec<&str> = DIRECTIVE.captures_iter(text).map(|c| c.get(1).unwrap().as_str()).collect();
        assert_eq!(paths, vec!["/admin", "/public/"]);
    }
}
