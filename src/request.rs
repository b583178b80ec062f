use crate::url::CrawlUrl;
use case_insensitive_string::CaseInsensitiveString;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// HTTP methods a captured request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Parse a method token, case-insensitively. Unknown tokens fall back to GET,
    /// matching the source's `strings.ToUpper` + switch-free dispatch.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            _ => Method::Get,
        }
    }

    /// The canonical uppercase token for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

/// Provenance tag recording how a request was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Target,
    Navigation,
    Xhr,
    Dom,
    JavaScript,
    PathFuzz,
    RobotsTxt,
    SitemapXml,
    Comment,
    WebSocket,
    EventSource,
    Fetch,
    HistoryApi,
    OpenWindow,
    HashChange,
    StaticResource,
    StaticRegex,
    Header,
}

impl Source {
    /// The string label used in output, matching the original tool's tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Target => "Target",
            Source::Navigation => "Navigation",
            Source::Xhr => "XHR",
            Source::Dom => "DOM",
            Source::JavaScript => "JavaScript",
            Source::PathFuzz => "PathFuzz",
            Source::RobotsTxt => "robots.txt",
            Source::SitemapXml => "sitemap.xml",
            Source::Comment => "Comment",
            Source::WebSocket => "WebSocket",
            Source::EventSource => "EventSource",
            Source::Fetch => "Fetch",
            Source::HistoryApi => "HistoryAPI",
            Source::OpenWindow => "OpenWindow",
            Source::HashChange => "HashChange",
            Source::StaticResource => "StaticResource",
            Source::StaticRegex => "StaticRegex",
            Source::Header => "Header",
        }
    }
}

/// A dynamically typed parameter value, dispatched on during marker rules
/// (query params and JSON post bodies carry more than strings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ParamValue>),
    Other(String),
}

impl ParamValue {
    /// Render back to a display string, used when a value must be embedded
    /// back into a query string or post body after marking.
    pub fn as_display(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::String(s) => s.clone(),
            ParamValue::Other(s) => s.clone(),
            ParamValue::List(items) => items
                .iter()
                .map(|v| v.as_display())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Cache of fingerprints the filter derives for a [`Request`]. Never
/// populated by the tab; only the filter writes to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterIdentity {
    pub marked_path: String,
    pub path_id: String,
    pub marked_query_map: HashMap<String, ParamValue>,
    pub query_keys_id: String,
    pub query_map_id: String,
    pub marked_post_data_map: HashMap<String, ParamValue>,
    pub post_data_id: String,
    pub fragment_id: String,
    pub unique_id: String,
}

/// A captured HTTP request, the crawl engine's single unit of work.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: CrawlUrl,
    pub headers: HashMap<CaseInsensitiveString, String>,
    pub body: Vec<u8>,
    pub source: Source,
    pub redirection: bool,
    pub proxy: Option<String>,
    pub filter: FilterIdentity,
}

impl Request {
    /// Build a request the way the seed loader and DOM collectors do:
    /// no headers, no body, no filter identity yet.
    pub fn new(method: Method, url: CrawlUrl, source: Source) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: Vec::new(),
            source,
            redirection: false,
            proxy: None,
            filter: FilterIdentity::default(),
        }
    }

    /// Case-insensitive header lookup for well-known names.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get::<CaseInsensitiveString>(&name.into())
            .map(|v| v.as_str())
    }

    /// The `Content-Type` value, if present and one of the two supported
    /// types (`application/json`, `application/x-www-form-urlencoded`).
    pub fn content_type(&self) -> Option<&str> {
        let ct = self.header("Content-Type")?;
        const SUPPORTED: [&str; 2] = ["application/json", "application/x-www-form-urlencoded"];
        SUPPORTED
            .iter()
            .find(|supported| ct.starts_with(*supported))
            .map(|_| ct)
    }

    /// Derive a parameter map from the body per `Content-Type`. A body whose
    /// type can't be interpreted becomes a single-key blob under `"key"`,
    /// matching the source's fallback exactly.
    pub fn post_data_map(&self) -> HashMap<String, ParamValue> {
        let body_str = String::from_utf8_lossy(&self.body).to_string();
        match self.content_type() {
            Some(ct) if ct.starts_with("application/json") => {
                match serde_json::from_str::<serde_json::Value>(&body_str) {
                    Ok(serde_json::Value::Object(map)) => map
                        .into_iter()
                        .map(|(k, v)| (k, json_value_to_param(v)))
                        .collect(),
                    _ => single_key_blob(body_str),
                }
            }
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                let mut result = HashMap::new();
                for (k, v) in url::form_urlencoded::parse(body_str.as_bytes()) {
                    result.insert(k.into_owned(), ParamValue::String(v.into_owned()));
                }
                if result.is_empty() {
                    single_key_blob(body_str)
                } else {
                    result
                }
            }
            _ => single_key_blob(body_str),
        }
    }

    /// MD5 of `method + url + body`, ignoring headers — the straight
    /// uniqueness identity used by SimpleFilter, with the `"Redirection"`
    /// suffix folded in when this request replays a 3xx target.
    pub fn no_header_id(&self) -> String {
        let body_str = String::from_utf8_lossy(&self.body);
        crate::filter::md5_hex(&format!(
            "{}{}{}",
            self.method.as_str(),
            self.url.as_str(),
            body_str
        ))
    }

    /// `no_header_id`, with the redirection suffix applied.
    pub fn unique_id(&self) -> String {
        if self.redirection {
            crate::filter::md5_hex(&format!("{}Redirection", self.no_header_id()))
        } else {
            self.no_header_id()
        }
    }
}

fn single_key_blob(body: String) -> HashMap<String, ParamValue> {
    let mut map = HashMap::new();
    map.insert("key".to_string(), ParamValue::String(body));
    map
}

fn json_value_to_param(value: serde_json::Value) -> ParamValue {
    match value {
        serde_json::Value::Bool(b) => ParamValue::Bool(b),
        serde_json::Value::Number(n) => ParamValue::Number(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => ParamValue::String(s),
        serde_json::Value::Array(items) => {
            ParamValue::List(items.into_iter().map(json_value_to_param).collect())
        }
        other => ParamValue::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::CrawlUrl;

    fn req(method: Method, url: &str) -> Request {
        Request::new(method, CrawlUrl::parse(url).unwrap(), Source::Target)
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!(Method::parse("post"), Method::Post);
        assert_eq!(Method::parse("GET"), Method::Get);
        assert_eq!(Method::parse("whatever"), Method::Get);
    }

    #[test]
    fn content_type_matches_known_prefixes_only() {
        let mut r = req(Method::Post, "http://h/a");
        r.headers.insert(
            "Content-Type".into(),
            "application/json; charset=utf-8".to_string(),
        );
        assert_eq!(
            r.content_type(),
            Some("application/json; charset=utf-8")
        );

        let mut r2 = req(Method::Post, "http://h/a");
        r2.headers
            .insert("Content-Type".into(), "text/plain".to_string());
        assert_eq!(r2.content_type(), None);
    }

    #[test]
    fn post_data_falls_back_to_single_key_blob() {
        let r = req(Method::Post, "http://h/a");
        let map = r.post_data_map();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("key"));
    }

    #[test]
    fn post_data_parses_json_object() {
        let mut r = req(Method::Post, "http://h/a");
        r.headers
            .insert("Content-Type".into(), "application/json".to_string());
        r.body = br#"{"a":1,"b":"x"}"#.to_vec();
        let map = r.post_data_map();
        assert_eq!(map.get("a"), Some(&ParamValue::Number(1.0)));
        assert_eq!(map.get("b"), Some(&ParamValue::String("x".into())));
    }

    #[test]
    fn redirection_suffix_changes_unique_id() {
        let mut r = req(Method::Get, "http://h/a");
        let plain = r.unique_id();
        r.redirection = true;
        let redirected = r.unique_id();
        assert_ne!(plain, redirected);
    }
}
