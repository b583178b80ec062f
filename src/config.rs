//! Builder-style crawl configuration: a plain struct with public fields
//! and a `with_*(&mut self, ...) -> &mut Self` method per option.

use std::time::Duration;

use hashbrown::HashMap;

use crate::filter::FilterMode;

/// How DOM event waves are fired during the Triggered phase (§4.1.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventTriggerMode {
    #[default]
    Async,
    Sync,
}

/// Credentials supplied on an `AuthRequired` challenge (§4.1.4).
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl Default for BasicAuth {
    fn default() -> Self {
        Self {
            username: "Admin".to_string(),
            password: "123456".to_string(),
        }
    }
}

/// Crawl-wide configuration surface. Defaults match §6's table.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_crawler_count: usize,
    pub max_tab_count: usize,
    pub tab_run_timeout: Duration,
    pub dom_content_loaded_timeout: Duration,
    pub event_trigger_mode: EventTriggerMode,
    pub event_trigger_interval: Duration,
    pub before_exit_delay: Duration,
    pub filter_mode: FilterMode,
    pub ignore_keywords: Vec<String>,
    pub path_form_robots: bool,
    pub path_form_sitemap: bool,
    pub path_fuzz: bool,
    pub fuzz_dict_path: Option<String>,
    pub custom_form_values: HashMap<String, String>,
    pub custom_form_keyword_values: HashMap<String, String>,
    pub custom_401_auth: Option<BasicAuth>,
    pub extra_headers: HashMap<String, String>,
    pub extra_headers_string: Option<String>,
    pub encode_url_with_charset: bool,
    pub proxy: Option<String>,
    pub no_headless: bool,
    pub chromium_path: Option<String>,
    pub custom_defined_regex: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_crawler_count: 300,
            max_tab_count: 10,
            tab_run_timeout: Duration::from_secs(15),
            dom_content_loaded_timeout: Duration::from_secs(5),
            event_trigger_mode: EventTriggerMode::Async,
            event_trigger_interval: Duration::from_millis(100),
            before_exit_delay: Duration::from_secs(1),
            filter_mode: FilterMode::Smart,
            ignore_keywords: vec!["logout".to_string(), "quit".to_string(), "exit".to_string()],
            path_form_robots: false,
            path_form_sitemap: false,
            path_fuzz: false,
            fuzz_dict_path: None,
            custom_form_values: HashMap::new(),
            custom_form_keyword_values: HashMap::new(),
            custom_401_auth: None,
            extra_headers: HashMap::new(),
            extra_headers_string: None,
            encode_url_with_charset: false,
            proxy: None,
            no_headless: false,
            chromium_path: None,
            custom_defined_regex: Vec::new(),
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard cap on total page opens. Default 300.
    pub fn with_max_crawler_count(&mut self, count: usize) -> &mut Self {
        self.max_crawler_count = count;
        self
    }

    /// Worker-pool size. Default 10.
    pub fn with_max_tab_count(&mut self, count: usize) -> &mut Self {
        self.max_tab_count = count;
        self
    }

    /// Per-tab wall clock. Default 15s.
    pub fn with_tab_run_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.tab_run_timeout = timeout;
        self
    }

    /// Wait before forcing drain. Default 5s.
    pub fn with_dom_content_loaded_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.dom_content_loaded_timeout = timeout;
        self
    }

    pub fn with_event_trigger_mode(&mut self, mode: EventTriggerMode) -> &mut Self {
        self.event_trigger_mode = mode;
        self
    }

    /// Between/within event waves. Default 100ms.
    pub fn with_event_trigger_interval(&mut self, interval: Duration) -> &mut Self {
        self.event_trigger_interval = interval;
        self
    }

    /// Pre-drain settle. Default 1s.
    pub fn with_before_exit_delay(&mut self, delay: Duration) -> &mut Self {
        self.before_exit_delay = delay;
        self
    }

    pub fn with_filter_mode(&mut self, mode: FilterMode) -> &mut Self {
        self.filter_mode = mode;
        self
    }

    /// URL substrings that cause the fetch to be blocked and tagged XHR.
    /// Default {logout, quit, exit}.
    pub fn with_ignore_keywords(&mut self, keywords: Vec<String>) -> &mut Self {
        self.ignore_keywords = keywords;
        self
    }

    pub fn with_path_form_robots(&mut self, enabled: bool) -> &mut Self {
        self.path_form_robots = enabled;
        self
    }

    pub fn with_path_form_sitemap(&mut self, enabled: bool) -> &mut Self {
        self.path_form_sitemap = enabled;
        self
    }

    pub fn with_path_fuzz(&mut self, enabled: bool, dict_path: Option<String>) -> &mut Self {
        self.path_fuzz = enabled;
        self.fuzz_dict_path = dict_path;
        self
    }

    pub fn with_custom_form_values(&mut self, values: HashMap<String, String>) -> &mut Self {
        self.custom_form_values = values;
        self
    }

    pub fn with_custom_form_keyword_values(&mut self, values: HashMap<String, String>) -> &mut Self {
        self.custom_form_keyword_values = values;
        self
    }

    /// `{username,password}` used on HTTP auth challenge.
    pub fn with_custom_401_auth(&mut self, auth: BasicAuth) -> &mut Self {
        self.custom_401_auth = Some(auth);
        self
    }

    pub fn with_extra_headers(&mut self, headers: HashMap<String, String>) -> &mut Self {
        self.extra_headers = headers;
        self
    }

    /// JSON-encoded extra headers; parsed by the crawler constructor
    /// (`CrawlError::Config` on invalid JSON, §7).
    pub fn with_extra_headers_string(&mut self, raw: impl Into<String>) -> &mut Self {
        self.extra_headers_string = Some(raw.into());
        self
    }

    pub fn with_encode_url_with_charset(&mut self, enabled: bool) -> &mut Self {
        self.encode_url_with_charset = enabled;
        self
    }

    pub fn with_proxy(&mut self, proxy: impl Into<String>) -> &mut Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_no_headless(&mut self, enabled: bool) -> &mut Self {
        self.no_headless = enabled;
        self
    }

    pub fn with_chromium_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.chromium_path = Some(path.into());
        self
    }

    pub fn with_custom_defined_regex(&mut self, patterns: Vec<String>) -> &mut Self {
        self.custom_defined_regex = patterns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_crawler_count, 300);
        assert_eq!(config.max_tab_count, 10);
        assert_eq!(config.tab_run_timeout, Duration::from_secs(15));
        assert_eq!(config.ignore_keywords, vec!["logout", "quit", "exit"]);
    }

    #[test]
    fn builder_methods_chain() {
        let mut config = CrawlConfig::new();
        config
            .with_max_crawler_count(50)
            .with_max_tab_count(4)
            .with_path_fuzz(true, None);
        assert_eq!(config.max_crawler_count, 50);
        assert_eq!(config.max_tab_count, 4);
        assert!(config.path_fuzz);
    }
}
