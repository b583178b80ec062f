use thiserror::Error;

/// Errors surfaced by the crawl engine.
///
/// Most failures here are recoverable at the scope of a single tab or a
/// single helper call — see the module docs on [`crate::crawler`] for how
/// each variant is handled by the pool.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The browser driver disconnected or a per-operation call timed out.
    #[error("tab aborted: {0}")]
    TabAborted(String),

    /// Navigation to the target URL failed or its context was cancelled.
    #[error("navigate failed for {url}: {reason}")]
    Navigate {
        /// URL that failed to navigate.
        url: String,
        /// Driver-reported reason.
        reason: String,
    },

    /// A URL could not be parsed.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A `Content-Type` header or body could not be interpreted as the
    /// declared format.
    #[error("could not parse {what}: {detail}")]
    ContentParse {
        /// What was being parsed, e.g. "post body".
        what: &'static str,
        /// Human-readable detail.
        detail: String,
    },

    /// A path-discovery helper (robots.txt/sitemap.xml/dictionary fuzz)
    /// failed; the helper degrades to an empty result rather than
    /// propagating this.
    #[error("helper {helper} failed: {source}")]
    Helper {
        /// Name of the helper, e.g. "robots.txt".
        helper: &'static str,
        /// Underlying error.
        #[source]
        source: Box<CrawlError>,
    },

    /// The out-of-band HTTP client failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A sitemap.xml document failed to parse.
    #[error("sitemap parse error: {0}")]
    SitemapParse(#[from] quick_xml::de::DeError),

    /// The browser failed to launch. Fatal: the constructor returns this
    /// and `run()` is never entered.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// A configuration value was invalid, e.g. `ExtraHeadersString` was not
    /// valid JSON. Fatal, same as `BrowserLaunch`.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
