//! Out-of-band HTTP client for redirect replay and dictionary probing
//! (SPEC_FULL.md §6), built concretely on `reqwest`.

use std::time::Duration;

use hashbrown::HashMap;

use crate::error::{CrawlError, CrawlResult};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A response normalized the way the engine expects: 206 collapsed to 200,
/// `Location` stripped when the caller asked for it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(|v| v.as_str())
    }
}

/// Range-capped, redirect-disabled HTTP client shared by the redirect
/// replay path and the discovery helpers.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(proxy: Option<&str>) -> CrawlResult<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(5));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// GET with the default `bytes=0-10240` range cap (§6), unless the
    /// caller supplies its own `Range` header.
    pub async fn get(&self, url: &str, headers: &HashMap<String, String>) -> CrawlResult<HttpResponse> {
        self.request("GET", url, headers, None, 10_240).await
    }

    /// GET used specifically for the redirect-replay path (§4.1.2), which
    /// caps at ~1MiB instead of the discovery-helper default.
    pub async fn get_redirect_replay(&self, url: &str, headers: &HashMap<String, String>) -> CrawlResult<HttpResponse> {
        self.request("GET", url, headers, None, 1_048_576).await
    }

    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<Vec<u8>>,
        range_cap: u64,
    ) -> CrawlResult<HttpResponse> {
        let verb = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| CrawlError::Config(format!("invalid HTTP method: {method}")))?;
        let mut builder = self.client.request(verb, url).header("User-Agent", DEFAULT_USER_AGENT);
        if !headers.contains_key("Range") {
            builder = builder.header("Range", format!("bytes=0-{range_cap}"));
        }
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let mut status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_lowercase(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response.bytes().await?.to_vec();

        if status == 206 {
            status = 200;
        }

        Ok(HttpResponse { status, headers, body })
    }
}
