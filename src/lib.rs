#![warn(missing_docs)]

//! A browser-driven web crawler engine.
//!
//! The engine drives a pool of headless-browser tabs against a seed set of
//! URLs, intercepting and replaying every network request a page issues so
//! that pages needing real navigation (redirects, auth, POST forms) behave
//! correctly while everything else is observed without side effects. Each
//! tab also fills forms, fires DOM/JS event waves, and harvests URLs out of
//! attributes, JS bindings, response bodies, and HTML comments. Captured
//! requests flow into a frontier that dedups them — either by straight
//! uniqueness or by collapsing pseudo-static URLs into symbolic markers —
//! and recursively feeds survivors back into the tab pool until the crawl
//! drains.
//!
//! # How to use this crate
//!
//! Implement [`driver::DriverFactory`] against a real CDP/WebDriver
//! transport, build a [`config::CrawlConfig`], and hand both to
//! [`crawler::Crawler::new`]:
//!
//! ```ignore
//! let config = CrawlConfig::new();
//! let crawler = Crawler::new(config, my_driver_factory)?;
//! let result = crawler.run(&["https://example.com".to_string()]).await?;
//! ```
//!
//! [`crawler::Crawler::run`] returns a [`frontier::FrontierResult`]: every
//! captured request, the subset scoped to the seed's domain, and the set of
//! domains/subdomains encountered.

extern crate hashbrown;
extern crate log;
extern crate reqwest;
pub extern crate tokio;
extern crate url;

/// Builder-style crawl configuration.
pub mod config;
/// The top-level crawl entrypoint wiring seeds, discovery, and the frontier.
pub mod crawler;
/// Seed expansion helpers: robots.txt, sitemap.xml, dictionary fuzzing.
pub mod discovery;
/// Root/subdomain grouping over a finished crawl's requests.
pub mod domain;
/// The embedded headless-browser driver contract.
pub mod driver;
/// Crawl engine error types.
pub mod error;
/// Request fingerprint/dedup filtering.
pub mod filter;
/// Bounded-concurrency work pool and frontier state.
pub mod frontier;
/// A captured HTTP request, the crawl engine's unit of work.
pub mod request;
/// The tab orchestrator: request interception, DOM harvesting, and the
/// per-tab lifecycle state machine.
pub mod tab;
/// Parsed URL helpers shared by the filter and interceptor.
pub mod url;
