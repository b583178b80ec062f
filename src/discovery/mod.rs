//! Seed expansion helpers: `robots.txt`, `sitemap.xml`, dictionary fuzzing,
//! and the out-of-band HTTP client they all share (SPEC_FULL.md §6). Unlike
//! the tab orchestrator and browser driver, these are implemented
//! concretely on `reqwest`/`quick-xml` — both the original source and
//! SPEC_FULL.md give a full, deterministic algorithm for each.

pub mod fuzz;
pub mod http_client;
pub mod robots;
pub mod sitemap;

pub use http_client::HttpClient;
