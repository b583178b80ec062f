//! End-to-end crawl tests against an in-process [`BrowserDriver`] stub,
//! rather than a real CDP transport, so the full `Crawler` -> `Frontier` ->
//! `TabOrchestrator` wiring can be exercised without a browser or network.
//!
//! Mirrors the shape of the teacher's `crawler_test_com` suite (a shared
//! `helpers`-style module plus per-concern test files aggregated here), but
//! none of this needs `RUN_LIVE_TESTS` since nothing here touches the
//! network.

mod driver_stub;

mod basic_crawl;
mod filter_modes;
mod max_crawler_count;
