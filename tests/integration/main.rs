//! Integration tests for Field-Harvest
//!
//! These tests use wiremock to create mock HTTP servers and a scripted
//! renderer in place of the headless browser, and run full crawls end-to-end.

mod crawl_tests;
mod detail_tests;
mod support;
