//! Integration tests for Board-Harvest
//!
//! These tests serve listing and detail pages from a wiremock server and run
//! whole harvests against an on-disk database.

mod common;
mod crawl_tests;
