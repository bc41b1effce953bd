//! Tests for saving record sets back to their source files.
//!
//! These exercise the full path from disk through ingestion and back,
//! checking row order, identity columns and per-file grouping.

mod roundtrip_tests;
