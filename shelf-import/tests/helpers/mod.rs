//! Test helper utilities
//!
//! Shared utilities for testing shelf-import

#![allow(dead_code, unused_imports)]

pub mod csv_fixtures;
pub mod db_utils;
pub mod fake_store;

pub use csv_fixtures::{books_csv, numbered_rows, HEADER};
pub use db_utils::{create_test_store, test_settings};
pub use fake_store::FakeBookStore;
