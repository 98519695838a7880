//! Readcomics - comic reader accounts, catalog and profile images
//!
//! This library crate exposes the core functionality for integration testing.

pub mod accounts;
pub mod breadcrumb;
pub mod catalog;
pub mod config;
pub mod images;
pub mod instrument;
pub mod search;
