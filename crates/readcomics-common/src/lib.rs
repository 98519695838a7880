//! Readcomics-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across readcomics:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for users, publishers, people, etc.
//! - **Core Types**: Enums shared by the account and catalog layers
//! - **Text Utilities**: Slug generation and HTML tag stripping
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use readcomics_common::{PublisherId, Gender, Error, Result};
//! use readcomics_common::text::slugify;
//!
//! let publisher_id = PublisherId::new();
//! assert_eq!(Gender::default(), Gender::Unicorn);
//! assert_eq!(slugify("Dark Horse Comics"), "Dark-Horse-Comics");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("publisher"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
