//! Image storage and thumbnailing.
//!
//! This module provides pluggable blob storage, an image attribute that
//! keeps a resized companion thumbnail next to each stored original, and
//! the declaration checks that guard the thumbnail configuration.

pub mod checks;
mod storage;
mod thumbnail;

pub use checks::{check_dimensions, resolve_size, CheckMessage, DeclaredDimension, SchemaError};
pub use storage::{LocalStorage, MemoryStorage, StorageBackend, StorageError, StorageResult};
pub use thumbnail::{
    thumb_key, StoredImage, ThumbnailError, ThumbnailField, ThumbnailSize, MAX_THUMBNAIL_PIXELS,
};
