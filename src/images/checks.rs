//! Declaration-time checks for thumbnail fields.
//!
//! A thumbnail field is declared with `thumb_width` and/or `thumb_height`.
//! The declared values come from configuration and may be any TOML value,
//! so they are checked once, before any field is built, and every problem
//! is reported rather than only the first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::thumbnail::ThumbnailSize;

/// Check code for a field with neither dimension declared.
pub const MISSING_DIMENSION: &str = "thumbnail.E001";

/// Check code for a declared dimension that is not a positive integer.
pub const INVALID_DIMENSION: &str = "thumbnail.E002";

/// A raw declared dimension, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredDimension {
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
}

impl DeclaredDimension {
    /// The value as a pixel count, when it is a positive integer.
    pub fn as_pixels(&self) -> Option<u32> {
        match self {
            Self::Int(v) if *v > 0 => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl From<u32> for DeclaredDimension {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Schema configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("ThumbnailField must define a 'thumb_width' or 'thumb_height' attribute.")]
    MissingDimension,

    #[error("'{field}' must be a positive integer.")]
    InvalidDimension { field: &'static str },
}

impl SchemaError {
    /// Stable check code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingDimension => MISSING_DIMENSION,
            Self::InvalidDimension { .. } => INVALID_DIMENSION,
        }
    }
}

/// A structured check result, reported once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckMessage {
    pub message: String,
    pub code: &'static str,
    /// Name of the checked field, e.g. `avatar`.
    pub field: String,
}

impl CheckMessage {
    fn from_error(field: &str, error: &SchemaError) -> Self {
        Self {
            message: error.to_string(),
            code: error.code(),
            field: field.to_string(),
        }
    }
}

impl std::fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ({}) {}", self.field, self.code, self.message)
    }
}

fn collect_errors(
    width: Option<&DeclaredDimension>,
    height: Option<&DeclaredDimension>,
) -> Vec<SchemaError> {
    if width.is_none() && height.is_none() {
        return vec![SchemaError::MissingDimension];
    }

    [("thumb_width", width), ("thumb_height", height)]
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(v) if v.as_pixels().is_none() => Some(SchemaError::InvalidDimension { field }),
            _ => None,
        })
        .collect()
}

/// Check a field declaration and return every problem found.
///
/// An empty result means [`resolve_size`] will succeed.
pub fn check_dimensions(
    field: &str,
    width: Option<&DeclaredDimension>,
    height: Option<&DeclaredDimension>,
) -> Vec<CheckMessage> {
    collect_errors(width, height)
        .iter()
        .map(|e| CheckMessage::from_error(field, e))
        .collect()
}

/// Turn a declaration into a sizing policy, failing on the first problem.
pub fn resolve_size(
    width: Option<&DeclaredDimension>,
    height: Option<&DeclaredDimension>,
) -> Result<ThumbnailSize, SchemaError> {
    if let Some(error) = collect_errors(width, height).into_iter().next() {
        return Err(error);
    }

    let w = width.and_then(DeclaredDimension::as_pixels);
    let h = height.and_then(DeclaredDimension::as_pixels);
    match (w, h) {
        (Some(width), Some(height)) => Ok(ThumbnailSize::Fit { width, height }),
        (Some(width), None) => Ok(ThumbnailSize::Width(width)),
        (None, Some(height)) => Ok(ThumbnailSize::Height(height)),
        (None, None) => Err(SchemaError::MissingDimension),
    }
}
