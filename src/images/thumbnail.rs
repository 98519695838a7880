//! Image attribute that keeps a companion thumbnail next to every original.
//!
//! Writing an image stores the original under its key, reads it back,
//! resizes it by the field's [`ThumbnailSize`] policy and stores the result
//! under the derived thumbnail key. Deleting removes the thumbnail first,
//! then the original.
//!
//! The write is not transactional: when the stored bytes cannot be decoded,
//! or the computed thumbnail would exceed [`MAX_THUMBNAIL_PIXELS`], the
//! original stays in storage and no thumbnail is produced.

use std::io::Cursor;
use std::sync::Arc;

use image::imageops::FilterType;
use thiserror::Error;

use super::storage::{StorageBackend, StorageError};

/// Errors raised while writing a thumbnailed image.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The stored bytes are not a supported image.
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The resized image could not be encoded in the source format.
    #[error("Failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    /// The sizing policy asked for more pixels than a thumbnail may have.
    #[error("Thumbnail of {width}x{height} pixels exceeds the size limit")]
    TooLarge { width: u32, height: u32 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Upper bound on `width * height` of a generated thumbnail.
///
/// Matches the decoder's default allocation limit of 512 MiB at four bytes
/// per pixel. Width-only and height-only policies upscale, so a thin
/// source can otherwise ask the resizer for an arbitrarily large buffer.
pub const MAX_THUMBNAIL_PIXELS: u64 = 512 * 1024 * 1024 / 4;

/// Derive the thumbnail key for an original key.
///
/// Only the final path component is rewritten: its extension is replaced by
/// `thumb.png`, or `.thumb.png` is appended when it has none.
///
/// ```
/// use readcomics::images::thumb_key;
///
/// assert_eq!(thumb_key("avatars/jdoe.jpg"), "avatars/jdoe.thumb.png");
/// assert_eq!(thumb_key("a.b/jdoe"), "a.b/jdoe.thumb.png");
/// ```
pub fn thumb_key(key: &str) -> String {
    let (dir, file) = match key.rfind('/') {
        Some(idx) => key.split_at(idx + 1),
        None => ("", key),
    };

    match file.rfind('.') {
        Some(dot) => format!("{}{}.thumb.png", dir, &file[..dot]),
        None => format!("{}{}.thumb.png", dir, file),
    }
}

/// Thumbnail sizing policy, fixed when the field is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    /// Fit inside the box, keeping aspect ratio. Never upscales.
    Fit { width: u32, height: u32 },
    /// Fixed width, height follows the aspect ratio.
    Width(u32),
    /// Fixed height, width follows the aspect ratio.
    Height(u32),
}

impl ThumbnailSize {
    /// Thumbnail dimensions for a source of `src_width` x `src_height`.
    ///
    /// Every computed side is at least one pixel.
    pub fn target(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        let sw = f64::from(src_width.max(1));
        let sh = f64::from(src_height.max(1));

        let (w, h) = match *self {
            Self::Fit { width, height } => {
                if src_width <= width && src_height <= height {
                    return (src_width.max(1), src_height.max(1));
                }
                let scale = (f64::from(width) / sw).min(f64::from(height) / sh);
                ((sw * scale).round(), (sh * scale).round())
            }
            Self::Width(width) => (f64::from(width), (f64::from(width) * sh / sw).round()),
            Self::Height(height) => ((f64::from(height) * sw / sh).round(), f64::from(height)),
        };

        (clamp_side(w), clamp_side(h))
    }

    /// Like [`Self::target`], rejecting results above [`MAX_THUMBNAIL_PIXELS`].
    pub fn checked_target(&self, src_width: u32, src_height: u32) -> Result<(u32, u32), ThumbnailError> {
        let (width, height) = self.target(src_width, src_height);
        if u64::from(width) * u64::from(height) > MAX_THUMBNAIL_PIXELS {
            return Err(ThumbnailError::TooLarge { width, height });
        }
        Ok((width, height))
    }
}

fn clamp_side(side: f64) -> u32 {
    if side < 1.0 {
        1
    } else if side >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        side as u32
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
    pub thumb_key: String,
    pub thumb_url: String,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

/// An image attribute backed by a storage backend.
#[derive(Clone)]
pub struct ThumbnailField {
    storage: Arc<dyn StorageBackend>,
    size: ThumbnailSize,
}

impl std::fmt::Debug for ThumbnailField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailField")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl ThumbnailField {
    /// Create a field writing to `storage` with the given sizing policy.
    ///
    /// Build `size` with [`super::checks::resolve_size`] when it comes
    /// from configuration.
    pub fn new(storage: Arc<dyn StorageBackend>, size: ThumbnailSize) -> Self {
        Self { storage, size }
    }

    pub fn size(&self) -> ThumbnailSize {
        self.size
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Store `data` under `key` and regenerate its thumbnail.
    ///
    /// # Arguments
    ///
    /// * `key` - Storage key of the original, e.g. `avatars/jdoe.png`
    /// * `data` - Raw image bytes
    ///
    /// # Returns
    ///
    /// * `Ok(StoredImage)` - Keys, URLs and thumbnail size
    /// * `Err(ThumbnailError::Decode)` - Unreadable image; the original was already written
    /// * `Err(ThumbnailError::TooLarge)` - Thumbnail over [`MAX_THUMBNAIL_PIXELS`]; the original was already written
    /// * `Err(ThumbnailError::Storage)` - Backend failure, passed through
    pub fn write(&self, key: &str, data: &[u8]) -> Result<StoredImage, ThumbnailError> {
        let key = self.storage.save(key, data)?;

        let persisted = self.storage.open(&key)?;
        let format = image::guess_format(&persisted).map_err(ThumbnailError::Decode)?;
        let img = image::load_from_memory_with_format(&persisted, format)
            .map_err(ThumbnailError::Decode)?;

        let (width, height) = self.size.checked_target(img.width(), img.height())?;
        let thumb = img.resize_exact(width, height, FilterType::Lanczos3);

        let mut buf = Cursor::new(Vec::new());
        thumb
            .write_to(&mut buf, format)
            .map_err(ThumbnailError::Encode)?;

        let thumb_key = self.storage.save(&thumb_key(&key), &buf.into_inner())?;

        tracing::debug!(
            key = %key,
            thumb_key = %thumb_key,
            format = ?format,
            width,
            height,
            "Stored image with thumbnail"
        );

        Ok(StoredImage {
            url: self.storage.url(&key),
            thumb_url: self.storage.url(&thumb_key),
            key,
            thumb_key,
            thumb_width: width,
            thumb_height: height,
        })
    }

    /// Remove the thumbnail, then the original. Missing objects are skipped.
    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        let thumb = thumb_key(key);
        if self.storage.exists(&thumb)? {
            self.storage.delete(&thumb)?;
        }
        if self.storage.exists(key)? {
            self.storage.delete(key)?;
        }
        Ok(())
    }

    /// Public URL of the original.
    pub fn url(&self, key: &str) -> String {
        self.storage.url(key)
    }

    /// Public URL of the thumbnail.
    pub fn thumb_url(&self, key: &str) -> String {
        self.storage.url(&thumb_key(key))
    }
}
