//! Integration tests for the thumbnail field over filesystem storage.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{encode, png};
use image::ImageFormat;
use readcomics::images::{
    LocalStorage, StorageBackend, StorageError, ThumbnailError, ThumbnailField, ThumbnailSize,
};
use tempfile::tempdir;

fn local_field(size: ThumbnailSize) -> (tempfile::TempDir, Arc<LocalStorage>, ThumbnailField) {
    let dir = tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path(), "/media/"));
    let field = ThumbnailField::new(storage.clone(), size);
    (dir, storage, field)
}

#[test]
fn write_creates_both_files() {
    let (dir, _storage, field) = local_field(ThumbnailSize::Width(40));

    let stored = field.write("avatars/jdoe.png", &png(400, 300)).unwrap();
    assert_eq!(stored.url, "/media/avatars/jdoe.png");
    assert_eq!(stored.thumb_url, "/media/avatars/jdoe.thumb.png");
    assert_eq!((stored.thumb_width, stored.thumb_height), (40, 30));

    let original = dir.path().join("avatars/jdoe.png");
    let thumb = dir.path().join("avatars/jdoe.thumb.png");
    assert!(original.exists());
    assert!(thumb.exists());

    let decoded = image::open(&thumb).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 30));
}

#[test]
fn fit_keeps_aspect_ratio() {
    let (_dir, storage, field) = local_field(ThumbnailSize::Fit {
        width: 100,
        height: 100,
    });

    let stored = field
        .write("covers/wide.jpg", &encode(300, 150, ImageFormat::Jpeg))
        .unwrap();
    assert_eq!((stored.thumb_width, stored.thumb_height), (100, 50));

    let bytes = storage.open(&stored.thumb_key).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
}

#[test]
fn rewrite_replaces_thumbnail() {
    let (_dir, storage, field) = local_field(ThumbnailSize::Height(20));

    field.write("avatars/jdoe.png", &png(100, 100)).unwrap();
    let stored = field.write("avatars/jdoe.png", &png(60, 120)).unwrap();
    assert_eq!((stored.thumb_width, stored.thumb_height), (10, 20));

    let thumb = image::load_from_memory(&storage.open(&stored.thumb_key).unwrap()).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (10, 20));
}

#[test]
fn undecodable_upload_keeps_original_only() {
    let (dir, _storage, field) = local_field(ThumbnailSize::Width(40));

    let result = field.write("avatars/broken.png", b"not an image");
    assert_matches!(result, Err(ThumbnailError::Decode(_)));
    assert!(dir.path().join("avatars/broken.png").exists());
    assert!(!dir.path().join("avatars/broken.thumb.png").exists());
}

#[test]
fn delete_removes_both_files() {
    let (dir, storage, field) = local_field(ThumbnailSize::Width(40));
    field.write("avatars/jdoe.png", &png(80, 80)).unwrap();

    field.delete("avatars/jdoe.png").unwrap();
    assert!(!storage.exists("avatars/jdoe.png").unwrap());
    assert!(!dir.path().join("avatars/jdoe.thumb.png").exists());

    // Deleting again is a no-op
    field.delete("avatars/jdoe.png").unwrap();
}

#[test]
fn keys_cannot_escape_media_root() {
    let (_dir, _storage, field) = local_field(ThumbnailSize::Width(40));

    let result = field.write("../outside.png", &png(10, 10));
    assert_matches!(
        result,
        Err(ThumbnailError::Storage(StorageError::InvalidKey(_)))
    );
}
