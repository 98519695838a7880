//! CLI end-to-end tests
//!
//! Tests for the readcomics command-line interface.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the readcomics binary
#[allow(deprecated)]
fn readcomics_cmd() -> Command {
    Command::cargo_bin("readcomics").unwrap()
}

/// Temporary workspace with a config pointing the database and media
/// directory inside it.
struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(extra: &str) -> Self {
        let dir = tempdir().unwrap();
        let config = dir.path().join("readcomics.toml");
        let contents = format!(
            "database = {:?}\n\n[storage]\nmedia_root = {:?}\n\n[accounts]\npassword_hash_cost = 4\n\n{}",
            dir.path().join("readcomics.db"),
            dir.path().join("media"),
            extra
        );
        fs::write(&config, contents).unwrap();
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = readcomics_cmd();
        cmd.current_dir(self.path()).arg("-c").arg(&self.config);
        cmd
    }

    fn image(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, common::png(width, height)).unwrap();
        path
    }
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = readcomics_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = readcomics_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("readcomics"))
        .stdout(predicate::str::contains("thumbnail"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = readcomics_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "readcomics {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_check_passes_with_defaults() {
    let ws = Workspace::new("");
    ws.cmd()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("no issues"));
}

#[test]
fn test_cli_check_reports_missing_dimension() {
    let ws = Workspace::new("[avatar]\nupload_prefix = \"avatars\"\n");
    ws.cmd()
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("thumbnail.E001"));
}

#[test]
fn test_cli_check_reports_invalid_dimensions() {
    let ws = Workspace::new("[avatar]\nthumb_width = 0\nthumb_height = 1.5\n");
    ws.cmd()
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("'thumb_width' must be a positive integer."))
        .stdout(predicate::str::contains("'thumb_height' must be a positive integer."));
}

#[test]
fn test_cli_thumbnail_writes_files() {
    let ws = Workspace::new("");
    let image = ws.image("cover.png", 200, 100);

    ws.cmd()
        .arg("thumbnail")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("Original: /media/avatars/cover.png"))
        .stdout(predicate::str::contains(
            "Thumbnail: /media/avatars/cover.thumb.png (40x20)",
        ));

    assert!(ws.path().join("media/avatars/cover.png").exists());
    assert!(ws.path().join("media/avatars/cover.thumb.png").exists());
}

#[test]
fn test_cli_thumbnail_custom_key() {
    let ws = Workspace::new("[avatar]\nthumb_height = 10\n");
    let image = ws.image("cover.png", 40, 20);

    ws.cmd()
        .args(["thumbnail", "--key", "covers/issue-1.png"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("(20x10)"));

    assert!(ws.path().join("media/covers/issue-1.thumb.png").exists());
}

#[test]
fn test_cli_thumbnail_missing_file() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["thumbnail", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_cli_user_photo_lifecycle() {
    let ws = Workspace::new("");

    ws.cmd()
        .args(["create-user", "jdoe", "jdoe@example.com", "correct-horse-battery"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created user: jdoe"))
        .stdout(predicate::str::contains("/users/jdoe/"));

    let image = ws.image("me.png", 80, 80);
    ws.cmd()
        .args(["set-photo", "jdoe"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("Photo: /media/avatars/"))
        .stdout(predicate::str::contains(".thumb.png"));

    // Keys are derived from the user id, not the username
    let avatars = ws.path().join("media/avatars");
    let mut stored: Vec<String> = fs::read_dir(&avatars)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    stored.sort();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].ends_with(".png") && !stored[0].ends_with(".thumb.png"));
    assert!(stored[1].ends_with(".thumb.png"));
    assert!(stored.iter().all(|name| !name.starts_with("jdoe")));

    ws.cmd()
        .args(["delete-photo", "jdoe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/static/images/avatars/U.png"));
    assert_eq!(fs::read_dir(&avatars).unwrap().count(), 0);
}

#[test]
fn test_cli_create_user_duplicate() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["create-user", "jdoe", "jdoe@example.com", "correct-horse-battery"])
        .assert()
        .success();

    ws.cmd()
        .args(["create-user", "jdoe", "other@example.com", "correct-horse-battery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("This username has already been taken."));
}

#[test]
fn test_cli_search_empty_index() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["search", "spider"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results"));
}
