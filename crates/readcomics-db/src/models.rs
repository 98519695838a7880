//! Internal Rust models matching the database schema.
//!
//! This module provides strongly-typed Rust structures that map to database tables.
//! All models use types from readcomics-common where appropriate.

use chrono::{DateTime, NaiveDate, Utc};
use readcomics_common::text::title_case;
use readcomics_common::{
    CharacterId, EmailAddressId, Gender, PersonId, PublisherId, SearchObjectType, UserId,
};
use serde::{Deserialize, Serialize};

/// User account model.
///
/// `user_image` holds the storage key of the profile photo, when one was
/// ever assigned. The thumbnail key is derived from it, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub user_image: Option<String>,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub show_email: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Name shown in the interface: the full name, else the title-cased username.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            title_case(&self.username)
        } else {
            self.name.clone()
        }
    }

    /// Fill an empty `name` from the first and last names.
    pub fn fill_name(&mut self) {
        if !self.name.is_empty() {
            return;
        }
        self.name = match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => String::new(),
        };
    }

    /// Path of the user's public profile page.
    pub fn absolute_url(&self) -> String {
        format!("/users/{}/", self.username)
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// E-mail address attached to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    pub id: EmailAddressId,
    pub user_id: UserId,
    pub email: String,
    pub verified: bool,
    pub primary: bool,
}

/// Pending confirmation for an e-mail address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailConfirmation {
    pub key: String,
    pub email_address_id: EmailAddressId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Synchronisation bookkeeping shared by every record imported from Comicvine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComicvineSync {
    pub comicvine_id: i64,
    pub comicvine_url: String,
    pub comicvine_matched: bool,
    pub created_dt: DateTime<Utc>,
    pub modified_dt: DateTime<Utc>,
}

/// Comic character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    pub id: CharacterId,
    pub sync: ComicvineSync,
    pub name: String,
    pub aliases: String,
    pub short_description: String,
    pub html_description: String,
    pub thumb_url: String,
    pub image_url: String,
}

/// Creator (writer, penciller, editor, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: PersonId,
    pub sync: ComicvineSync,
    pub name: Option<String>,
    pub aliases: Option<String>,
    pub short_description: Option<String>,
    pub html_description: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub hometown: Option<String>,
    pub country: Option<String>,
    pub thumb_url: Option<String>,
    pub image_url: Option<String>,
    pub slug: String,
}

/// Comic publisher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Publisher {
    pub id: PublisherId,
    pub sync: ComicvineSync,
    pub name: String,
    pub aliases: Option<String>,
    pub short_description: Option<String>,
    pub html_description: Option<String>,
    pub thumb_url: Option<String>,
    pub image_url: Option<String>,
    pub slug: String,
}

/// Incoming Comicvine data for a character, before it is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CharacterData {
    pub comicvine_id: i64,
    pub comicvine_url: String,
    pub comicvine_matched: bool,
    pub name: String,
    pub aliases: String,
    pub short_description: String,
    pub html_description: String,
    pub thumb_url: String,
    pub image_url: String,
}

/// Incoming Comicvine data for a person.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonData {
    pub comicvine_id: i64,
    pub comicvine_url: String,
    pub comicvine_matched: bool,
    pub name: Option<String>,
    pub aliases: Option<String>,
    pub short_description: Option<String>,
    pub html_description: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub hometown: Option<String>,
    pub country: Option<String>,
    pub thumb_url: Option<String>,
    pub image_url: Option<String>,
}

/// Incoming Comicvine data for a publisher.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublisherData {
    pub comicvine_id: i64,
    pub comicvine_url: String,
    pub comicvine_matched: bool,
    pub name: String,
    pub aliases: Option<String>,
    pub short_description: Option<String>,
    pub html_description: Option<String>,
    pub thumb_url: Option<String>,
    pub image_url: Option<String>,
}

impl std::fmt::Display for Character {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Character] {} ({})", self.name, self.sync.comicvine_id)
    }
}

impl std::fmt::Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[Person] {} ({})",
            self.name.as_deref().unwrap_or(""),
            self.sync.comicvine_id
        )
    }
}

impl std::fmt::Display for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Publisher] {} ({})", self.name, self.sync.comicvine_id)
    }
}

/// Text registered in the full-text index for one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchEntry {
    pub object_type: SearchObjectType,
    pub object_id: String,
    pub title: String,
    pub description: String,
    pub content: String,
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub object_type: SearchObjectType,
    pub object_id: String,
    pub title: String,
    pub description: String,
    pub rank: f64,
}

/// What an upsert did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}
