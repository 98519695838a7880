//! Input validation for account operations.
//!
//! Each form takes raw user input and either produces cleaned values or a
//! [`FormErrors`] map keyed by field name.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use readcomics_common::Gender;
use readcomics_db::models::User;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_PART_NAME_LEN: usize = 150;
pub const MAX_BIO_LEN: usize = 1000;
pub const MIN_PASSWORD_LEN: usize = 8;

pub const REQUIRED: &str = "This field is required.";
pub const DUPLICATE_USERNAME: &str = "This username has already been taken.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const WRONG_PASSWORD: &str = "Your old password was entered incorrectly. Please enter it again.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

/// Field errors, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email regex"))
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"))
}

/// Whether `email` looks like a deliverable address.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

fn check_max_len(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

fn check_email(errors: &mut FormErrors, field: &str, email: &str) {
    if email.is_empty() {
        errors.add(field, REQUIRED);
    } else if !is_valid_email(email) {
        errors.add(field, INVALID_EMAIL);
    }
}

fn check_password(errors: &mut FormErrors, field: &str, password: &str, username: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                MIN_PASSWORD_LEN
            ),
        );
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        errors.add(field, "The password is too similar to the username.");
    }
}

/// New account sign-up.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    /// Validate the form. Username uniqueness is checked by the service.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        let username = self.username.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else {
            check_max_len(&mut errors, "username", username, MAX_USERNAME_LEN);
            if !username_regex().is_match(username) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        check_email(&mut errors, "email", self.email.trim());
        check_password(&mut errors, "password", &self.password, username);

        errors.into_result(())
    }
}

/// Password change for a signed-in user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    /// Validate the new password. The old one is verified by the service.
    pub fn validate(&self, username: &str) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        if self.old_password.is_empty() {
            errors.add("old_password", REQUIRED);
        }
        if self.new_password1 != self.new_password2 {
            errors.add("new_password2", PASSWORD_MISMATCH);
        }
        check_password(&mut errors, "new_password2", &self.new_password2, username);

        errors.into_result(())
    }
}

/// Raw profile edit input, as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    /// Single-letter gender code
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub bio: String,
    /// `YYYY-MM-DD`, or empty
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub show_email: bool,
}

impl ProfileForm {
    /// Prefill the form from a stored user.
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            gender: user.gender.code().to_string(),
            bio: user.bio.clone(),
            birth_date: user
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            show_email: user.show_email,
        }
    }

    pub fn validate(&self) -> Result<ProfileChanges, FormErrors> {
        let mut errors = FormErrors::new();

        let name = self.name.trim();
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        let email = self.email.trim();

        check_max_len(&mut errors, "name", name, MAX_NAME_LEN);
        check_max_len(&mut errors, "first_name", first_name, MAX_PART_NAME_LEN);
        check_max_len(&mut errors, "last_name", last_name, MAX_PART_NAME_LEN);
        check_max_len(&mut errors, "bio", &self.bio, MAX_BIO_LEN);
        check_email(&mut errors, "email", email);

        let gender = if self.gender.is_empty() {
            Gender::default()
        } else {
            match self.gender.parse::<Gender>() {
                Ok(g) => g,
                Err(_) => {
                    errors.add(
                        "gender",
                        format!(
                            "Select a valid choice. {} is not one of the available choices.",
                            self.gender
                        ),
                    );
                    Gender::default()
                }
            }
        };

        let birth_date = match self.birth_date.trim() {
            "" => None,
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("birth_date", "Enter a valid date.");
                    None
                }
            },
        };

        errors.into_result(ProfileChanges {
            name: name.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            gender,
            bio: self.bio.clone(),
            birth_date,
            show_email: self.show_email,
        })
    }
}

/// Cleaned profile values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub show_email: bool,
}

impl ProfileChanges {
    /// Copy the values onto `user` and fill an empty name.
    ///
    /// The e-mail is not copied: changing it goes through the primary
    /// address record.
    pub fn apply(&self, user: &mut User) {
        user.name = self.name.clone();
        user.first_name = self.first_name.clone();
        user.last_name = self.last_name.clone();
        user.gender = self.gender;
        user.bio = self.bio.clone();
        user.birth_date = self.birth_date;
        user.show_email = self.show_email;
        user.fill_name();
    }
}
