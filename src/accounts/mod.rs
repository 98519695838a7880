//! User accounts: sign-up, login, profile editing, e-mail confirmation and
//! profile photos.
//!
//! [`AccountService`] owns the database pool, the avatar
//! [`ThumbnailField`](crate::images::ThumbnailField) and a [`Mailer`]. Every
//! public operation is routed through the instrumentation wrapper under the
//! names listed in [`INSTRUMENTED_OPERATIONS`].

pub mod forms;
pub mod mailer;
pub mod notices;
mod service;

pub use forms::{FormErrors, PasswordChangeForm, ProfileChanges, ProfileForm, SignupForm};
pub use mailer::{LogMailer, MailError, Mailer, MemoryMailer, SentMail};
pub use notices::{Notice, NoticeLevel};
pub use service::{fallback_avatar_url, AccountService, AccountSettings, EditOutcome, EDIT_PROFILE_URL};

use thiserror::Error;

use crate::images::{StorageError, ThumbnailError};

pub const OP_REGISTER: &str = "accounts.register";
pub const OP_AUTHENTICATE: &str = "accounts.authenticate";
pub const OP_CHANGE_PASSWORD: &str = "accounts.change_password";
pub const OP_EDIT_PROFILE: &str = "accounts.edit_profile";
pub const OP_SEND_CONFIRMATION: &str = "accounts.send_email_confirmation";
pub const OP_CONFIRM_EMAIL: &str = "accounts.confirm_email";
pub const OP_CHANGE_PHOTO: &str = "accounts.change_photo";
pub const OP_DELETE_PHOTO: &str = "accounts.delete_photo";
pub const OP_TOUCH_LAST_ACTIVE: &str = "accounts.touch_last_active";

/// Every account operation that emits instrumentation events.
pub const INSTRUMENTED_OPERATIONS: &[&str] = &[
    OP_REGISTER,
    OP_AUTHENTICATE,
    OP_CHANGE_PASSWORD,
    OP_EDIT_PROFILE,
    OP_SEND_CONFIRMATION,
    OP_CONFIRM_EMAIL,
    OP_CHANGE_PHOTO,
    OP_DELETE_PHOTO,
    OP_TOUCH_LAST_ACTIVE,
];

/// Errors raised by account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Registration is closed")]
    RegistrationClosed,

    /// Submitted data failed validation.
    #[error("Invalid input: {0}")]
    Invalid(FormErrors),

    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Db(#[from] readcomics_common::Error),
}

impl AccountError {
    /// A validation error with a single message on `field`.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::new();
        errors.add(field, message);
        Self::Invalid(errors)
    }

    /// Field errors, when this is a validation failure.
    pub fn form_errors(&self) -> Option<&FormErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}
