use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use readcomics_common::{Error as CommonError, Gender};
use readcomics_db::models::{EmailAddress, User};
use readcomics_db::pool::{get_conn, DbPool};
use readcomics_db::queries::{emails, users};

use super::forms::{
    FormErrors, PasswordChangeForm, ProfileForm, SignupForm, DUPLICATE_USERNAME, WRONG_PASSWORD,
};
use super::mailer::Mailer;
use super::notices::Notice;
use super::{
    AccountError, OP_AUTHENTICATE, OP_CHANGE_PASSWORD, OP_CHANGE_PHOTO, OP_CONFIRM_EMAIL,
    OP_DELETE_PHOTO, OP_EDIT_PROFILE, OP_REGISTER, OP_SEND_CONFIRMATION, OP_TOUCH_LAST_ACTIVE,
};
use crate::config::Config;
use crate::images::{resolve_size, thumb_key, SchemaError, StorageBackend, ThumbnailField};
use crate::instrument::{arg, Instrumentation};

const DUPLICATE_EMAIL: &str = "A user is already registered with this e-mail address.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Path the profile form redirects to after a successful save.
pub const EDIT_PROFILE_URL: &str = "/users/edit/";

/// Account behaviour taken from the configuration.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub allow_registration: bool,
    pub last_active_timeout: Duration,
    pub confirmation_max_age: Duration,
    pub password_hash_cost: u32,
    pub static_url: String,
    pub upload_prefix: String,
}

impl AccountSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allow_registration: config.accounts.allow_registration,
            last_active_timeout: Duration::seconds(
                i64::try_from(config.accounts.last_active_timeout_secs).unwrap_or(i64::MAX),
            ),
            confirmation_max_age: Duration::days(i64::from(config.accounts.email_confirmation_days)),
            password_hash_cost: config.accounts.password_hash_cost,
            static_url: config.storage.static_url.clone(),
            upload_prefix: config.avatar.upload_prefix.clone(),
        }
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Avatar shown for users without a photo.
pub fn fallback_avatar_url(static_url: &str, gender: Gender, thumb: bool) -> String {
    format!(
        "{}/images/avatars/{}{}.png",
        static_url.trim_end_matches('/'),
        gender.code(),
        if thumb { "_thumb" } else { "" }
    )
}

/// Result of submitting the profile form.
#[derive(Debug, Clone)]
pub enum EditOutcome {
    Saved {
        user: User,
        notices: Vec<Notice>,
        redirect: String,
    },
    Invalid {
        errors: FormErrors,
        notices: Vec<Notice>,
    },
}

impl EditOutcome {
    pub fn notices(&self) -> &[Notice] {
        match self {
            Self::Saved { notices, .. } | Self::Invalid { notices, .. } => notices,
        }
    }

    fn invalid(errors: FormErrors) -> Self {
        Self::Invalid {
            errors,
            notices: vec![Notice::error("Please check entered data").with_title("Error while saving info")],
        }
    }
}

/// Account operations over a database pool, the avatar field and a mailer.
pub struct AccountService {
    pool: DbPool,
    avatar: ThumbnailField,
    mailer: Arc<dyn Mailer>,
    instrumentation: Instrumentation,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        pool: DbPool,
        avatar: ThumbnailField,
        mailer: Arc<dyn Mailer>,
        instrumentation: Instrumentation,
        settings: AccountSettings,
    ) -> Self {
        Self {
            pool,
            avatar,
            mailer,
            instrumentation,
            settings,
        }
    }

    /// Build the service from configuration.
    ///
    /// Fails when the avatar field declares no usable thumbnail dimension.
    pub fn from_config(
        config: &Config,
        pool: DbPool,
        storage: Arc<dyn StorageBackend>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, SchemaError> {
        let size = resolve_size(
            config.avatar.thumb_width.as_ref(),
            config.avatar.thumb_height.as_ref(),
        )?;
        Ok(Self::new(
            pool,
            ThumbnailField::new(storage, size),
            mailer,
            Instrumentation::from_config(&config.logging),
            AccountSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &AccountSettings {
        &self.settings
    }

    pub fn avatar(&self) -> &ThumbnailField {
        &self.avatar
    }

    /// Look up a user by exact username.
    pub fn get_user(&self, username: &str) -> Result<User, AccountError> {
        let conn = get_conn(&self.pool)?;
        users::get_user_by_username(&conn, username)?
            .ok_or_else(|| CommonError::not_found(format!("User '{}'", username)).into())
    }

    /// Create an account with an unverified primary address and mail a
    /// confirmation key to it.
    pub fn register(&self, form: &SignupForm) -> Result<User, AccountError> {
        self.instrumentation.run(
            OP_REGISTER,
            None,
            &[arg("username", &form.username), arg("email", &form.email)],
            || {
                if !self.settings.allow_registration {
                    return Err(AccountError::RegistrationClosed);
                }
                form.validate().map_err(AccountError::Invalid)?;

                let username = form.username.trim();
                let email = form.email.trim();
                let hash = bcrypt::hash(&form.password, self.settings.password_hash_cost)?;

                let conn = get_conn(&self.pool)?;
                if users::get_user_by_username(&conn, username)?.is_some() {
                    return Err(AccountError::invalid("username", DUPLICATE_USERNAME));
                }

                let tx = conn
                    .unchecked_transaction()
                    .map_err(|e| CommonError::database(e.to_string()))?;
                let user = users::create_user(&tx, username, email, &hash).map_err(|e| match e {
                    CommonError::Conflict(_) => AccountError::invalid("username", DUPLICATE_USERNAME),
                    other => other.into(),
                })?;
                let address = emails::add_email(&tx, user.id, email, true).map_err(|e| match e {
                    CommonError::Conflict(_) => AccountError::invalid("email", DUPLICATE_EMAIL),
                    other => other.into(),
                })?;
                let confirmation = emails::create_confirmation(&tx, &address)?;
                tx.commit()
                    .map_err(|e| CommonError::database(e.to_string()))?;
                drop(conn);

                self.mailer.send_confirmation(&address.email, &confirmation.key)?;
                tracing::info!(username = %user.username, "Registered user");
                Ok(user)
            },
        )
    }

    /// Check a username or e-mail address and password pair.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<User, AccountError> {
        self.instrumentation
            .run(OP_AUTHENTICATE, None, &[arg("login", &login)], || {
                let conn = get_conn(&self.pool)?;
                let user = users::get_user_by_login(&conn, login.trim())?
                    .ok_or(AccountError::InvalidCredentials)?;
                if bcrypt::verify(password, &user.password_hash)? {
                    Ok(user)
                } else {
                    Err(AccountError::InvalidCredentials)
                }
            })
    }

    pub fn change_password(&self, user: &User, form: &PasswordChangeForm) -> Result<(), AccountError> {
        self.instrumentation
            .run(OP_CHANGE_PASSWORD, Some(&user.username), &[], || {
                form.validate(&user.username).map_err(AccountError::Invalid)?;

                let conn = get_conn(&self.pool)?;
                let current = users::get_user(&conn, user.id)?
                    .ok_or_else(|| CommonError::not_found(format!("User '{}'", user.username)))?;
                if !bcrypt::verify(&form.old_password, &current.password_hash)? {
                    return Err(AccountError::invalid("old_password", WRONG_PASSWORD));
                }

                let hash = bcrypt::hash(&form.new_password1, self.settings.password_hash_cost)?;
                users::update_password(&conn, user.id, &hash)?;
                Ok(())
            })
    }

    /// Save the profile form.
    ///
    /// Validation failures are reported as [`EditOutcome::Invalid`] rather
    /// than an error so the caller can render the notices next to the form.
    pub fn edit_profile(&self, user: &User, form: &ProfileForm) -> Result<EditOutcome, AccountError> {
        self.instrumentation
            .run(OP_EDIT_PROFILE, Some(&user.username), &[arg("form", form)], || {
                let changes = match form.validate() {
                    Ok(changes) => changes,
                    Err(errors) => return Ok(EditOutcome::invalid(errors)),
                };

                let conn = get_conn(&self.pool)?;
                let primary = emails::get_primary_email(&conn, user.id)?;
                let email_changed = primary.as_ref().map(|a| a.email.as_str()) != Some(changes.email.as_str());

                let mut updated = user.clone();
                changes.apply(&mut updated);

                // The address change and the profile row commit together
                let tx = conn
                    .unchecked_transaction()
                    .map_err(|e| CommonError::database(e.to_string()))?;
                let new_address = if email_changed {
                    match emails::change_primary_email(&tx, user.id, &changes.email) {
                        Ok(address) => Some(address),
                        Err(CommonError::Conflict(_)) => {
                            let mut errors = FormErrors::new();
                            errors.add("email", DUPLICATE_EMAIL);
                            return Ok(EditOutcome::invalid(errors));
                        }
                        Err(e) => return Err(e.into()),
                    }
                } else {
                    None
                };

                if let Some(address) = &new_address {
                    updated.email = address.email.clone();
                }
                users::update_profile(&tx, &updated)?;
                let confirmation = match &new_address {
                    Some(address) => Some(emails::create_confirmation(&tx, address)?),
                    None => None,
                };
                tx.commit()
                    .map_err(|e| CommonError::database(e.to_string()))?;
                drop(conn);

                let mut notices = vec![Notice::success("Info successfully updated")];
                if let Some(confirmation) = confirmation {
                    self.mailer.send_confirmation(&confirmation.email, &confirmation.key)?;
                    notices.push(Notice::confirmation_sent(&confirmation.email));
                }

                Ok(EditOutcome::Saved {
                    user: updated,
                    notices,
                    redirect: EDIT_PROFILE_URL.to_string(),
                })
            })
    }

    /// Mail a new confirmation key when the primary address is unverified.
    ///
    /// Returns whether a mail went out.
    pub fn send_email_confirmation(&self, user: &User) -> Result<bool, AccountError> {
        self.instrumentation
            .run(OP_SEND_CONFIRMATION, Some(&user.username), &[], || {
                let conn = get_conn(&self.pool)?;
                let address = match emails::get_primary_email(&conn, user.id)? {
                    Some(address) if !address.verified => address,
                    Some(_) => return Ok(false),
                    None => {
                        tracing::warn!(username = %user.username, "User has no primary e-mail address");
                        return Ok(false);
                    }
                };
                let confirmation = emails::create_confirmation(&conn, &address)?;
                drop(conn);
                self.mailer.send_confirmation(&address.email, &confirmation.key)?;
                Ok(true)
            })
    }

    /// Redeem a confirmation key.
    pub fn confirm_email(&self, key: &str) -> Result<EmailAddress, AccountError> {
        self.instrumentation.run(OP_CONFIRM_EMAIL, None, &[arg("key", &key)], || {
            let conn = get_conn(&self.pool)?;
            Ok(emails::confirm_email(
                &conn,
                key,
                Utc::now(),
                self.settings.confirmation_max_age,
            )?)
        })
    }

    /// Whether the caller's primary address is confirmed. Anonymous callers
    /// count as verified.
    pub fn email_verified(&self, user: Option<&User>) -> Result<bool, AccountError> {
        match user {
            None => Ok(true),
            Some(user) => {
                let conn = get_conn(&self.pool)?;
                Ok(emails::is_primary_verified(&conn, user.id)?)
            }
        }
    }

    /// Store a new profile photo and its thumbnail.
    ///
    /// Returns the URL of the stored original.
    pub fn change_photo(&self, user: &User, filename: &str, data: &[u8]) -> Result<String, AccountError> {
        self.instrumentation.run(
            OP_CHANGE_PHOTO,
            Some(&user.username),
            &[arg("filename", &filename), arg("size", &data.len())],
            || {
                let ext = photo_extension(filename, data)
                    .ok_or_else(|| AccountError::invalid("file", INVALID_IMAGE))?;
                // Usernames may contain dots, so they cannot name the file
                let key = format!(
                    "{}/{}.{}",
                    self.settings.upload_prefix.trim_matches('/'),
                    user.id,
                    ext
                );

                let stored = self.avatar.write(&key, data)?;

                let conn = get_conn(&self.pool)?;
                let previous = users::get_user(&conn, user.id)?.and_then(|u| u.user_image);
                users::set_user_image(&conn, user.id, Some(&key))?;
                drop(conn);

                if let Some(old) = previous.filter(|old| *old != key) {
                    // Originals differing only by extension share a thumbnail
                    if thumb_key(&old) == stored.thumb_key {
                        self.avatar.storage().delete(&old)?;
                    } else {
                        self.avatar.delete(&old)?;
                    }
                }

                tracing::info!(username = %user.username, key = %stored.key, "Changed profile photo");
                Ok(stored.url)
            },
        )
    }

    /// Remove the profile photo and its thumbnail.
    ///
    /// Returns the fallback avatar URL.
    pub fn delete_photo(&self, user: &User) -> Result<String, AccountError> {
        self.instrumentation
            .run(OP_DELETE_PHOTO, Some(&user.username), &[], || {
                let conn = get_conn(&self.pool)?;
                let current = users::get_user(&conn, user.id)?.and_then(|u| u.user_image);
                users::set_user_image(&conn, user.id, None)?;
                drop(conn);

                if let Some(key) = current {
                    self.avatar.delete(&key)?;
                }
                Ok(fallback_avatar_url(&self.settings.static_url, user.gender, false))
            })
    }

    /// Record activity when the stored timestamp is missing or stale.
    ///
    /// Returns whether the timestamp was written.
    pub fn touch_last_active(&self, user: &User, now: DateTime<Utc>) -> Result<bool, AccountError> {
        self.instrumentation
            .run(OP_TOUCH_LAST_ACTIVE, Some(&user.username), &[arg("now", &now)], || {
                let stale = match user.last_active {
                    None => true,
                    Some(last) => now - last > self.settings.last_active_timeout,
                };
                if !stale {
                    return Ok(false);
                }
                let conn = get_conn(&self.pool)?;
                users::set_last_active(&conn, user.id, now)?;
                Ok(true)
            })
    }

    /// Where to send the user after login.
    pub fn redirect_target(user: &User) -> String {
        user.absolute_url()
    }

    pub fn image_url(&self, user: &User) -> String {
        match &user.user_image {
            Some(key) => self.avatar.url(key),
            None => fallback_avatar_url(&self.settings.static_url, user.gender, false),
        }
    }

    pub fn image_thumb_url(&self, user: &User) -> String {
        match &user.user_image {
            Some(key) => self.avatar.thumb_url(key),
            None => fallback_avatar_url(&self.settings.static_url, user.gender, true),
        }
    }
}

/// Lowercased extension from the upload name, else from the image data.
fn photo_extension(filename: &str, data: &[u8]) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            image::guess_format(data)
                .ok()
                .and_then(|f| f.extensions_str().first().map(|e| e.to_string()))
        })
}
