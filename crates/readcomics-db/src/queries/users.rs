//! User database queries.
//!
//! This module provides CRUD operations for user accounts.

use chrono::{DateTime, Utc};
use readcomics_common::{Error, Gender, Result, UserId};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, format_date, is_unique_violation, parse_datetime, parse_id, parse_opt_date, parse_opt_datetime};
use crate::models::User;

const USER_COLS: &str = "id, username, email, password_hash, name, first_name, last_name, \
     gender, user_image, bio, birth_date, show_email, last_active, date_joined";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let gender: String = row.get(7)?;
    Ok(User {
        id: parse_id(0, row.get(0)?)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        name: row.get(4)?,
        first_name: row.get(5)?,
        last_name: row.get(6)?,
        gender: gender.parse::<Gender>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, e.into())
        })?,
        user_image: row.get(8)?,
        bio: row.get(9)?,
        birth_date: parse_opt_date(10, row.get(10)?)?,
        show_email: row.get(11)?,
        last_active: parse_opt_datetime(12, row.get(12)?)?,
        date_joined: parse_datetime(13, row.get(13)?)?,
    })
}

/// Create a new user.
///
/// # Arguments
///
/// * `conn` - Database connection
/// * `username` - Unique username
/// * `email` - Primary e-mail, mirrored from the e-mail address table
/// * `password_hash` - Hashed password
///
/// # Returns
///
/// * `Ok(User)` - The created user
/// * `Err(Error::Conflict)` - If the username already exists
pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let id = UserId::new();
    let date_joined = Utc::now();

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, date_joined)
         VALUES (:id, :username, :email, :password_hash, :date_joined)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":username": username,
            ":email": email,
            ":password_hash": password_hash,
            ":date_joined": date_joined.to_rfc3339(),
        },
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(format!("Username '{}' already exists", username))
        } else {
            db_err(e)
        }
    })?;

    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        name: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        gender: Gender::default(),
        user_image: None,
        bio: String::new(),
        birth_date: None,
        show_email: false,
        last_active: None,
        date_joined,
    })
}

/// Get a user by ID.
///
/// # Returns
///
/// * `Ok(Some(User))` - The user if found
/// * `Ok(None)` - If the user does not exist
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?", USER_COLS),
        [id.to_string()],
        row_to_user,
    )
    .optional()
    .map_err(db_err)
}

/// Get a user by exact username.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?", USER_COLS),
        [username],
        row_to_user,
    )
    .optional()
    .map_err(db_err)
}

/// Get a user by login: a username or any of the user's e-mail addresses,
/// both compared case-insensitively.
pub fn get_user_by_login(conn: &Connection, login: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM users
             WHERE username = :login COLLATE NOCASE
                OR id IN (SELECT user_id FROM email_addresses WHERE email = :login)
             LIMIT 1",
            USER_COLS
        ),
        rusqlite::named_params! { ":login": login },
        row_to_user,
    )
    .optional()
    .map_err(db_err)
}

/// List all users ordered by username.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM users ORDER BY username", USER_COLS))
        .map_err(db_err)?;

    let users = stmt
        .query_map([], row_to_user)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    Ok(users)
}

/// Persist the editable profile fields of `user`.
///
/// Identity, password, photo and activity columns are left untouched;
/// they have dedicated setters.
pub fn update_profile(conn: &Connection, user: &User) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE users SET
                email = :email,
                name = :name,
                first_name = :first_name,
                last_name = :last_name,
                gender = :gender,
                bio = :bio,
                birth_date = :birth_date,
                show_email = :show_email
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": user.id.to_string(),
                ":email": user.email,
                ":name": user.name,
                ":first_name": user.first_name,
                ":last_name": user.last_name,
                ":gender": user.gender.code(),
                ":bio": user.bio,
                ":birth_date": format_date(user.birth_date),
                ":show_email": user.show_email,
            },
        )
        .map_err(db_err)?;

    if rows_affected == 0 {
        return Err(Error::not_found(format!("user {}", user.id)));
    }

    Ok(())
}

/// Set or clear the storage key of the user's photo.
pub fn set_user_image(conn: &Connection, id: UserId, key: Option<&str>) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE users SET user_image = :key WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":key": key,
            },
        )
        .map_err(db_err)?;

    if rows_affected == 0 {
        return Err(Error::not_found(format!("user {}", id)));
    }

    Ok(())
}

/// Update a user's password hash.
pub fn update_password(conn: &Connection, id: UserId, password_hash: &str) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE users SET password_hash = :password_hash WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":password_hash": password_hash,
            },
        )
        .map_err(db_err)?;

    if rows_affected == 0 {
        return Err(Error::not_found(format!("user {}", id)));
    }

    Ok(())
}

/// Record the time of the user's latest activity.
pub fn set_last_active(conn: &Connection, id: UserId, at: DateTime<Utc>) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE users SET last_active = :at WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":at": at.to_rfc3339(),
            },
        )
        .map_err(db_err)?;

    if rows_affected == 0 {
        return Err(Error::not_found(format!("user {}", id)));
    }

    Ok(())
}

/// Delete a user. E-mail addresses and confirmations cascade.
///
/// # Returns
///
/// * `Ok(true)` - If the user was deleted
/// * `Ok(false)` - If the user did not exist
pub fn delete_user(conn: &Connection, id: UserId) -> Result<bool> {
    let rows_affected = conn
        .execute("DELETE FROM users WHERE id = ?", [id.to_string()])
        .map_err(db_err)?;

    Ok(rows_affected > 0)
}
