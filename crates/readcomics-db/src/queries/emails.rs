//! E-mail address and confirmation queries.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use readcomics_common::{EmailAddressId, Error, Result, UserId};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, is_unique_violation, parse_datetime, parse_id};
use crate::models::{EmailAddress, EmailConfirmation};

const EMAIL_COLS: &str = "id, user_id, email, verified, is_primary";

fn row_to_email(row: &Row) -> rusqlite::Result<EmailAddress> {
    Ok(EmailAddress {
        id: parse_id(0, row.get(0)?)?,
        user_id: parse_id(1, row.get(1)?)?,
        email: row.get(2)?,
        verified: row.get(3)?,
        primary: row.get(4)?,
    })
}

/// Generate a 64-character hex confirmation key.
fn generate_key() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Attach an unverified e-mail address to a user.
///
/// Returns `Error::Conflict` when the address already belongs to someone.
pub fn add_email(
    conn: &Connection,
    user_id: UserId,
    email: &str,
    primary: bool,
) -> Result<EmailAddress> {
    let id = EmailAddressId::new();

    conn.execute(
        "INSERT INTO email_addresses (id, user_id, email, verified, is_primary)
         VALUES (:id, :user_id, :email, 0, :primary)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":user_id": user_id.to_string(),
            ":email": email,
            ":primary": primary,
        },
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(format!("E-mail address '{}' is already in use", email))
        } else {
            db_err(e)
        }
    })?;

    Ok(EmailAddress {
        id,
        user_id,
        email: email.to_string(),
        verified: false,
        primary,
    })
}

/// Get the user's primary e-mail address.
pub fn get_primary_email(conn: &Connection, user_id: UserId) -> Result<Option<EmailAddress>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM email_addresses WHERE user_id = ? AND is_primary = 1",
            EMAIL_COLS
        ),
        [user_id.to_string()],
        row_to_email,
    )
    .optional()
    .map_err(db_err)
}

/// Whether the user's primary address has been confirmed.
///
/// A user without any primary address counts as unverified.
pub fn is_primary_verified(conn: &Connection, user_id: UserId) -> Result<bool> {
    Ok(get_primary_email(conn, user_id)?
        .map(|e| e.verified)
        .unwrap_or(false))
}

/// Replace the user's primary address.
///
/// The address record is rewritten in place and marked unverified, pending
/// confirmations for the old address are dropped, and the mirrored
/// `users.email` column is updated. A primary record is created when the
/// user has none.
///
/// The statements run on `conn` as given. Callers that update other rows
/// alongside the address wrap the call in their own transaction.
pub fn change_primary_email(
    conn: &Connection,
    user_id: UserId,
    new_email: &str,
) -> Result<EmailAddress> {
    let address = match get_primary_email(conn, user_id)? {
        Some(existing) => {
            conn.execute(
                "UPDATE email_addresses SET email = :email, verified = 0 WHERE id = :id",
                rusqlite::named_params! {
                    ":id": existing.id.to_string(),
                    ":email": new_email,
                },
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::conflict(format!("E-mail address '{}' is already in use", new_email))
                } else {
                    db_err(e)
                }
            })?;
            conn.execute(
                "DELETE FROM email_confirmations WHERE email_address_id = ?",
                [existing.id.to_string()],
            )
            .map_err(db_err)?;

            EmailAddress {
                email: new_email.to_string(),
                verified: false,
                ..existing
            }
        }
        None => add_email(conn, user_id, new_email, true)?,
    };

    conn.execute(
        "UPDATE users SET email = ? WHERE id = ?",
        rusqlite::params![new_email, user_id.to_string()],
    )
    .map_err(db_err)?;

    Ok(address)
}

/// Create a confirmation key for an address.
pub fn create_confirmation(conn: &Connection, address: &EmailAddress) -> Result<EmailConfirmation> {
    let key = generate_key();
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO email_confirmations (key, email_address_id, created_at)
         VALUES (:key, :address_id, :created_at)",
        rusqlite::named_params! {
            ":key": key,
            ":address_id": address.id.to_string(),
            ":created_at": created_at.to_rfc3339(),
        },
    )
    .map_err(db_err)?;

    Ok(EmailConfirmation {
        key,
        email_address_id: address.id,
        email: address.email.clone(),
        created_at,
    })
}

/// Consume a confirmation key and mark its address verified.
///
/// # Returns
///
/// * `Ok(EmailAddress)` - The now-verified address
/// * `Err(Error::NotFound)` - Unknown or already used key
/// * `Err(Error::InvalidInput)` - The key is older than `max_age`
pub fn confirm_email(
    conn: &Connection,
    key: &str,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<EmailAddress> {
    let tx = conn.unchecked_transaction().map_err(db_err)?;

    let found = tx
        .query_row(
            "SELECT email_address_id, created_at FROM email_confirmations WHERE key = ?",
            [key],
            |row| {
                let id: EmailAddressId = parse_id(0, row.get(0)?)?;
                let created_at = parse_datetime(1, row.get(1)?)?;
                Ok((id, created_at))
            },
        )
        .optional()
        .map_err(db_err)?;

    let (address_id, created_at) =
        found.ok_or_else(|| Error::not_found("e-mail confirmation key"))?;

    if now - created_at > max_age {
        return Err(Error::invalid_input("E-mail confirmation key has expired"));
    }

    tx.execute(
        "UPDATE email_addresses SET verified = 1 WHERE id = ?",
        [address_id.to_string()],
    )
    .map_err(db_err)?;
    tx.execute(
        "DELETE FROM email_confirmations WHERE email_address_id = ?",
        [address_id.to_string()],
    )
    .map_err(db_err)?;

    let address = tx
        .query_row(
            &format!("SELECT {} FROM email_addresses WHERE id = ?", EMAIL_COLS),
            [address_id.to_string()],
            row_to_email,
        )
        .map_err(db_err)?;

    tx.commit().map_err(db_err)?;

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;

    fn setup() -> (crate::pool::DbPool, UserId) {
        let pool = init_memory_pool().unwrap();
        let user_id = {
            let conn = pool.get().unwrap();
            users::create_user(&conn, "jdoe", "jdoe@example.com", "hash")
                .unwrap()
                .id
        };
        (pool, user_id)
    }

    #[test]
    fn test_add_and_get_primary() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();

        let added = add_email(&conn, user_id, "jdoe@example.com", true).unwrap();
        assert!(!added.verified);

        let primary = get_primary_email(&conn, user_id).unwrap().unwrap();
        assert_eq!(primary, added);
        assert!(!is_primary_verified(&conn, user_id).unwrap());
    }

    #[test]
    fn test_add_duplicate_email_case_insensitive() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();

        add_email(&conn, user_id, "jdoe@example.com", true).unwrap();
        let result = add_email(&conn, user_id, "JDOE@example.com", false);
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_confirm_email() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();

        let address = add_email(&conn, user_id, "jdoe@example.com", true).unwrap();
        let confirmation = create_confirmation(&conn, &address).unwrap();
        assert_eq!(confirmation.key.len(), 64);

        let verified =
            confirm_email(&conn, &confirmation.key, Utc::now(), Duration::days(3)).unwrap();
        assert!(verified.verified);
        assert!(is_primary_verified(&conn, user_id).unwrap());

        // Keys are single-use
        let again = confirm_email(&conn, &confirmation.key, Utc::now(), Duration::days(3));
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_confirm_email_expired() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();

        let address = add_email(&conn, user_id, "jdoe@example.com", true).unwrap();
        let confirmation = create_confirmation(&conn, &address).unwrap();

        let later = Utc::now() + Duration::days(4);
        let result = confirm_email(&conn, &confirmation.key, later, Duration::days(3));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!is_primary_verified(&conn, user_id).unwrap());
    }

    #[test]
    fn test_change_primary_email_resets_verification() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();

        let address = add_email(&conn, user_id, "jdoe@example.com", true).unwrap();
        let confirmation = create_confirmation(&conn, &address).unwrap();
        confirm_email(&conn, &confirmation.key, Utc::now(), Duration::days(3)).unwrap();

        let pending = create_confirmation(&conn, &address).unwrap();
        let changed = change_primary_email(&conn, user_id, "john@example.com").unwrap();
        assert_eq!(changed.id, address.id);
        assert_eq!(changed.email, "john@example.com");
        assert!(!changed.verified);

        let user = users::get_user(&conn, user_id).unwrap().unwrap();
        assert_eq!(user.email, "john@example.com");

        // Confirmations for the old address are dropped
        let result = confirm_email(&conn, &pending.key, Utc::now(), Duration::days(3));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_change_primary_email_creates_missing_record() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();

        let created = change_primary_email(&conn, user_id, "john@example.com").unwrap();
        assert!(created.primary);
        assert_eq!(
            get_primary_email(&conn, user_id).unwrap().unwrap().email,
            "john@example.com"
        );
    }

    #[test]
    fn test_change_primary_email_rolls_back_with_caller_transaction() {
        let (pool, user_id) = setup();
        let conn = pool.get().unwrap();
        add_email(&conn, user_id, "jdoe@example.com", true).unwrap();

        {
            let tx = conn.unchecked_transaction().unwrap();
            change_primary_email(&tx, user_id, "john@example.com").unwrap();
            // Dropped without commit
        }

        assert_eq!(
            get_primary_email(&conn, user_id).unwrap().unwrap().email,
            "jdoe@example.com"
        );
        let user = users::get_user(&conn, user_id).unwrap().unwrap();
        assert_eq!(user.email, "jdoe@example.com");
    }
}
