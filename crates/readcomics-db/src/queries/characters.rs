//! Character database queries.

use chrono::{DateTime, Utc};
use readcomics_common::{CharacterId, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, parse_datetime, parse_id};
use crate::models::{Character, CharacterData, ComicvineSync, SyncOutcome};

const CHARACTER_COLS: &str = "id, comicvine_id, comicvine_url, comicvine_matched, created_dt, \
     modified_dt, name, aliases, short_description, html_description, thumb_url, image_url";

fn row_to_character(row: &Row) -> rusqlite::Result<Character> {
    Ok(Character {
        id: parse_id(0, row.get(0)?)?,
        sync: ComicvineSync {
            comicvine_id: row.get(1)?,
            comicvine_url: row.get(2)?,
            comicvine_matched: row.get(3)?,
            created_dt: parse_datetime(4, row.get(4)?)?,
            modified_dt: parse_datetime(5, row.get(5)?)?,
        },
        name: row.get(6)?,
        aliases: row.get(7)?,
        short_description: row.get(8)?,
        html_description: row.get(9)?,
        thumb_url: row.get(10)?,
        image_url: row.get(11)?,
    })
}

fn differs(existing: &Character, data: &CharacterData) -> bool {
    existing.sync.comicvine_url != data.comicvine_url
        || existing.sync.comicvine_matched != data.comicvine_matched
        || existing.name != data.name
        || existing.aliases != data.aliases
        || existing.short_description != data.short_description
        || existing.html_description != data.html_description
        || existing.thumb_url != data.thumb_url
        || existing.image_url != data.image_url
}

fn from_data(
    id: CharacterId,
    data: &CharacterData,
    created_dt: DateTime<Utc>,
    modified_dt: DateTime<Utc>,
) -> Character {
    Character {
        id,
        sync: ComicvineSync {
            comicvine_id: data.comicvine_id,
            comicvine_url: data.comicvine_url.clone(),
            comicvine_matched: data.comicvine_matched,
            created_dt,
            modified_dt,
        },
        name: data.name.clone(),
        aliases: data.aliases.clone(),
        short_description: data.short_description.clone(),
        html_description: data.html_description.clone(),
        thumb_url: data.thumb_url.clone(),
        image_url: data.image_url.clone(),
    }
}

/// Insert or update a character keyed by Comicvine id.
pub fn upsert_character(
    conn: &Connection,
    data: &CharacterData,
) -> Result<(Character, SyncOutcome)> {
    let now = Utc::now();

    let (character, outcome) = match get_character_by_comicvine_id(conn, data.comicvine_id)? {
        Some(existing) if !differs(&existing, data) => {
            return Ok((existing, SyncOutcome::Unchanged));
        }
        Some(existing) => (
            from_data(existing.id, data, existing.sync.created_dt, now),
            SyncOutcome::Updated,
        ),
        None => (
            from_data(CharacterId::new(), data, now, now),
            SyncOutcome::Created,
        ),
    };

    conn.execute(
        &format!(
            "INSERT INTO characters ({}) VALUES (:id, :comicvine_id, :comicvine_url,
             :comicvine_matched, :created_dt, :modified_dt, :name, :aliases, :short_description,
             :html_description, :thumb_url, :image_url)
             ON CONFLICT(id) DO UPDATE SET
                comicvine_url = excluded.comicvine_url,
                comicvine_matched = excluded.comicvine_matched,
                modified_dt = excluded.modified_dt,
                name = excluded.name,
                aliases = excluded.aliases,
                short_description = excluded.short_description,
                html_description = excluded.html_description,
                thumb_url = excluded.thumb_url,
                image_url = excluded.image_url",
            CHARACTER_COLS
        ),
        rusqlite::named_params! {
            ":id": character.id.to_string(),
            ":comicvine_id": character.sync.comicvine_id,
            ":comicvine_url": character.sync.comicvine_url,
            ":comicvine_matched": character.sync.comicvine_matched,
            ":created_dt": character.sync.created_dt.to_rfc3339(),
            ":modified_dt": character.sync.modified_dt.to_rfc3339(),
            ":name": character.name,
            ":aliases": character.aliases,
            ":short_description": character.short_description,
            ":html_description": character.html_description,
            ":thumb_url": character.thumb_url,
            ":image_url": character.image_url,
        },
    )
    .map_err(db_err)?;

    Ok((character, outcome))
}

/// Get a character by ID.
pub fn get_character(conn: &Connection, id: CharacterId) -> Result<Option<Character>> {
    conn.query_row(
        &format!("SELECT {} FROM characters WHERE id = ?", CHARACTER_COLS),
        [id.to_string()],
        row_to_character,
    )
    .optional()
    .map_err(db_err)
}

/// Get a character by Comicvine id.
pub fn get_character_by_comicvine_id(
    conn: &Connection,
    comicvine_id: i64,
) -> Result<Option<Character>> {
    conn.query_row(
        &format!("SELECT {} FROM characters WHERE comicvine_id = ?", CHARACTER_COLS),
        [comicvine_id],
        row_to_character,
    )
    .optional()
    .map_err(db_err)
}

/// List characters ordered by name.
pub fn list_characters(conn: &Connection) -> Result<Vec<Character>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM characters ORDER BY name", CHARACTER_COLS))
        .map_err(db_err)?;

    let characters = stmt
        .query_map([], row_to_character)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    Ok(characters)
}
