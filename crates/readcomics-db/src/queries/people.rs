//! Person (creator) database queries.

use chrono::Utc;
use readcomics_common::text::{slugify, unique_slug};
use readcomics_common::{PersonId, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, format_date, parse_datetime, parse_id, parse_opt_date, taken_slugs};
use crate::models::{ComicvineSync, Person, PersonData, SyncOutcome};

const PERSON_COLS: &str = "id, comicvine_id, comicvine_url, comicvine_matched, created_dt, \
     modified_dt, name, aliases, short_description, html_description, birth_date, death_date, \
     hometown, country, thumb_url, image_url, slug";

fn row_to_person(row: &Row) -> rusqlite::Result<Person> {
    Ok(Person {
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
        birth_date: parse_opt_date(10, row.get(10)?)?,
        death_date: parse_opt_date(11, row.get(11)?)?,
        hometown: row.get(12)?,
        country: row.get(13)?,
        thumb_url: row.get(14)?,
        image_url: row.get(15)?,
        slug: row.get(16)?,
    })
}

fn differs(existing: &Person, data: &PersonData) -> bool {
    existing.sync.comicvine_url != data.comicvine_url
        || existing.sync.comicvine_matched != data.comicvine_matched
        || existing.name != data.name
        || existing.aliases != data.aliases
        || existing.short_description != data.short_description
        || existing.html_description != data.html_description
        || existing.birth_date != data.birth_date
        || existing.death_date != data.death_date
        || existing.hometown != data.hometown
        || existing.country != data.country
        || existing.thumb_url != data.thumb_url
        || existing.image_url != data.image_url
}

fn apply(existing: Person, data: &PersonData, modified_dt: chrono::DateTime<Utc>) -> Person {
    Person {
        sync: ComicvineSync {
            comicvine_url: data.comicvine_url.clone(),
            comicvine_matched: data.comicvine_matched,
            modified_dt,
            ..existing.sync
        },
        name: data.name.clone(),
        aliases: data.aliases.clone(),
        short_description: data.short_description.clone(),
        html_description: data.html_description.clone(),
        birth_date: data.birth_date,
        death_date: data.death_date,
        hometown: data.hometown.clone(),
        country: data.country.clone(),
        thumb_url: data.thumb_url.clone(),
        image_url: data.image_url.clone(),
        ..existing
    }
}

/// Insert or update a person keyed by Comicvine id.
///
/// People may arrive without a name; their slug then falls back to `item`.
pub fn upsert_person(conn: &Connection, data: &PersonData) -> Result<(Person, SyncOutcome)> {
    let now = Utc::now();
    let existing = get_person_by_comicvine_id(conn, data.comicvine_id)?;

    if let Some(existing) = &existing {
        if !differs(existing, data) {
            return Ok((existing.clone(), SyncOutcome::Unchanged));
        }
    }

    let (person, outcome) = match existing {
        Some(existing) => (apply(existing, data, now), SyncOutcome::Updated),
        None => {
            let taken = taken_slugs(conn, "people", data.comicvine_id).map_err(db_err)?;
            let slug = unique_slug(&slugify(data.name.as_deref().unwrap_or("")), &taken);
            let blank = Person {
                id: PersonId::new(),
                sync: ComicvineSync {
                    comicvine_id: data.comicvine_id,
                    comicvine_url: String::new(),
                    comicvine_matched: false,
                    created_dt: now,
                    modified_dt: now,
                },
                name: None,
                aliases: None,
                short_description: None,
                html_description: None,
                birth_date: None,
                death_date: None,
                hometown: None,
                country: None,
                thumb_url: None,
                image_url: None,
                slug,
            };
            (apply(blank, data, now), SyncOutcome::Created)
        }
    };

    conn.execute(
        &format!(
            "INSERT INTO people ({}) VALUES (:id, :comicvine_id, :comicvine_url,
             :comicvine_matched, :created_dt, :modified_dt, :name, :aliases, :short_description,
             :html_description, :birth_date, :death_date, :hometown, :country, :thumb_url,
             :image_url, :slug)
             ON CONFLICT(id) DO UPDATE SET
                comicvine_url = excluded.comicvine_url,
                comicvine_matched = excluded.comicvine_matched,
                modified_dt = excluded.modified_dt,
                name = excluded.name,
                aliases = excluded.aliases,
                short_description = excluded.short_description,
                html_description = excluded.html_description,
                birth_date = excluded.birth_date,
                death_date = excluded.death_date,
                hometown = excluded.hometown,
                country = excluded.country,
                thumb_url = excluded.thumb_url,
                image_url = excluded.image_url",
            PERSON_COLS
        ),
        rusqlite::named_params! {
            ":id": person.id.to_string(),
            ":comicvine_id": person.sync.comicvine_id,
            ":comicvine_url": person.sync.comicvine_url,
            ":comicvine_matched": person.sync.comicvine_matched,
            ":created_dt": person.sync.created_dt.to_rfc3339(),
            ":modified_dt": person.sync.modified_dt.to_rfc3339(),
            ":name": person.name,
            ":aliases": person.aliases,
            ":short_description": person.short_description,
            ":html_description": person.html_description,
            ":birth_date": format_date(person.birth_date),
            ":death_date": format_date(person.death_date),
            ":hometown": person.hometown,
            ":country": person.country,
            ":thumb_url": person.thumb_url,
            ":image_url": person.image_url,
            ":slug": person.slug,
        },
    )
    .map_err(db_err)?;

    Ok((person, outcome))
}

/// Get a person by ID.
pub fn get_person(conn: &Connection, id: PersonId) -> Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {} FROM people WHERE id = ?", PERSON_COLS),
        [id.to_string()],
        row_to_person,
    )
    .optional()
    .map_err(db_err)
}

/// Get a person by Comicvine id.
pub fn get_person_by_comicvine_id(conn: &Connection, comicvine_id: i64) -> Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {} FROM people WHERE comicvine_id = ?", PERSON_COLS),
        [comicvine_id],
        row_to_person,
    )
    .optional()
    .map_err(db_err)
}

/// Get a person by slug.
pub fn get_person_by_slug(conn: &Connection, slug: &str) -> Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {} FROM people WHERE slug = ?", PERSON_COLS),
        [slug],
        row_to_person,
    )
    .optional()
    .map_err(db_err)
}

/// List people ordered by name. Unnamed people sort first, as SQLite orders NULL lowest.
pub fn list_people(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM people ORDER BY name", PERSON_COLS))
        .map_err(db_err)?;

    let people = stmt
        .query_map([], row_to_person)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    Ok(people)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use chrono::NaiveDate;

    fn kirby() -> PersonData {
        PersonData {
            comicvine_id: 5614,
            comicvine_url: "https://comicvine.gamespot.com/jack-kirby/4040-5614/".to_string(),
            comicvine_matched: true,
            name: Some("Jack Kirby".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1917, 8, 28),
            death_date: NaiveDate::from_ymd_opt(1994, 2, 6),
            hometown: Some("New York".to_string()),
            country: Some("United States".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_person_roundtrip() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let (created, outcome) = upsert_person(&conn, &kirby()).unwrap();
        assert_eq!(outcome, SyncOutcome::Created);
        assert_eq!(created.slug, "Jack-Kirby");

        let stored = get_person_by_slug(&conn, "Jack-Kirby").unwrap().unwrap();
        assert_eq!(stored, created);
        assert_eq!(stored.death_date, NaiveDate::from_ymd_opt(1994, 2, 6));
    }

    #[test]
    fn test_upsert_person_update_and_unchanged() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let (created, _) = upsert_person(&conn, &kirby()).unwrap();
        let (_, outcome) = upsert_person(&conn, &kirby()).unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);

        let mut data = kirby();
        data.aliases = Some("The King".to_string());
        let (updated, outcome) = upsert_person(&conn, &data).unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
        assert_eq!(updated.id, created.id);

        let stored = get_person(&conn, created.id).unwrap().unwrap();
        assert_eq!(stored.aliases.as_deref(), Some("The King"));
        assert_eq!(stored.slug, "Jack-Kirby");
    }

    #[test]
    fn test_unnamed_person_gets_fallback_slug() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let data = PersonData {
            comicvine_id: 1,
            comicvine_url: "https://comicvine.gamespot.com/4040-1/".to_string(),
            ..Default::default()
        };
        let (person, _) = upsert_person(&conn, &data).unwrap();
        assert_eq!(person.slug, "item");

        let data = PersonData {
            comicvine_id: 2,
            ..data
        };
        let (person, _) = upsert_person(&conn, &data).unwrap();
        assert_eq!(person.slug, "item-2");

        assert_eq!(list_people(&conn).unwrap().len(), 2);
        assert!(get_person_by_comicvine_id(&conn, 2).unwrap().is_some());
    }
}
