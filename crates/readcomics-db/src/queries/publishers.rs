//! Publisher database queries.

use chrono::Utc;
use readcomics_common::text::{slugify, unique_slug};
use readcomics_common::{PublisherId, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, parse_datetime, parse_id, taken_slugs};
use crate::models::{ComicvineSync, Publisher, PublisherData, SyncOutcome};

const PUBLISHER_COLS: &str = "id, comicvine_id, comicvine_url, comicvine_matched, created_dt, \
     modified_dt, name, aliases, short_description, html_description, thumb_url, image_url, slug";

fn row_to_publisher(row: &Row) -> rusqlite::Result<Publisher> {
    Ok(Publisher {
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
        slug: row.get(12)?,
    })
}

fn differs(existing: &Publisher, data: &PublisherData) -> bool {
    existing.sync.comicvine_url != data.comicvine_url
        || existing.sync.comicvine_matched != data.comicvine_matched
        || existing.name != data.name
        || existing.aliases != data.aliases
        || existing.short_description != data.short_description
        || existing.html_description != data.html_description
        || existing.thumb_url != data.thumb_url
        || existing.image_url != data.image_url
}

/// Insert or update a publisher keyed by its Comicvine id.
///
/// `modified_dt` only moves when a stored field actually changes. The slug
/// is generated from the name on insert and never rewritten.
pub fn upsert_publisher(conn: &Connection, data: &PublisherData) -> Result<(Publisher, SyncOutcome)> {
    let now = Utc::now();

    match get_publisher_by_comicvine_id(conn, data.comicvine_id)? {
        Some(existing) if !differs(&existing, data) => Ok((existing, SyncOutcome::Unchanged)),
        Some(existing) => {
            conn.execute(
                "UPDATE publishers SET
                    comicvine_url = :comicvine_url,
                    comicvine_matched = :comicvine_matched,
                    modified_dt = :modified_dt,
                    name = :name,
                    aliases = :aliases,
                    short_description = :short_description,
                    html_description = :html_description,
                    thumb_url = :thumb_url,
                    image_url = :image_url
                 WHERE id = :id",
                rusqlite::named_params! {
                    ":id": existing.id.to_string(),
                    ":comicvine_url": data.comicvine_url,
                    ":comicvine_matched": data.comicvine_matched,
                    ":modified_dt": now.to_rfc3339(),
                    ":name": data.name,
                    ":aliases": data.aliases,
                    ":short_description": data.short_description,
                    ":html_description": data.html_description,
                    ":thumb_url": data.thumb_url,
                    ":image_url": data.image_url,
                },
            )
            .map_err(db_err)?;

            let updated = Publisher {
                sync: ComicvineSync {
                    comicvine_url: data.comicvine_url.clone(),
                    comicvine_matched: data.comicvine_matched,
                    modified_dt: now,
                    ..existing.sync
                },
                name: data.name.clone(),
                aliases: data.aliases.clone(),
                short_description: data.short_description.clone(),
                html_description: data.html_description.clone(),
                thumb_url: data.thumb_url.clone(),
                image_url: data.image_url.clone(),
                ..existing
            };
            Ok((updated, SyncOutcome::Updated))
        }
        None => {
            let taken = taken_slugs(conn, "publishers", data.comicvine_id).map_err(db_err)?;
            let slug = unique_slug(&slugify(&data.name), &taken);
            let id = PublisherId::new();

            conn.execute(
                &format!(
                    "INSERT INTO publishers ({}) VALUES (:id, :comicvine_id, :comicvine_url,
                     :comicvine_matched, :created_dt, :modified_dt, :name, :aliases,
                     :short_description, :html_description, :thumb_url, :image_url, :slug)",
                    PUBLISHER_COLS
                ),
                rusqlite::named_params! {
                    ":id": id.to_string(),
                    ":comicvine_id": data.comicvine_id,
                    ":comicvine_url": data.comicvine_url,
                    ":comicvine_matched": data.comicvine_matched,
                    ":created_dt": now.to_rfc3339(),
                    ":modified_dt": now.to_rfc3339(),
                    ":name": data.name,
                    ":aliases": data.aliases,
                    ":short_description": data.short_description,
                    ":html_description": data.html_description,
                    ":thumb_url": data.thumb_url,
                    ":image_url": data.image_url,
                    ":slug": slug,
                },
            )
            .map_err(db_err)?;

            let created = Publisher {
                id,
                sync: ComicvineSync {
                    comicvine_id: data.comicvine_id,
                    comicvine_url: data.comicvine_url.clone(),
                    comicvine_matched: data.comicvine_matched,
                    created_dt: now,
                    modified_dt: now,
                },
                name: data.name.clone(),
                aliases: data.aliases.clone(),
                short_description: data.short_description.clone(),
                html_description: data.html_description.clone(),
                thumb_url: data.thumb_url.clone(),
                image_url: data.image_url.clone(),
                slug,
            };
            Ok((created, SyncOutcome::Created))
        }
    }
}

/// Get a publisher by ID.
pub fn get_publisher(conn: &Connection, id: PublisherId) -> Result<Option<Publisher>> {
    conn.query_row(
        &format!("SELECT {} FROM publishers WHERE id = ?", PUBLISHER_COLS),
        [id.to_string()],
        row_to_publisher,
    )
    .optional()
    .map_err(db_err)
}

/// Get a publisher by its Comicvine id.
pub fn get_publisher_by_comicvine_id(conn: &Connection, comicvine_id: i64) -> Result<Option<Publisher>> {
    conn.query_row(
        &format!("SELECT {} FROM publishers WHERE comicvine_id = ?", PUBLISHER_COLS),
        [comicvine_id],
        row_to_publisher,
    )
    .optional()
    .map_err(db_err)
}

/// Get a publisher by slug.
pub fn get_publisher_by_slug(conn: &Connection, slug: &str) -> Result<Option<Publisher>> {
    conn.query_row(
        &format!("SELECT {} FROM publishers WHERE slug = ?", PUBLISHER_COLS),
        [slug],
        row_to_publisher,
    )
    .optional()
    .map_err(db_err)
}

/// List publishers ordered by name.
pub fn list_publishers(conn: &Connection) -> Result<Vec<Publisher>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM publishers ORDER BY name", PUBLISHER_COLS))
        .map_err(db_err)?;

    let publishers = stmt
        .query_map([], row_to_publisher)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    Ok(publishers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    fn marvel() -> PublisherData {
        PublisherData {
            comicvine_id: 31,
            comicvine_url: "https://comicvine.gamespot.com/marvel/4010-31/".to_string(),
            comicvine_matched: true,
            name: "Marvel".to_string(),
            aliases: Some("Marvel Comics\nTimely".to_string()),
            short_description: Some("House of Ideas".to_string()),
            html_description: Some("<p>Publisher of Spider-Man</p>".to_string()),
            thumb_url: None,
            image_url: None,
        }
    }

    #[test]
    fn test_upsert_creates_with_slug() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let (publisher, outcome) = upsert_publisher(&conn, &marvel()).unwrap();
        assert_eq!(outcome, SyncOutcome::Created);
        assert_eq!(publisher.slug, "Marvel");
        assert_eq!(publisher.sync.created_dt, publisher.sync.modified_dt);

        let found = get_publisher_by_slug(&conn, "Marvel").unwrap().unwrap();
        assert_eq!(found.id, publisher.id);
    }

    #[test]
    fn test_upsert_unchanged_keeps_modified_dt() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let (first, _) = upsert_publisher(&conn, &marvel()).unwrap();
        let (second, outcome) = upsert_publisher(&conn, &marvel()).unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(second.sync.modified_dt, first.sync.modified_dt);
    }

    #[test]
    fn test_upsert_changed_bumps_modified_and_keeps_slug() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let (first, _) = upsert_publisher(&conn, &marvel()).unwrap();

        let mut data = marvel();
        data.name = "Marvel Worldwide".to_string();
        let (updated, outcome) = upsert_publisher(&conn, &data).unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.slug, "Marvel");
        assert!(updated.sync.modified_dt >= first.sync.modified_dt);
        assert_eq!(updated.sync.created_dt, first.sync.created_dt);

        let stored = get_publisher(&conn, first.id).unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn test_duplicate_names_get_unique_slugs() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let (a, _) = upsert_publisher(&conn, &marvel()).unwrap();
        let mut other = marvel();
        other.comicvine_id = 99;
        let (b, _) = upsert_publisher(&conn, &other).unwrap();

        assert_eq!(a.slug, "Marvel");
        assert_eq!(b.slug, "Marvel-2");
    }

    #[test]
    fn test_list_publishers_sorted_by_name() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        for (id, name) in [(1, "Vertigo"), (2, "Dark Horse"), (3, "Image")] {
            let mut data = marvel();
            data.comicvine_id = id;
            data.name = name.to_string();
            upsert_publisher(&conn, &data).unwrap();
        }

        let names: Vec<_> = list_publishers(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Dark Horse", "Image", "Vertigo"]);
    }
}
