//! Full-text search index queries.
//!
//! Records are registered with three weighted text fields: `title`,
//! `description` and `content`. Title matches count most.

use readcomics_common::{Result, SearchObjectType};
use rusqlite::types::Type;
use rusqlite::Connection;

use super::db_err;
use crate::models::{SearchEntry, SearchHit};

/// Column weights passed to bm25: the two unindexed key columns, then
/// title, description and content.
const BM25_WEIGHTS: &str = "0.0, 0.0, 10.0, 4.0, 1.0";

/// Turn free text into an FTS5 query.
///
/// Each whitespace-separated word becomes a quoted prefix term, so user
/// input can never inject FTS5 operators. Returns `None` when nothing
/// searchable is left.
pub fn build_match_query(input: &str) -> Option<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .map(|word| word.replace('"', "\"\""))
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{}\"*", word))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Add a record to the index, replacing any previous entry for it.
pub fn register(conn: &Connection, entry: &SearchEntry) -> Result<()> {
    let tx = conn.unchecked_transaction().map_err(db_err)?;

    tx.execute(
        "DELETE FROM search_entries WHERE object_type = ? AND object_id = ?",
        rusqlite::params![entry.object_type.to_string(), entry.object_id],
    )
    .map_err(db_err)?;

    tx.execute(
        "INSERT INTO search_entries (object_type, object_id, title, description, content)
         VALUES (:object_type, :object_id, :title, :description, :content)",
        rusqlite::named_params! {
            ":object_type": entry.object_type.to_string(),
            ":object_id": entry.object_id,
            ":title": entry.title,
            ":description": entry.description,
            ":content": entry.content,
        },
    )
    .map_err(db_err)?;

    tx.commit().map_err(db_err)
}

/// Remove a record from the index.
///
/// # Returns
///
/// * `Ok(true)` - If an entry was removed
/// * `Ok(false)` - If the record was not indexed
pub fn unregister(
    conn: &Connection,
    object_type: SearchObjectType,
    object_id: &str,
) -> Result<bool> {
    let rows_affected = conn
        .execute(
            "DELETE FROM search_entries WHERE object_type = ? AND object_id = ?",
            rusqlite::params![object_type.to_string(), object_id],
        )
        .map_err(db_err)?;

    Ok(rows_affected > 0)
}

/// Search the index, best matches first.
///
/// `rank` is the negated bm25 score, so larger means more relevant.
pub fn search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let Some(match_query) = build_match_query(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn
        .prepare(&format!(
            "SELECT object_type, object_id, title, description,
                    bm25(search_entries, {}) AS score
             FROM search_entries
             WHERE search_entries MATCH :query
             ORDER BY score
             LIMIT :limit",
            BM25_WEIGHTS
        ))
        .map_err(db_err)?;

    let hits = stmt
        .query_map(
            rusqlite::named_params! {
                ":query": match_query,
                ":limit": limit as i64,
            },
            |row| {
                let object_type: String = row.get(0)?;
                let score: f64 = row.get(4)?;
                Ok(SearchHit {
                    object_type: object_type.parse().map_err(|e: String| {
                        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
                    })?,
                    object_id: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    rank: -score,
                })
            },
        )
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    fn entry(object_type: SearchObjectType, id: &str, title: &str, content: &str) -> SearchEntry {
        SearchEntry {
            object_type,
            object_id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_build_match_query() {
        assert_eq!(build_match_query("   "), None);
        assert_eq!(build_match_query("spider man").unwrap(), "\"spider\"* \"man\"*");
        assert_eq!(build_match_query("a\"b").unwrap(), "\"a\"\"b\"*");
        assert_eq!(build_match_query("NOT OR").unwrap(), "\"NOT\"* \"OR\"*");
    }

    #[test]
    fn test_register_and_search() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        register(
            &conn,
            &entry(SearchObjectType::Publisher, "p1", "Marvel\nTimely", "House of Ideas"),
        )
        .unwrap();
        register(
            &conn,
            &entry(SearchObjectType::Character, "c1", "Spider-Man", "Published by Marvel"),
        )
        .unwrap();

        let hits = search(&conn, "marv", 10).unwrap();
        assert_eq!(hits.len(), 2);
        // Title match outranks a body match
        assert_eq!(hits[0].object_id, "p1");
        assert_eq!(hits[0].object_type, SearchObjectType::Publisher);
        assert!(hits[0].rank >= hits[1].rank);

        assert!(search(&conn, "timely", 10).unwrap()[0].object_id == "p1");
        assert!(search(&conn, "", 10).unwrap().is_empty());
    }

    #[test]
    fn test_register_replaces_previous_entry() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        register(&conn, &entry(SearchObjectType::Person, "x", "Stan Lee", "")).unwrap();
        register(&conn, &entry(SearchObjectType::Person, "x", "Jack Kirby", "")).unwrap();

        assert!(search(&conn, "stan", 10).unwrap().is_empty());
        assert_eq!(search(&conn, "kirby", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        register(&conn, &entry(SearchObjectType::Person, "x", "Stan Lee", "")).unwrap();
        assert!(unregister(&conn, SearchObjectType::Person, "x").unwrap());
        assert!(!unregister(&conn, SearchObjectType::Person, "x").unwrap());
        assert!(search(&conn, "stan", 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_respects_limit() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        for i in 0..5 {
            register(
                &conn,
                &entry(SearchObjectType::Character, &i.to_string(), "Robin", ""),
            )
            .unwrap();
        }
        assert_eq!(search(&conn, "robin", 3).unwrap().len(), 3);
    }
}
