//! Comicvine catalog records and their search index entries.

use readcomics_common::Result;
use readcomics_db::models::{
    Character, CharacterData, Person, PersonData, Publisher, PublisherData, SearchHit, SyncOutcome,
};
use readcomics_db::pool::{get_conn, DbPool};
use readcomics_db::queries::{characters, people, publishers, search};

use crate::instrument::{arg, Instrumentation};
use crate::search::SearchAdapter;

pub const OP_SYNC_CHARACTER: &str = "catalog.sync_character";
pub const OP_SYNC_PERSON: &str = "catalog.sync_person";
pub const OP_SYNC_PUBLISHER: &str = "catalog.sync_publisher";
pub const OP_REINDEX: &str = "catalog.reindex";

pub const INSTRUMENTED_OPERATIONS: &[&str] =
    &[OP_SYNC_CHARACTER, OP_SYNC_PERSON, OP_SYNC_PUBLISHER, OP_REINDEX];

/// Upserts catalog records and keeps the search index in step.
pub struct CatalogService {
    pool: DbPool,
    instrumentation: Instrumentation,
}

impl CatalogService {
    pub fn new(pool: DbPool, instrumentation: Instrumentation) -> Self {
        Self {
            pool,
            instrumentation,
        }
    }

    pub fn sync_character(&self, data: &CharacterData) -> Result<(Character, SyncOutcome)> {
        self.instrumentation
            .run(OP_SYNC_CHARACTER, None, &[arg("data", data)], || {
                let conn = get_conn(&self.pool)?;
                let (character, outcome) = characters::upsert_character(&conn, data)?;
                search::register(&conn, &character.entry())?;
                Ok((character, outcome))
            })
    }

    pub fn sync_person(&self, data: &PersonData) -> Result<(Person, SyncOutcome)> {
        self.instrumentation
            .run(OP_SYNC_PERSON, None, &[arg("data", data)], || {
                let conn = get_conn(&self.pool)?;
                let (person, outcome) = people::upsert_person(&conn, data)?;
                search::register(&conn, &person.entry())?;
                Ok((person, outcome))
            })
    }

    pub fn sync_publisher(&self, data: &PublisherData) -> Result<(Publisher, SyncOutcome)> {
        self.instrumentation
            .run(OP_SYNC_PUBLISHER, None, &[arg("data", data)], || {
                let conn = get_conn(&self.pool)?;
                let (publisher, outcome) = publishers::upsert_publisher(&conn, data)?;
                search::register(&conn, &publisher.entry())?;
                Ok((publisher, outcome))
            })
    }

    /// Rebuild the index entry of every stored record.
    ///
    /// Returns the number of entries written.
    pub fn reindex(&self) -> Result<usize> {
        self.instrumentation.run(OP_REINDEX, None, &[], || {
            let conn = get_conn(&self.pool)?;
            let mut entries: Vec<_> = characters::list_characters(&conn)?
                .iter()
                .map(|c| c.entry())
                .collect();
            entries.extend(people::list_people(&conn)?.iter().map(|p| p.entry()));
            entries.extend(publishers::list_publishers(&conn)?.iter().map(|p| p.entry()));

            for entry in &entries {
                search::register(&conn, entry)?;
            }
            tracing::info!(count = entries.len(), "Rebuilt search index");
            Ok(entries.len())
        })
    }

    /// Ranked full-text search over every indexed record.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let conn = get_conn(&self.pool)?;
        search::search(&conn, query, limit)
    }
}
