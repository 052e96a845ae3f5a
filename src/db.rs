//! # Song Catalog Database
//!
//! Read access to the song catalog stored in SQLite, plus the schema
//! creation used by `tanda init-db` and the tests.
//!
//! ## Schema
//!
//! - `ratings(id, name, weight)`: rating levels and their selection weight
//! - `levels(id, name, weight)`: dance levels and their selection weight
//! - `songs(id, path, title, dance, rating, level, tags, same_song)`
//!
//! `tags` is a comma separated list. Songs sharing a non-null `same_song`
//! value are takes of one underlying track.

use crate::dance::DanceId;
use crate::song::{self, AttrWeights, SameSongId, SongEntry, SongId};
use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS ratings (
        id      INTEGER PRIMARY KEY,
        name    TEXT    NOT NULL UNIQUE,
        weight  REAL    NOT NULL DEFAULT 1.0
    );
    CREATE TABLE IF NOT EXISTS levels (
        id      INTEGER PRIMARY KEY,
        name    TEXT    NOT NULL UNIQUE,
        weight  REAL    NOT NULL DEFAULT 1.0
    );
    CREATE TABLE IF NOT EXISTS songs (
        id          INTEGER PRIMARY KEY,
        path        TEXT    NOT NULL UNIQUE,
        title       TEXT    NOT NULL DEFAULT '',
        dance       INTEGER NOT NULL,
        rating      INTEGER REFERENCES ratings(id),
        level       INTEGER REFERENCES levels(id),
        tags        TEXT    NOT NULL DEFAULT '',
        same_song   INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_songs_dance ON songs(dance);
";

/// Rating names and weights created by `init-db`.
pub const DEFAULT_RATINGS: &[(&str, f64)] = &[("Unrated", 2.0), ("Good", 5.0), ("Great", 7.0), ("Excellent", 9.0)];

/// Level names and weights created by `init-db`.
pub const DEFAULT_LEVELS: &[(&str, f64)] = &[("Low", 2.0), ("Normal", 6.0), ("High", 2.0)];

/// A song row as stored in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub id: SongId,
    pub path: String,
    pub title: String,
    pub dance: DanceId,
    pub rating: Option<i64>,
    pub level: Option<i64>,
    pub tags: Vec<String>,
    pub same_song: Option<SameSongId>,
}

/// Values for inserting a new song.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSong {
    pub path: String,
    pub title: String,
    pub dance: u32,
    pub rating: Option<i64>,
    pub level: Option<i64>,
    pub tags: Vec<String>,
    pub same_song: Option<i64>,
}

pub struct MusicDb {
    conn: Connection,
}

impl MusicDb {
    /// Open (or create) a catalog database file.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite refuses the connection.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open song database: {}", path.display()))?;
        debug!("Opened song database {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self { conn })
    }

    /// Create the tables if they do not exist yet.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to create song database schema")
    }

    /// Create the schema and the default ratings and levels.
    pub fn init_defaults(&self) -> Result<()> {
        self.init_schema()?;
        for (name, weight) in DEFAULT_RATINGS {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO ratings (name, weight) VALUES (?1, ?2)",
                    params![name, weight],
                )
                .with_context(|| format!("Failed to insert rating `{name}`"))?;
        }
        for (name, weight) in DEFAULT_LEVELS {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO levels (name, weight) VALUES (?1, ?2)",
                    params![name, weight],
                )
                .with_context(|| format!("Failed to insert level `{name}`"))?;
        }
        info!(
            "Initialized song database with {} ratings and {} levels",
            DEFAULT_RATINGS.len(),
            DEFAULT_LEVELS.len()
        );
        Ok(())
    }

    pub fn insert_rating(&self, name: &str, weight: f64) -> Result<i64> {
        self.conn
            .execute("INSERT INTO ratings (name, weight) VALUES (?1, ?2)", params![name, weight])
            .with_context(|| format!("Failed to insert rating `{name}`"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_level(&self, name: &str, weight: f64) -> Result<i64> {
        self.conn
            .execute("INSERT INTO levels (name, weight) VALUES (?1, ?2)", params![name, weight])
            .with_context(|| format!("Failed to insert level `{name}`"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert songs in a single transaction.
    pub fn insert_songs(&mut self, songs: &[NewSong]) -> Result<Vec<SongId>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(songs.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO songs (path, title, dance, rating, level, tags, same_song)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for song in songs {
                stmt.execute(params![
                    song.path,
                    song.title,
                    song.dance,
                    song.rating,
                    song.level,
                    song.tags.join(","),
                    song.same_song
                ])
                .with_context(|| format!("Failed to insert song: {}", song.path))?;
                ids.push(SongId(tx.last_insert_rowid()));
            }
        }
        tx.commit().context("Committing song insert transaction failed")?;
        Ok(ids)
    }

    pub fn song(&self, id: SongId) -> Result<Option<SongRecord>> {
        self.conn
            .query_row(
                "SELECT id, path, title, dance, rating, level, tags, same_song FROM songs WHERE id = ?1",
                [id.0],
                record_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to query song {id}"))
    }

    pub fn songs(&self) -> Result<Vec<SongRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, path, title, dance, rating, level, tags, same_song FROM songs ORDER BY id")
            .context("Invalid SQL statement when selecting songs")?;
        let rows = stmt.query_map([], record_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read songs")
    }

    /// Number of songs available for each dance.
    pub fn dance_counts(&self) -> Result<BTreeMap<DanceId, u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT dance, COUNT(*) FROM songs GROUP BY dance")
            .context("Invalid SQL statement when counting songs")?;
        let rows = stmt.query_map([], |row| Ok((DanceId(row.get(0)?), row.get::<_, u32>(1)?)))?;
        rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .context("Failed to count songs per dance")
    }

    /// Selector input for every song of the given dances.
    ///
    /// Rating and level weights come from their tables; the tag dimension is
    /// `tag_weight` when one of the song's tags is in `session_tags`.
    pub fn songs_for_dances(
        &self,
        dances: &[DanceId],
        session_tags: &[String],
        tag_weight: f64,
    ) -> Result<Vec<SongEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.id, s.dance, COALESCE(r.weight, 0.0), COALESCE(l.weight, 0.0), s.tags, s.same_song
                 FROM songs s
                 LEFT JOIN ratings r ON r.id = s.rating
                 LEFT JOIN levels l ON l.id = s.level
                 WHERE s.dance = ?1
                 ORDER BY s.id",
            )
            .context("Invalid SQL statement when selecting songs for a dance")?;

        let mut entries = Vec::new();
        for dance in dances {
            let rows = stmt.query_map([dance.0], |row| {
                let tags: String = row.get(4)?;
                let tag = if song::tag_affinity(&song::parse_tags(&tags), session_tags) {
                    tag_weight
                } else {
                    0.0
                };
                Ok(SongEntry {
                    id: SongId(row.get(0)?),
                    dance: DanceId(row.get(1)?),
                    weights: AttrWeights::new(row.get(2)?, row.get(3)?, tag),
                    same_song: row.get::<_, Option<i64>>(5)?.map(SameSongId),
                })
            })?;
            let before = entries.len();
            for entry in rows {
                entries.push(entry.with_context(|| format!("Failed to read songs for dance {dance}"))?);
            }
            debug!("dance {dance}: {} songs", entries.len() - before);
        }
        Ok(entries)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<SongRecord> {
    let tags: String = row.get(6)?;
    Ok(SongRecord {
        id: SongId(row.get(0)?),
        path: row.get(1)?,
        title: row.get(2)?,
        dance: DanceId(row.get(3)?),
        rating: row.get(4)?,
        level: row.get(5)?,
        tags: song::parse_tags(&tags),
        same_song: row.get::<_, Option<i64>>(7)?.map(SameSongId),
    })
}
