use rusqlite::{OptionalExtension, Row, params};

use crate::dao::{Database, DbError, media::MediaRef, models::TrackEntity};

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<TrackEntity> {
    Ok(TrackEntity {
        id: row.get(0)?,
        title: row.get(1)?,
        hint: MediaRef::parse(&row.get::<_, String>(2)?),
        audio: MediaRef::parse(&row.get::<_, String>(3)?),
    })
}

impl Database {
    /// Insert a track and return its id.
    pub fn create_track(&self, title: &str, hint: &str, audio: &str) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tracks (title, hint_ref, audio_ref) VALUES (?1, ?2, ?3)",
                params![title, hint, audio],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Every track ordered by id.
    pub fn list_tracks(&self) -> Result<Vec<TrackEntity>, DbError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, hint_ref, audio_ref FROM tracks ORDER BY id")?;
            let tracks = stmt
                .query_map([], track_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tracks)
        })
    }

    /// Identifiers of every track, in id order.
    pub fn list_track_ids(&self) -> Result<Vec<i64>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM tracks ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    /// Number of tracks.
    pub fn count_tracks(&self) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Track by id.
    pub fn find_track(&self, id: i64) -> Result<Option<TrackEntity>, DbError> {
        self.with_conn(|conn| {
            let track = conn
                .query_row(
                    "SELECT id, title, hint_ref, audio_ref FROM tracks WHERE id = ?1",
                    [id],
                    track_from_row,
                )
                .optional()?;
            Ok(track)
        })
    }

    /// Update title and hint. Returns `false` when the track does not exist.
    pub fn update_track(&self, id: i64, title: &str, hint: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tracks SET title = ?1, hint_ref = ?2 WHERE id = ?3",
                params![title, hint, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Replace the hint reference of a track.
    pub fn update_track_hint(&self, id: i64, hint: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tracks SET hint_ref = ?1 WHERE id = ?2",
                params![hint, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Replace the audio reference of a track.
    pub fn update_track_audio(&self, id: i64, audio: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tracks SET audio_ref = ?1 WHERE id = ?2",
                params![audio, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a track. Returns `false` when it does not exist.
    pub fn delete_track(&self, id: i64) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM tracks WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}
