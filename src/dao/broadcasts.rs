use rusqlite::{OptionalExtension, Row, params};

use crate::dao::{
    Database, DbError,
    media::MediaRef,
    models::{BroadcastEntity, BroadcastMediaEntity, DeliveryLogEntity, MediaKind},
};

fn broadcast_from_row(row: &Row<'_>) -> rusqlite::Result<BroadcastEntity> {
    Ok(BroadcastEntity {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
        sent_at: row.get(4)?,
    })
}

impl Database {
    /// Insert a draft and return its id.
    pub fn create_broadcast(&self, title: &str, text: &str) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO broadcasts (title, text) VALUES (?1, ?2)",
                params![title, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Attach a stored file to a broadcast.
    pub fn add_broadcast_media(
        &self,
        broadcast_id: i64,
        kind: MediaKind,
        media: &str,
    ) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO broadcast_media (broadcast_id, kind, media_ref) VALUES (?1, ?2, ?3)",
                params![broadcast_id, kind.as_str(), media],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Broadcasts with their media count, most recent activity first.
    pub fn list_broadcasts(&self) -> Result<Vec<(BroadcastEntity, usize)>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT b.id, b.title, b.text, b.created_at, b.sent_at,
                        (SELECT COUNT(*) FROM broadcast_media m WHERE m.broadcast_id = b.id)
                 FROM broadcasts b
                 ORDER BY COALESCE(b.sent_at, b.created_at) DESC, b.id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    let count: i64 = row.get(5)?;
                    Ok((broadcast_from_row(row)?, count as usize))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Broadcast by id.
    pub fn find_broadcast(&self, id: i64) -> Result<Option<BroadcastEntity>, DbError> {
        self.with_conn(|conn| {
            let broadcast = conn
                .query_row(
                    "SELECT id, title, text, created_at, sent_at FROM broadcasts WHERE id = ?1",
                    [id],
                    broadcast_from_row,
                )
                .optional()?;
            Ok(broadcast)
        })
    }

    /// Media of a broadcast in upload order.
    pub fn list_broadcast_media(
        &self,
        broadcast_id: i64,
    ) -> Result<Vec<BroadcastMediaEntity>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, broadcast_id, kind, media_ref FROM broadcast_media
                 WHERE broadcast_id = ?1 ORDER BY id",
            )?;
            let media = stmt
                .query_map([broadcast_id], |row| {
                    Ok(BroadcastMediaEntity {
                        id: row.get(0)?,
                        broadcast_id: row.get(1)?,
                        kind: MediaKind::from_column(&row.get::<_, String>(2)?),
                        media: MediaRef::parse(&row.get::<_, String>(3)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(media)
        })
    }

    /// Stamp `sent_at` with the current time.
    pub fn mark_broadcast_sent(&self, id: i64) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE broadcasts SET sent_at = CURRENT_TIMESTAMP WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    /// Delete a broadcast; media rows and logs cascade.
    pub fn delete_broadcast(&self, id: i64) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM broadcasts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Persist the outcome of every delivery attempt in one transaction.
    pub fn record_deliveries(&self, logs: &[DeliveryLogEntity]) -> Result<(), DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO broadcast_logs (broadcast_id, user_id, ok, error)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for log in logs {
                    stmt.execute(params![log.broadcast_id, log.user_id, log.ok, log.error])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// `(delivered, failed)` counters across every send of a broadcast.
    pub fn delivery_stats(&self, broadcast_id: i64) -> Result<(usize, usize), DbError> {
        self.with_conn(|conn| {
            let (ok, failed): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(ok), 0), COALESCE(SUM(1 - ok), 0)
                 FROM broadcast_logs WHERE broadcast_id = ?1",
                [broadcast_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((ok as usize, failed as usize))
        })
    }
}
