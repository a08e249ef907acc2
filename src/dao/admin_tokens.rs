use rusqlite::{OptionalExtension, params};

use crate::dao::{Database, DbError};

impl Database {
    /// Store a freshly minted one-time token.
    pub fn insert_admin_token(
        &self,
        token: &str,
        user_id: i64,
        expires_at: i64,
    ) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_tokens (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Delete the token and return its owner when it had not expired at `now`.
    ///
    /// The row is removed whether or not it was still valid, so a token can
    /// never be presented twice.
    pub fn consume_admin_token(&self, token: &str, now: i64) -> Result<Option<i64>, DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let row = tx
                .query_row(
                    "SELECT user_id, expires_at FROM admin_tokens WHERE token = ?1",
                    [token],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;
            let Some((user_id, expires_at)) = row else {
                return Ok(None);
            };
            tx.execute("DELETE FROM admin_tokens WHERE token = ?1", [token])?;
            tx.commit()?;

            Ok((expires_at >= now).then_some(user_id))
        })
    }

    /// Drop every token that expired before `now`.
    pub fn purge_expired_admin_tokens(&self, now: i64) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM admin_tokens WHERE expires_at < ?1", [now])?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        db.insert_admin_token("abc", 5, 1_000).unwrap();

        assert_eq!(db.consume_admin_token("abc", 900).unwrap(), Some(5));
        assert_eq!(db.consume_admin_token("abc", 900).unwrap(), None);
    }

    #[test]
    fn expired_token_is_rejected_and_removed() {
        let db = Database::open_in_memory().unwrap();
        db.insert_admin_token("old", 5, 1_000).unwrap();

        assert_eq!(db.consume_admin_token("old", 1_001).unwrap(), None);
        // Already deleted by the failed attempt.
        db.insert_admin_token("old", 6, 5_000).unwrap();
        assert_eq!(db.consume_admin_token("old", 1_001).unwrap(), Some(6));
    }

    #[test]
    fn unknown_token_yields_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.consume_admin_token("nope", 0).unwrap(), None);
    }

    #[test]
    fn purge_removes_only_expired() {
        let db = Database::open_in_memory().unwrap();
        db.insert_admin_token("a", 1, 10).unwrap();
        db.insert_admin_token("b", 1, 100).unwrap();
        assert_eq!(db.purge_expired_admin_tokens(50).unwrap(), 1);
        assert_eq!(db.consume_admin_token("b", 50).unwrap(), Some(1));
    }
}
