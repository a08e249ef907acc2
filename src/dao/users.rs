use rusqlite::params;

use crate::dao::{Database, DbError, models::UserEntity};

impl Database {
    /// Insert the user or refresh their profile fields.
    pub fn save_user(&self, user: &UserEntity) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                     username = excluded.username,
                     first_name = excluded.first_name,
                     last_name = excluded.last_name",
                params![user.user_id, user.username, user.first_name, user.last_name],
            )?;
            Ok(())
        })
    }

    /// Every user id, the audience of a broadcast.
    pub fn list_user_ids(&self) -> Result<Vec<i64>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY joined_at, user_id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    #[cfg(test)]
    fn find_user(&self, user_id: i64) -> Result<Option<UserEntity>, DbError> {
        use rusqlite::OptionalExtension;

        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT user_id, username, first_name, last_name FROM users WHERE user_id = ?1",
                    [user_id],
                    |row| {
                        Ok(UserEntity {
                            user_id: row.get(0)?,
                            username: row.get(1)?,
                            first_name: row.get(2)?,
                            last_name: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, username: Option<&str>) -> UserEntity {
        UserEntity {
            user_id: id,
            username: username.map(str::to_owned),
            first_name: Some("Ann".into()),
            last_name: None,
        }
    }

    #[test]
    fn save_user_upserts_profile() {
        let db = Database::open_in_memory().unwrap();
        db.save_user(&user(7, Some("old"))).unwrap();
        db.save_user(&user(7, Some("new"))).unwrap();
        db.save_user(&user(9, None)).unwrap();

        assert_eq!(db.list_user_ids().unwrap().len(), 2);
        let stored = db.find_user(7).unwrap().unwrap();
        assert_eq!(stored.username.as_deref(), Some("new"));
        assert!(db.find_user(8).unwrap().is_none());
    }
}
