use eyre::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::config::get_app_data_prefix;

const KEY_USER_ID: &str = "user_id";
const KEY_LOGGED_IN: &str = "is_logged_in";

/// Persisted auth session: who is logged in, surviving restarts. Read on
/// startup to decide the initial route, cleared on logout.
pub struct AuthSession {
    conn: Connection,
}

impl AuthSession {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        let filepath = prefix.join("session.db");

        if let Some(parent) = filepath.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&filepath)?;
        Self::init_db(&conn)?;
        Ok(Self { conn })
    }

    fn init_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM session WHERE key=?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn save_login(&self, user_id: i64) -> Result<()> {
        self.set(KEY_USER_ID, &user_id.to_string())?;
        self.set(KEY_LOGGED_IN, "true")?;
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM session WHERE key=?", params![KEY_USER_ID])?;
        self.set(KEY_LOGGED_IN, "false")?;
        Ok(())
    }

    pub fn current_user_id(&self) -> Result<Option<i64>> {
        Ok(self.get(KEY_USER_ID)?.and_then(|v| v.parse().ok()))
    }

    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.get(KEY_LOGGED_IN)?.as_deref() == Some("true"))
    }
}
