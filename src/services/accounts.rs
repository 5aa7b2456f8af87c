use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn account_exists(&self, id: i64) -> anyhow::Result<bool>;
}

pub struct SqlAccounts {
    db: Arc<Mutex<Connection>>,
}

impl SqlAccounts {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountProvider for SqlAccounts {
    async fn account_exists(&self, id: i64) -> anyhow::Result<bool> {
        let db = self.db.lock().unwrap();
        let exists: bool = db.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
