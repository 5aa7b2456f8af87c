use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Copy)]
pub struct ServiceInfo {
    pub price: i64,
    pub is_active: bool,
}

/// Lookup into the service catalog. The booking flow only needs the
/// price and whether the service is still offered.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn get_service(&self, id: i64) -> anyhow::Result<Option<ServiceInfo>>;
}

pub struct SqlCatalog {
    db: Arc<Mutex<Connection>>,
}

impl SqlCatalog {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogProvider for SqlCatalog {
    async fn get_service(&self, id: i64) -> anyhow::Result<Option<ServiceInfo>> {
        let db = self.db.lock().unwrap();
        let result = db.query_row(
            "SELECT price, status FROM services WHERE id = ?1",
            params![id],
            |row| {
                let price: i64 = row.get(0)?;
                let status: String = row.get(1)?;
                Ok(ServiceInfo {
                    price,
                    is_active: status == "active",
                })
            },
        );

        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
