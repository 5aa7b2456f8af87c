use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::accounts::AccountProvider;
use crate::services::catalog::CatalogProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub catalog: Box<dyn CatalogProvider>,
    pub accounts: Box<dyn AccountProvider>,
}
