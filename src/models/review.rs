use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub feedback: Option<String>,
    pub created_at: String,
}
