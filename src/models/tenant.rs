use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub business_name: String,
    pub owner_email: String,
    pub subscription_plan: String,
    pub subscription_status: String,
    pub max_clients: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Tenant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            business_name: row.get("business_name")?,
            owner_email: row.get("owner_email")?,
            subscription_plan: row.get("subscription_plan")?,
            subscription_status: row.get("subscription_status")?,
            max_clients: row.get("max_clients")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub id: Option<String>,
    pub business_name: String,
    pub owner_email: String,
    pub subscription_plan: String,
    pub max_clients: i64,
}
