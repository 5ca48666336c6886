use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

pub const LOW_READINESS_ALERT: &str = "low_readiness";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingAlert {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for TrainingAlert {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let data: Option<String> = row.get("data")?;
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            client_id: row.get("client_id")?,
            alert_type: row.get("alert_type")?,
            severity: row.get("severity")?,
            title: row.get("title")?,
            message: row.get("message")?,
            data: data.and_then(|raw| serde_json::from_str(&raw).ok()),
            is_read: row.get("is_read")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateAlert {
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
