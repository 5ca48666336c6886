use chrono::Utc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{CreateAlert, FromSqliteRow, TrainingAlert};

#[derive(Clone)]
pub struct AlertRepository {
    pool: DbPool,
}

impl AlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        client_id: &str,
        form: CreateAlert,
    ) -> Result<TrainingAlert> {
        let alert = TrainingAlert {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            alert_type: form.alert_type,
            severity: form.severity,
            title: form.title,
            message: form.message,
            data: form.data,
            is_read: false,
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let a = alert.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            let data = a.data.as_ref().map(|d| d.to_string());
            conn.execute(
                "INSERT INTO training_alerts
                    (id, tenant_id, client_id, alert_type, severity, title, message, data, is_read, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    a.id,
                    a.tenant_id,
                    a.client_id,
                    a.alert_type,
                    a.severity,
                    a.title,
                    a.message,
                    data,
                    a.is_read,
                    a.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(alert)
    }

    pub async fn find_by_client(&self, tenant_id: &str, client_id: &str) -> Result<Vec<TrainingAlert>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let client_id = client_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM training_alerts
                 WHERE tenant_id = ? AND client_id = ?
                 ORDER BY created_at DESC",
            )?;
            let alerts = stmt
                .query_map([&tenant_id, &client_id], TrainingAlert::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(alerts)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
