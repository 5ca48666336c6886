use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{Client, FromSqliteRow};

#[derive(Clone)]
pub struct ClientRepository {
    pool: DbPool,
}

impl ClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> Result<Client> {
        let client = Client {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            user_id: user_id.map(str::to_string),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.map(str::to_string),
            status: "active".to_string(),
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let c = client.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO clients (id, tenant_id, user_id, first_name, last_name, email, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    c.id,
                    c.tenant_id,
                    c.user_id,
                    c.first_name,
                    c.last_name,
                    c.email,
                    c.status,
                    c.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(client)
    }

    /// Tenant-scoped lookup; clients of other tenants are invisible.
    pub async fn find_in_tenant(&self, tenant_id: &str, id: &str) -> Result<Option<Client>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM clients WHERE id = ? AND tenant_id = ?")?;
            let result = stmt.query_row([&id, &tenant_id], Client::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
