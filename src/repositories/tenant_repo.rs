use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{CreateTenant, FromSqliteRow, Tenant};

#[derive(Clone)]
pub struct TenantRepository {
    pool: DbPool,
}

impl TenantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, form: CreateTenant) -> Result<Tenant> {
        let tenant = Tenant {
            id: form.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            business_name: form.business_name,
            owner_email: form.owner_email,
            subscription_plan: form.subscription_plan,
            subscription_status: "active".to_string(),
            max_clients: form.max_clients,
            status: "active".to_string(),
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let t = tenant.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO tenants (id, business_name, owner_email, subscription_plan, subscription_status, max_clients, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    t.id,
                    t.business_name,
                    t.owner_email,
                    t.subscription_plan,
                    t.subscription_status,
                    t.max_clients,
                    t.status,
                    t.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(tenant)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM tenants WHERE id = ?")?;
            let result = stmt.query_row([&id], Tenant::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
