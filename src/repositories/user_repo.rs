use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{CreateUser, FromSqliteRow, User, UserRole, UserSummary};

#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count_in_tenant(&self, tenant_id: &str) -> Result<i64> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE tenant_id = ?",
                [&tenant_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?")?;
            let result = stmt.query_row([&id], User::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let pool = self.pool.clone();
        let email = email.trim().to_lowercase();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM users WHERE email = ?")?;
            let result = stmt.query_row([&email], User::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Active users of the tenant other than `exclude_user_id`, staff first.
    pub async fn find_active_in_tenant(
        &self,
        tenant_id: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<UserSummary>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let exclude_user_id = exclude_user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT id, first_name, last_name, role FROM users
                 WHERE tenant_id = ? AND id != ? AND status = 'active'
                 ORDER BY role ASC, first_name ASC",
            )?;
            let users = stmt
                .query_map([&tenant_id, &exclude_user_id], |row| {
                    let role: String = row.get("role")?;
                    Ok(UserSummary {
                        user_id: row.get("id")?,
                        first_name: row.get("first_name")?,
                        last_name: row.get("last_name")?,
                        role: UserRole::parse(&role),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Ids among `user_ids` that are active members of the tenant.
    pub async fn filter_tenant_members(
        &self,
        tenant_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<String>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_ids = user_ids.to_vec();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT id FROM users WHERE id = ? AND tenant_id = ? AND status = 'active'",
            )?;
            let mut members = Vec::new();
            for id in user_ids {
                if let Some(found) = stmt
                    .query_row([&id, &tenant_id], |row| row.get::<_, String>(0))
                    .optional()?
                {
                    members.push(found);
                }
            }
            Ok(members)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn create(&self, tenant_id: &str, form: &CreateUser) -> Result<User> {
        let password_hash = hash_password(&form.password)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            email: form.email.trim().to_lowercase(),
            password_hash,
            role: form.role,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            status: "active".to_string(),
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let user_clone = user.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO users (id, tenant_id, email, password_hash, role, first_name, last_name, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    user_clone.id,
                    user_clone.tenant_id,
                    user_clone.email,
                    user_clone.password_hash,
                    user_clone.role.as_str(),
                    user_clone.first_name,
                    user_clone.last_name,
                    user_clone.status,
                    user_clone.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(user)
    }

    /// Look up an active user by email and check the password.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = self.find_by_email(email).await?;

        match user {
            Some(user) if user.is_active() => {
                if verify_password(password, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    pub async fn update_status(&self, id: &str, status: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let status = status.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE users SET status = ? WHERE id = ?",
                rusqlite::params![status, id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::PasswordHash)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AppError::PasswordHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("demo1234").unwrap();
        assert!(verify_password("demo1234", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("demo1234", "not-a-hash"),
            Err(AppError::PasswordHash)
        ));
    }
}
