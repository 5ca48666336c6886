use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    TenantOwner,
    Staff,
    #[default]
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::TenantOwner => "tenant_owner",
            UserRole::Staff => "staff",
            UserRole::Client => "client",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "super_admin" => UserRole::SuperAdmin,
            "tenant_owner" => UserRole::TenantOwner,
            "staff" => UserRole::Staff,
            _ => UserRole::Client,
        }
    }

    /// Owners, staff and super admins manage clients of the tenant.
    pub fn is_staff(&self) -> bool {
        !matches!(self, UserRole::Client)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

impl FromSqliteRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let role_str: String = row.get("role")?;
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            role: UserRole::parse(&role_str),
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Minimal user view shared with other participants (chat lists).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_as_str() {
        assert_eq!(UserRole::SuperAdmin.as_str(), "super_admin");
        assert_eq!(UserRole::TenantOwner.as_str(), "tenant_owner");
        assert_eq!(UserRole::Staff.as_str(), "staff");
        assert_eq!(UserRole::Client.as_str(), "client");
    }

    #[test]
    fn test_user_role_parse() {
        assert_eq!(UserRole::parse("super_admin"), UserRole::SuperAdmin);
        assert_eq!(UserRole::parse("tenant_owner"), UserRole::TenantOwner);
        assert_eq!(UserRole::parse("staff"), UserRole::Staff);
        assert_eq!(UserRole::parse("client"), UserRole::Client);
        assert_eq!(UserRole::parse("unknown"), UserRole::Client);
        assert_eq!(UserRole::parse(""), UserRole::Client);
    }

    #[test]
    fn test_user_role_is_staff() {
        assert!(UserRole::SuperAdmin.is_staff());
        assert!(UserRole::TenantOwner.is_staff());
        assert!(UserRole::Staff.is_staff());
        assert!(!UserRole::Client.is_staff());
    }

    #[test]
    fn test_user_role_serializes_snake_case() {
        let json = serde_json::to_string(&UserRole::TenantOwner).unwrap();
        assert_eq!(json, "\"tenant_owner\"");
    }
}
