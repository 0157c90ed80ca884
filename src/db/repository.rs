//! Database repository for CRUD operations and sequence allocation.
//!
//! Uses prepared statements; the sequence allocator is a single atomic
//! upsert-increment statement, never a read-then-write pair.

use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{HeatNetwork, Invitation, OrgDetails, User, UserRole, UserStatus};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== SEQUENCE OPERATIONS ====================

    /// Atomically increment the named counter and return the post-increment
    /// value. A counter that does not exist yet is created in the same
    /// statement, so the first allocation for a fresh name returns 1.
    pub async fn next_sequence_value(&self, sequence_name: &str) -> Result<i64, AppError> {
        tracing::debug!("Allocating next value for sequence '{}'", sequence_name);

        let row = sqlx::query(
            r#"
            INSERT INTO counters (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(sequence_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            tracing::error!(
                "Failed to allocate next value for sequence '{}': {:?}",
                sequence_name,
                err
            );
            AppError::Database(format!("Sequence allocation failed: {}", err))
        })?;

        let value: i64 = row.get("value");
        tracing::debug!("Sequence '{}' advanced to {}", sequence_name, value);
        Ok(value)
    }

    // ==================== USER OPERATIONS ====================

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            "SELECT id, external_login_id, email, org_details, roles, status, hn_ids, invitations FROM users",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    /// Get a user by store-assigned id.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, external_login_id, email, org_details, roles, status, hn_ids, invitations FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get a user by their federated login id.
    pub async fn get_user_by_external_login_id(
        &self,
        external_login_id: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, external_login_id, email, org_details, roles, status, hn_ids, invitations FROM users WHERE external_login_id = ?",
        )
        .bind(external_login_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Insert a new user. A duplicate external login id maps to `Conflict`.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let org_details = encode_optional(&user.org_details)?;
        let roles = encode_optional(&user.roles)?;
        let hn_ids = encode_optional(&user.hn_ids)?;
        let invitations = encode_optional(&user.invitations)?;

        sqlx::query(
            "INSERT INTO users (id, external_login_id, email, org_details, roles, status, hn_ids, invitations) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.external_login_id)
        .bind(&user.email)
        .bind(&org_details)
        .bind(&roles)
        .bind(user.status.map(|s| s.as_str()))
        .bind(&hn_ids)
        .bind(&invitations)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "A user with the external login id {} already exists",
                        user.external_login_id
                    ));
                }
            }
            AppError::from(err)
        })?;

        Ok(())
    }

    /// Replace the full stored user document.
    pub async fn replace_user(&self, id: &str, user: &User) -> Result<(), AppError> {
        let org_details = encode_optional(&user.org_details)?;
        let roles = encode_optional(&user.roles)?;
        let hn_ids = encode_optional(&user.hn_ids)?;
        let invitations = encode_optional(&user.invitations)?;

        let result = sqlx::query(
            "UPDATE users SET external_login_id = ?, email = ?, org_details = ?, roles = ?, status = ?, hn_ids = ?, invitations = ? WHERE id = ?",
        )
        .bind(&user.external_login_id)
        .bind(&user.email)
        .bind(&org_details)
        .bind(&roles)
        .bind(user.status.map(|s| s.as_str()))
        .bind(&hn_ids)
        .bind(&invitations)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    /// Delete a user.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    // ==================== HEAT NETWORK OPERATIONS ====================

    /// List all heat networks.
    pub async fn list_heat_networks(&self) -> Result<Vec<HeatNetwork>, AppError> {
        let rows = sqlx::query("SELECT id, hn_id, location, name FROM heat_networks ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(heat_network_from_row).collect())
    }

    /// Get a heat network by store-assigned id.
    pub async fn get_heat_network(&self, id: &str) -> Result<Option<HeatNetwork>, AppError> {
        let row = sqlx::query("SELECT id, hn_id, location, name FROM heat_networks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(heat_network_from_row))
    }

    /// Get heat networks whose `hn_id` is in the given list (exact-match
    /// membership filter). An empty input list yields an empty result without
    /// querying the store.
    pub async fn get_by_hn_ids(&self, hn_ids: &[String]) -> Result<Vec<HeatNetwork>, AppError> {
        if hn_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; hn_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, hn_id, location, name FROM heat_networks WHERE hn_id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for hn_id in hn_ids {
            query = query.bind(hn_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(heat_network_from_row).collect())
    }

    /// Insert a new heat network.
    pub async fn insert_heat_network(&self, heat_network: &HeatNetwork) -> Result<(), AppError> {
        sqlx::query("INSERT INTO heat_networks (id, hn_id, location, name) VALUES (?, ?, ?, ?)")
            .bind(&heat_network.id)
            .bind(&heat_network.hn_id)
            .bind(&heat_network.location)
            .bind(&heat_network.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a heat network.
    pub async fn delete_heat_network(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM heat_networks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Heat network {} not found", id)));
        }

        Ok(())
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, AppError> {
    let org_details_str: Option<String> = row.get("org_details");
    let roles_str: Option<String> = row.get("roles");
    let status_str: Option<String> = row.get("status");
    let hn_ids_str: Option<String> = row.get("hn_ids");
    let invitations_str: Option<String> = row.get("invitations");

    let org_details: Option<OrgDetails> = decode_optional(org_details_str.as_deref())?;
    let roles: Option<Vec<UserRole>> = decode_optional(roles_str.as_deref())?;
    let hn_ids: Option<Vec<String>> = decode_optional(hn_ids_str.as_deref())?;
    let invitations: Option<Vec<Invitation>> = decode_optional(invitations_str.as_deref())?;
    let status = status_str.as_deref().map(parse_status).transpose()?;

    Ok(User {
        id: row.get("id"),
        external_login_id: row.get("external_login_id"),
        email: row.get("email"),
        org_details,
        roles,
        status,
        hn_ids,
        invitations,
    })
}

fn heat_network_from_row(row: &sqlx::sqlite::SqliteRow) -> HeatNetwork {
    HeatNetwork {
        id: row.get("id"),
        hn_id: row.get("hn_id"),
        location: row.get("location"),
        name: row.get("name"),
    }
}

fn parse_status(s: &str) -> Result<UserStatus, AppError> {
    match s {
        "Active" => Ok(UserStatus::Active),
        "InActive" => Ok(UserStatus::InActive),
        "InvitationSent" => Ok(UserStatus::InvitationSent),
        "InvitationAccepted" => Ok(UserStatus::InvitationAccepted),
        "InvitationDeclined" => Ok(UserStatus::InvitationDeclined),
        other => Err(AppError::Internal(format!(
            "Unknown user status '{}' in storage",
            other
        ))),
    }
}

fn encode_optional<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>, AppError> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(AppError::from))
        .transpose()
}

fn decode_optional<'a, T: serde::Deserialize<'a>>(
    value: Option<&'a str>,
) -> Result<Option<T>, AppError> {
    value
        .map(|s| serde_json::from_str(s).map_err(AppError::from))
        .transpose()
}
