use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::MySqlPool;

use super::parse_column;
use crate::error::AppError;
use crate::model::user::{BiometricDevice, UserProfile};
use crate::store::Directory;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: u64,
    name: String,
    email: String,
    role: String,
    company_id: u64,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: row.id,
            name: row.name,
            email: row.email,
            role: parse_column(&row.role)?,
            company_id: row.company_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    device_id: String,
    company_id: u64,
    is_active: bool,
}

/// Reads the user service's `users` table and the `biometric_devices`
/// registry. Profiles found by id are cached for a short TTL; devices are
/// always read fresh so a deactivation takes effect immediately.
pub struct MySqlDirectory {
    pool: MySqlPool,
    profiles: Cache<u64, UserProfile>,
}

impl MySqlDirectory {
    pub fn new(pool: MySqlPool, cache_ttl: Duration) -> Self {
        Self {
            pool,
            profiles: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(cache_ttl)
                .build(),
        }
    }
}

#[async_trait]
impl Directory for MySqlDirectory {
    async fn find_user(&self, user_id: u64) -> Result<Option<UserProfile>, AppError> {
        if let Some(profile) = self.profiles.get(&user_id).await {
            return Ok(Some(profile));
        }

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role, company_id FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let profile = row.map(UserProfile::try_from).transpose()?;
        if let Some(profile) = &profile {
            self.profiles.insert(user_id, profile.clone()).await;
        }
        Ok(profile)
    }

    async fn find_employee_by_email(
        &self,
        company_id: u64,
        email: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, company_id
            FROM users
            WHERE email = ? AND company_id = ? AND role = 'employee'
            "#,
        )
        .bind(email)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .map(UserProfile::try_from)
        .transpose()
    }

    async fn list_employees(&self, company_id: u64) -> Result<Vec<UserProfile>, AppError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, company_id
            FROM users
            WHERE company_id = ? AND role = 'employee'
            ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(UserProfile::try_from)
        .collect()
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<BiometricDevice>, AppError> {
        let row = sqlx::query_as::<_, DeviceRow>(
            "SELECT device_id, company_id, is_active FROM biometric_devices WHERE device_id = ?",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| BiometricDevice {
            device_id: r.device_id,
            company_id: r.company_id,
            is_active: r.is_active,
        }))
    }
}
