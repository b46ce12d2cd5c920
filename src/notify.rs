use async_trait::async_trait;
use serde::Serialize;
use sqlx::MySqlPool;
use strum_macros::AsRefStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub user_id: u64,
    pub company_id: u64,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

/// Fire-and-forget delivery. Implementations log failures instead of
/// returning them; a lost notification never fails the operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Writes notifications into the shared `notifications` table, which the
/// messaging service polls and pushes to clients.
pub struct MySqlNotifier {
    pool: MySqlPool,
}

impl MySqlNotifier {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for MySqlNotifier {
    async fn notify(&self, notification: Notification) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, company_id, `type`, title, message, priority, created_at)
            VALUES (?, ?, ?, ?, ?, ?, NOW())
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.company_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.priority.as_ref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => tracing::debug!(
                user_id = notification.user_id,
                kind = notification.kind,
                "Notification stored"
            ),
            Err(e) => tracing::error!(
                error = %e,
                user_id = notification.user_id,
                kind = notification.kind,
                "Failed to store notification"
            ),
        }
    }
}
