//! In-app notification sink

use async_trait::async_trait;
use sqlx::PgPool;

use mazadpay_clearing::{NewNotification, Notifier};
use mazadpay_types::ClearanceResult;

use crate::error::DbError;

pub struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, notification: NewNotification) -> ClearanceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, body, link_url, related_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link_url)
        .bind(notification.related_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }
}
