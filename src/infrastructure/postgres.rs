//! Postgres adapter. Orders are stored as JSONB documents next to the few
//! columns that are queried directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;

use super::{InsertOutcome, OrderRepository, RepositoryError};
use crate::domain::aggregates::{Order, OrderStatus};

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    document: Json<Order>,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> { sqlx::migrate!("./migrations").run(&self.pool).await }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: &Order) -> Result<InsertOutcome, RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO orders (id, idempotency_key, user_id, status, city, document, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (idempotency_key) DO NOTHING",
        )
        .bind(order.id())
        .bind(order.idempotency_key())
        .bind(order.customer().user_id.as_deref())
        .bind(order.status().as_str())
        .bind(&order.customer().destination.city)
        .bind(Json(order))
        .bind(order.order_date())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            return Ok(InsertOutcome { order: order.clone(), created: true });
        }
        let row = sqlx::query_as::<_, OrderRow>("SELECT document FROM orders WHERE idempotency_key = $1")
            .bind(order.idempotency_key())
            .fetch_one(&self.pool)
            .await?;
        Ok(InsertOutcome { order: row.document.0, created: false })
    }

    async fn find(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT document FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.document.0))
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let updated_at: DateTime<Utc> = order.updated_at();
        let result = sqlx::query("UPDATE orders SET status = $2, document = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id())
            .bind(order.status().as_str())
            .bind(Json(order))
            .bind(updated_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(order.id().to_string()));
        }
        Ok(())
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT document FROM orders WHERE status = $1 ORDER BY created_at")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.document.0).collect())
    }
}
