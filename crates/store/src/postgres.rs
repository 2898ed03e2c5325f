use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Currency, Money, RecordId};
use domain::{CheckoutSession, Order, Payment, RefundState, RefundType};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{CheckoutStore, Result, StoreError};

/// PostgreSQL-backed checkout store.
#[derive(Clone)]
pub struct PostgresCheckoutStore {
    pool: PgPool,
}

impl PostgresCheckoutStore {
    /// Creates a new PostgreSQL checkout store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_session(row: PgRow) -> Result<CheckoutSession> {
        let refund_state: String = row.try_get("refund_state")?;
        let refund_type: Option<String> = row.try_get("refund_type")?;

        Ok(CheckoutSession::restore(
            RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            row.try_get("token")?,
            row.try_get("payer_id")?,
            row.try_get("authorization_id")?,
            row.try_get("transaction_id")?,
            refund_state.parse::<RefundState>().map_err(StoreError::Corrupt)?,
            row.try_get("refund_transaction_id")?,
            refund_type
                .map(|t| t.parse::<RefundType>())
                .transpose()
                .map_err(StoreError::Corrupt)?,
            row.try_get::<Option<DateTime<Utc>>, _>("refunded_at")?,
            row.try_get("created_at")?,
        ))
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let state: String = row.try_get("state")?;
        let currency: String = row.try_get("currency")?;

        Ok(Payment {
            id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            currency: Currency::new(currency),
            state: state.parse().map_err(StoreError::Corrupt)?,
            source_id: RecordId::from_uuid(row.try_get::<Uuid, _>("source_id")?),
            payment_method_id: row.try_get("payment_method_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl CheckoutStore for PostgresCheckoutStore {
    async fn save_order(&self, order: &Order) -> Result<()> {
        // Payments are stored in their own table
        let mut body = order.clone();
        body.payments.clear();
        let body = serde_json::to_value(&body)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (number, id, state, body, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (number) DO UPDATE
            SET state = EXCLUDED.state, body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(&order.number)
        .bind(order.id.as_uuid())
        .bind(order.state.as_str())
        .bind(body)
        .execute(&mut *tx)
        .await?;

        for payment in &order.payments {
            sqlx::query(
                r#"
                INSERT INTO payments (id, order_number, amount_cents, currency, state, source_id, payment_method_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE
                SET amount_cents = EXCLUDED.amount_cents, state = EXCLUDED.state
                "#,
            )
            .bind(payment.id.as_uuid())
            .bind(&order.number)
            .bind(payment.amount.cents())
            .bind(payment.currency.code())
            .bind(payment.state.as_str())
            .bind(payment.source_id.as_uuid())
            .bind(payment.payment_method_id)
            .bind(payment.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(order = %order.number, payments = order.payments.len(), "order saved");
        Ok(())
    }

    async fn get_order(&self, number: &str) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT body FROM orders WHERE number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body: serde_json::Value = row.try_get("body")?;
        let mut order: Order = serde_json::from_value(body)?;

        let payment_rows = sqlx::query(
            r#"
            SELECT id, amount_cents, currency, state, source_id, payment_method_id, created_at
            FROM payments
            WHERE order_number = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(number)
        .fetch_all(&self.pool)
        .await?;

        order.payments = payment_rows
            .into_iter()
            .map(Self::row_to_payment)
            .collect::<Result<_>>()?;

        Ok(Some(order))
    }

    async fn save_session(&self, session: &CheckoutSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkout_sessions (
                id, token, payer_id, authorization_id, transaction_id, refund_state,
                refund_transaction_id, refund_type, refunded_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE
            SET authorization_id = EXCLUDED.authorization_id,
                transaction_id = EXCLUDED.transaction_id,
                refund_state = EXCLUDED.refund_state,
                refund_transaction_id = EXCLUDED.refund_transaction_id,
                refund_type = EXCLUDED.refund_type,
                refunded_at = EXCLUDED.refunded_at
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.token())
        .bind(session.payer_id())
        .bind(&session.authorization_id)
        .bind(&session.transaction_id)
        .bind(session.refund_state.as_str())
        .bind(&session.refund_transaction_id)
        .bind(session.refund_type.map(|t| t.as_str()))
        .bind(session.refunded_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_checkout_session_token")
            {
                return StoreError::DuplicateToken(session.token().to_string());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_session(&self, id: RecordId) -> Result<Option<CheckoutSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, token, payer_id, authorization_id, transaction_id, refund_state,
                   refund_transaction_id, refund_type, refunded_at, created_at
            FROM checkout_sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_session).transpose()
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<CheckoutSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, token, payer_id, authorization_id, transaction_id, refund_state,
                   refund_transaction_id, refund_type, refunded_at, created_at
            FROM checkout_sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_session).transpose()
    }
}
