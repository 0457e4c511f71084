//! PostgreSQL store implementation.

use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;
use uuid::Uuid;

use super::ExecutionStore;
use crate::error::{Error, Result};
use crate::relay::{
    ActionConfig, EventId, ExecutionLog, OutcomeRecord, ProcessedEvent, RelayAction, RelayId,
};

/// PostgreSQL-backed store for production use.
///
/// Dedup relies on the primary key of `processed_events`: the claim is a
/// single `INSERT ... ON CONFLICT DO NOTHING`, so concurrent workers and
/// separate engine instances sharing the database agree on one winner.
///
/// # Database Schema
///
/// | Table              | Purpose                                        |
/// |--------------------|------------------------------------------------|
/// | `relays`           | Relay registry with the `is_active` flag       |
/// | `relay_actions`    | Ordered action chain per relay                 |
/// | `processed_events` | Dedup markers keyed by `(relay_id, event_id)`  |
/// | `execution_logs`   | Append-only audit log of job outcomes          |
///
/// # Example
///
/// ```ignore
/// use hermes::PgStore;
///
/// let store = PgStore::connect("postgres://...", 10).await?;
/// let (pool, sender) = WorkerPool::new(store, registry, PoolConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RelayActionRow {
    action_type: String,
    config: Value,
    order_index: i32,
}

#[derive(sqlx::FromRow)]
struct ExecutionLogRow {
    id: Uuid,
    relay_id: String,
    event_id: String,
    status: String,
    payload: Option<Value>,
    error_message: Option<String>,
    executed_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct ProcessedEventRow {
    relay_id: String,
    event_id: String,
    received_at: OffsetDateTime,
}

impl PgStore {
    /// Create a new PostgreSQL store from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` with a pool of at most `max_connections`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Audit records for one relay, oldest first.
    pub async fn fetch_execution_logs(&self, relay_id: &RelayId) -> Result<Vec<ExecutionLog>> {
        let rows = sqlx::query_as::<_, ExecutionLogRow>(
            r#"
            SELECT id, relay_id, event_id, status, payload, error_message, executed_at
            FROM execution_logs
            WHERE relay_id = $1
            ORDER BY executed_at ASC, id ASC
            "#,
        )
        .bind(relay_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ExecutionLog> {
                Ok(ExecutionLog {
                    id: row.id,
                    relay_id: RelayId::from(row.relay_id),
                    event_id: EventId::from(row.event_id),
                    status: row.status.parse()?,
                    payload: row.payload,
                    error_message: row.error_message,
                    executed_at: row.executed_at,
                })
            })
            .collect()
    }

    /// Dedup markers for one relay, oldest first.
    pub async fn fetch_processed_events(&self, relay_id: &RelayId) -> Result<Vec<ProcessedEvent>> {
        let rows = sqlx::query_as::<_, ProcessedEventRow>(
            r#"
            SELECT relay_id, event_id, received_at
            FROM processed_events
            WHERE relay_id = $1
            ORDER BY received_at ASC
            "#,
        )
        .bind(relay_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProcessedEvent {
                relay_id: RelayId::from(row.relay_id),
                event_id: EventId::from(row.event_id),
                received_at: row.received_at,
            })
            .collect())
    }
}

impl ExecutionStore for PgStore {
    async fn fetch_actions(&self, relay_id: &RelayId) -> Result<Vec<RelayAction>> {
        let rows = sqlx::query_as::<_, RelayActionRow>(
            r#"
            SELECT ra.action_type, ra.config, ra.order_index
            FROM relay_actions ra
            JOIN relays r ON r.id = ra.relay_id
            WHERE ra.relay_id = $1 AND r.is_active = true
            ORDER BY ra.order_index ASC
            "#,
        )
        .bind(relay_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(Error::NoActions {
                relay_id: relay_id.clone(),
            });
        }

        rows.into_iter()
            .map(|row| -> Result<RelayAction> {
                let config = match row.config {
                    Value::Null => ActionConfig::new(),
                    other => serde_json::from_value(other)?,
                };
                Ok(RelayAction::new(row.order_index, row.action_type, config))
            })
            .collect()
    }

    async fn claim_dedup(&self, relay_id: &RelayId, event_id: &EventId) -> Result<bool> {
        if event_id.is_empty() {
            return Ok(true);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (relay_id, event_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(relay_id.as_str())
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_outcome(&self, record: &OutcomeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO execution_logs (relay_id, event_id, status, payload, error_message)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.relay_id.as_str())
        .bind(record.event_id.as_str())
        .bind(record.status.as_str())
        .bind(record.payload_json())
        .bind(record.error_message())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
