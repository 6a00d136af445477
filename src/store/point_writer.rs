use crate::domain::{DomainError, DomainResult, EventPointWriter, SensorEvent};
use crate::store::ClickHouseClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SensorEventRow {
    pub category: String,
    pub value: f64,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub occurred_at: DateTime<Utc>,
}

impl From<&SensorEvent> for SensorEventRow {
    fn from(event: &SensorEvent) -> Self {
        SensorEventRow {
            category: event.category.clone(),
            value: event.value,
            occurred_at: event.occurred_at,
        }
    }
}

/// ClickHouse implementation of [`EventPointWriter`].
///
/// Each event becomes one row; the insert is finalized with `end()` so the
/// point has left the client-side buffer before completion is reported.
#[derive(Clone)]
pub struct ClickHousePointWriter {
    client: ClickHouseClient,
    table: String,
}

impl ClickHousePointWriter {
    pub fn new(client: ClickHouseClient, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl EventPointWriter for ClickHousePointWriter {
    async fn write_event(&self, event: &SensorEvent) -> DomainResult<()> {
        let row = SensorEventRow::from(event);

        let mut insert = self
            .client
            .get_client()
            .insert::<SensorEventRow>(&self.table)
            .map_err(|e| {
                error!(error = %e, "failed to create ClickHouse insert");
                DomainError::WriteError(e.into())
            })?;

        insert.write(&row).await.map_err(|e| {
            error!(error = %e, "failed to write event row");
            DomainError::WriteError(e.into())
        })?;

        insert.end().await.map_err(|e| {
            error!(error = %e, "failed to flush event row");
            DomainError::WriteError(e.into())
        })?;

        debug!(category = %row.category, table = %self.table, "event stored");
        Ok(())
    }
}
