use crate::domain::{
    self, reduce, CategoryCount, DomainError, DomainResult, HistogramPoint, HistogramRequest,
    RangeSpec, SelectStatement, TelemetryQueries,
};
use crate::store::ClickHouseClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use futures::{Stream, TryStreamExt};
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Row, Deserialize)]
struct HistogramRow {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    bucket: DateTime<Utc>,
    category: String,
    total: u64,
}

#[derive(Debug, Row, Deserialize)]
struct CountRow {
    total: u64,
}

#[derive(Debug, Row, Deserialize)]
struct AverageRow {
    average: f64,
}

#[derive(Debug, Row, Deserialize)]
struct CategoryCountRow {
    category: String,
    total: u64,
}

#[derive(Debug, Row, Deserialize)]
struct StartedAtRow {
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    started_at: DateTime<Utc>,
}

/// ClickHouse implementation of [`TelemetryQueries`].
///
/// Queries are built from typed fragments (see `domain::query`), executed as
/// a row cursor and folded by `domain::reduce`. Dropping the returned future
/// (an abandoned HTTP request) drops the cursor with it, so no reduction
/// continues after the caller is gone.
pub struct ClickHouseQueryRepository {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseQueryRepository {
    /// The table name ends up in query text, so it is held to the same
    /// allow-pattern as every other identifier.
    pub fn new(client: ClickHouseClient, table: String) -> DomainResult<Self> {
        if !domain::is_safe_identifier(&table) {
            return Err(DomainError::QueryError(anyhow::anyhow!(
                "invalid table name: {}",
                table
            )));
        }
        Ok(Self { client, table })
    }

    /// Execute a built statement and expose the cursor as a pull-based row
    /// stream with explicit error items.
    fn fetch_rows<T>(
        &self,
        stmt: SelectStatement,
    ) -> DomainResult<impl Stream<Item = DomainResult<T>>>
    where
        T: Row + for<'de> Deserialize<'de> + 'static,
    {
        debug!(sql = %stmt.sql, "executing store query");

        let mut query = self.client.get_client().query(&stmt.sql);
        if let Some(category) = &stmt.category {
            query = query.bind(category);
        }

        let cursor = query
            .fetch::<T>()
            .map_err(|e| DomainError::QueryError(e.into()))?;

        Ok(futures::stream::try_unfold(cursor, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(row)) => Ok(Some((row, cursor))),
                Ok(None) => Ok(None),
                Err(e) => Err(DomainError::QueryError(e.into())),
            }
        }))
    }
}

#[async_trait]
impl TelemetryQueries for ClickHouseQueryRepository {
    #[instrument(skip(self))]
    async fn histogram(&self, request: HistogramRequest) -> DomainResult<Vec<HistogramPoint>> {
        let stmt = domain::build_histogram(&self.table, &request);
        let rows = self.fetch_rows::<HistogramRow>(stmt)?;
        reduce::fold_histogram(rows.map_ok(|row| HistogramPoint {
            timestamp: row.bucket,
            count: row.total,
            category: row.category,
        }))
        .await
    }

    #[instrument(skip(self))]
    async fn daily_total(&self, category: String) -> DomainResult<u64> {
        let stmt = domain::build_daily_total(&self.table, &category);
        let rows = self.fetch_rows::<CountRow>(stmt)?;
        reduce::fold_count(rows.map_ok(|row| row.total)).await
    }

    #[instrument(skip(self))]
    async fn totals_by_category(&self, range: RangeSpec) -> DomainResult<Vec<CategoryCount>> {
        let stmt = domain::build_category_totals(&self.table, &range);
        let rows = self.fetch_rows::<CategoryCountRow>(stmt)?;
        reduce::fold_category_counts(rows.map_ok(|row| CategoryCount {
            category: row.category,
            count: row.total,
        }))
        .await
    }

    #[instrument(skip(self))]
    async fn hourly_average(&self, range: RangeSpec) -> DomainResult<f64> {
        let stmt = domain::build_hourly_average(&self.table, &range);
        let rows = self.fetch_rows::<AverageRow>(stmt)?;
        reduce::fold_average(rows.map_ok(|row| row.average)).await
    }

    #[instrument(skip(self))]
    async fn production_started_at(&self) -> DomainResult<Option<DateTime<Utc>>> {
        let stmt = domain::build_production_start(&self.table);
        let rows = self.fetch_rows::<StartedAtRow>(stmt)?;
        reduce::fold_earliest(rows.map_ok(|row| row.started_at)).await
    }
}
