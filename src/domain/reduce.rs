//! Row-stream folds for the query endpoints.
//!
//! Every fold consumes a pull-based stream of rows; the first error aborts
//! the fold and whatever was accumulated is discarded, so a partial result
//! is never returned.

use crate::domain::{CategoryCount, DomainResult, HistogramPoint};
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};

/// Histogram: append rows in the store's own order (by time, then category).
pub async fn fold_histogram<S>(rows: S) -> DomainResult<Vec<HistogramPoint>>
where
    S: Stream<Item = DomainResult<HistogramPoint>>,
{
    rows.try_fold(Vec::new(), |mut points, point| async move {
        points.push(point);
        Ok(points)
    })
    .await
}

/// Scalar count: keep the last (or only) row, 0 when the store returns none.
pub async fn fold_count<S>(rows: S) -> DomainResult<u64>
where
    S: Stream<Item = DomainResult<u64>>,
{
    rows.try_fold(0u64, |_, total| async move { Ok(total) }).await
}

/// Scalar average: last (or only) row, 0 when no rows; the store reports a
/// non-finite average over an empty set, which also reduces to 0.
pub async fn fold_average<S>(rows: S) -> DomainResult<f64>
where
    S: Stream<Item = DomainResult<f64>>,
{
    let average = rows.try_fold(0f64, |_, value| async move { Ok(value) }).await?;
    if average.is_finite() {
        Ok(average)
    } else {
        Ok(0.0)
    }
}

/// Per-category totals: one pair per distinct category row, no fixed order.
pub async fn fold_category_counts<S>(rows: S) -> DomainResult<Vec<CategoryCount>>
where
    S: Stream<Item = DomainResult<CategoryCount>>,
{
    rows.try_fold(Vec::new(), |mut counts, pair| async move {
        counts.push(pair);
        Ok(counts)
    })
    .await
}

/// Earliest timestamp: last (or only) row, `None` when the store returns no
/// rows (no production recorded yet).
pub async fn fold_earliest<S>(rows: S) -> DomainResult<Option<DateTime<Utc>>>
where
    S: Stream<Item = DomainResult<DateTime<Utc>>>,
{
    rows.try_fold(None, |_, ts| async move { Ok(Some(ts)) }).await
}

/// Format the elapsed time between two instants as zero-padded `HH:MM:SS`.
///
/// Durations of 24 hours or more widen the hour field instead of wrapping,
/// so a run that started 25 hours ago reads `25:00:00`.
pub fn format_elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let total_secs = (to - from).num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}
