use crate::domain::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Time range of an aggregate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// From the start of the current calendar day, independent of the
    /// request's wall-clock time.
    Today,
    /// Relative lookback from now, e.g. `7d` or `12h`.
    Lookback { count: u32, unit: LookbackUnit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackUnit {
    Hours,
    Days,
}

impl RangeSpec {
    /// Default histogram range when the client supplies no `period`.
    pub fn default_lookback() -> Self {
        RangeSpec::Lookback {
            count: 1,
            unit: LookbackUnit::Days,
        }
    }
}

/// Aggregation bucket width for histogram queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    Hourly,
    Daily,
}

impl WindowSize {
    /// Derive the bucket width from the range: `1d` gets hourly buckets,
    /// `7d` and `30d` get daily buckets, anything else falls back to hourly.
    pub fn for_range(range: &RangeSpec) -> Self {
        match range {
            RangeSpec::Lookback {
                count: 7 | 30,
                unit: LookbackUnit::Days,
            } => WindowSize::Daily,
            _ => WindowSize::Hourly,
        }
    }

    fn bucket_expr(&self) -> &'static str {
        match self {
            WindowSize::Hourly => "toStartOfHour(occurred_at)",
            WindowSize::Daily => "toStartOfDay(occurred_at)",
        }
    }
}

/// Parse the `period` request parameter into a typed range.
///
/// Accepts `today` or `<n>d` / `<n>h` with a positive count. Parsing into an
/// enum is the allow-list: nothing of the raw client string ever reaches the
/// query text.
pub fn parse_period(raw: &str) -> DomainResult<RangeSpec> {
    if raw == "today" {
        return Ok(RangeSpec::Today);
    }

    let invalid = |reason: &str| DomainError::InvalidParameter {
        name: "period",
        reason: reason.to_string(),
    };

    let (digits, unit) = match raw.char_indices().last() {
        Some((i, 'd')) => (&raw[..i], LookbackUnit::Days),
        Some((i, 'h')) => (&raw[..i], LookbackUnit::Hours),
        _ => return Err(invalid("expected \"today\", \"<n>d\" or \"<n>h\"")),
    };

    let count: u32 = digits
        .parse()
        .map_err(|_| invalid("lookback count is not a number"))?;
    if count == 0 {
        return Err(invalid("lookback count must be positive"));
    }

    Ok(RangeSpec::Lookback { count, unit })
}

/// Parse the `groupInterval` request parameter. `None` means the caller
/// should fall back to [`WindowSize::for_range`].
pub fn parse_group_interval(raw: &str) -> Option<WindowSize> {
    match raw {
        "1h" => Some(WindowSize::Hourly),
        "1d" => Some(WindowSize::Daily),
        _ => None,
    }
}

/// Allow-pattern check for values that identify categories or tables:
/// alphanumeric, underscore and hyphen only. Everything that crosses into
/// query text or travels as a bind value is validated against this first.
pub fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate a client-supplied category filter.
pub fn validate_category(value: &str) -> DomainResult<()> {
    if is_safe_identifier(value) {
        Ok(())
    } else {
        Err(DomainError::InvalidParameter {
            name: "bagType",
            reason: "only alphanumeric, underscore and hyphen are allowed".to_string(),
        })
    }
}

/// A built store query: SQL text plus the optional category bind value.
///
/// The SQL is assembled exclusively from typed fragments; the only
/// client-influenced value is `category`, which travels as a bound
/// parameter, never interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub sql: String,
    pub category: Option<String>,
}

fn range_predicate(range: &RangeSpec) -> String {
    match range {
        RangeSpec::Today => "occurred_at >= toStartOfDay(now())".to_string(),
        RangeSpec::Lookback { count, unit } => {
            let unit = match unit {
                LookbackUnit::Hours => "HOUR",
                LookbackUnit::Days => "DAY",
            };
            format!("occurred_at >= now() - INTERVAL {} {}", count, unit)
        }
    }
}

/// Parameters of a time-series histogram query.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRequest {
    pub range: RangeSpec,
    pub window: WindowSize,
    pub category: Option<String>,
}

pub fn build_histogram(table: &str, request: &HistogramRequest) -> SelectStatement {
    let filter = if request.category.is_some() {
        " AND category = ?"
    } else {
        ""
    };
    SelectStatement {
        sql: format!(
            "SELECT {} AS bucket, category, count() AS total \
             FROM {} WHERE {}{} \
             GROUP BY bucket, category ORDER BY bucket ASC, category ASC",
            request.window.bucket_expr(),
            table,
            range_predicate(&request.range),
            filter,
        ),
        category: request.category.clone(),
    }
}

pub fn build_daily_total(table: &str, category: &str) -> SelectStatement {
    SelectStatement {
        sql: format!(
            "SELECT count() AS total FROM {} \
             WHERE occurred_at >= toStartOfDay(now()) AND category = ?",
            table,
        ),
        category: Some(category.to_string()),
    }
}

pub fn build_category_totals(table: &str, range: &RangeSpec) -> SelectStatement {
    SelectStatement {
        sql: format!(
            "SELECT category, count() AS total FROM {} WHERE {} GROUP BY category",
            table,
            range_predicate(range),
        ),
        category: None,
    }
}

pub fn build_hourly_average(table: &str, range: &RangeSpec) -> SelectStatement {
    SelectStatement {
        sql: format!(
            "SELECT avg(total) AS average FROM \
             (SELECT toStartOfHour(occurred_at) AS bucket, count() AS total \
             FROM {} WHERE {} GROUP BY bucket)",
            table,
            range_predicate(range),
        ),
        category: None,
    }
}

pub fn build_production_start(table: &str) -> SelectStatement {
    SelectStatement {
        sql: format!(
            "SELECT min(occurred_at) AS started_at FROM {} \
             WHERE occurred_at >= toStartOfDay(now()) HAVING count() > 0",
            table,
        ),
        category: None,
    }
}

/// One histogram bucket: event count per window per category.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPoint {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
    pub category: String,
}

/// Event count for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Query port used by the HTTP handlers. The store adapter builds the SQL,
/// executes it and reduces the row stream into these shapes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryQueries: Send + Sync {
    async fn histogram(&self, request: HistogramRequest) -> DomainResult<Vec<HistogramPoint>>;

    /// Total event count for one category since the start of today.
    async fn daily_total(&self, category: String) -> DomainResult<u64>;

    async fn totals_by_category(&self, range: RangeSpec) -> DomainResult<Vec<CategoryCount>>;

    /// Average of per-hour event counts over the range; 0 when no data.
    async fn hourly_average(&self, range: RangeSpec) -> DomainResult<f64>;

    /// Earliest event timestamp since the start of today, if any.
    async fn production_started_at(&self) -> DomainResult<Option<DateTime<Utc>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period_today() {
        assert_eq!(parse_period("today").unwrap(), RangeSpec::Today);
    }

    #[test]
    fn test_parse_period_lookbacks() {
        assert_eq!(
            parse_period("7d").unwrap(),
            RangeSpec::Lookback {
                count: 7,
                unit: LookbackUnit::Days
            }
        );
        assert_eq!(
            parse_period("12h").unwrap(),
            RangeSpec::Lookback {
                count: 12,
                unit: LookbackUnit::Hours
            }
        );
    }

    #[test]
    fn test_parse_period_rejects_garbage() {
        assert!(parse_period("yesterday").is_err());
        assert!(parse_period("7x").is_err());
        assert!(parse_period("0d").is_err());
        assert!(parse_period("").is_err());
        assert!(parse_period("1d; DROP TABLE sensor_events").is_err());
    }

    #[test]
    fn test_window_derivation_policy() {
        assert_eq!(
            WindowSize::for_range(&parse_period("1d").unwrap()),
            WindowSize::Hourly
        );
        assert_eq!(
            WindowSize::for_range(&parse_period("7d").unwrap()),
            WindowSize::Daily
        );
        assert_eq!(
            WindowSize::for_range(&parse_period("30d").unwrap()),
            WindowSize::Daily
        );
        assert_eq!(
            WindowSize::for_range(&parse_period("3d").unwrap()),
            WindowSize::Hourly
        );
        assert_eq!(WindowSize::for_range(&RangeSpec::Today), WindowSize::Hourly);
    }

    #[test]
    fn test_parse_group_interval() {
        assert_eq!(parse_group_interval("1h"), Some(WindowSize::Hourly));
        assert_eq!(parse_group_interval("1d"), Some(WindowSize::Daily));
        assert_eq!(parse_group_interval("5m"), None);
    }

    #[test]
    fn test_validate_category() {
        assert!(validate_category("glass").is_ok());
        assert!(validate_category("bag_type-2").is_ok());
        assert!(validate_category("").is_err());
        assert!(validate_category("glass'; DROP TABLE x").is_err());
        assert!(validate_category("a b").is_err());
    }

    #[test]
    fn test_today_range_is_anchored_at_start_of_day() {
        let stmt = build_category_totals("sensor_events", &RangeSpec::Today);
        assert!(stmt.sql.contains("occurred_at >= toStartOfDay(now())"));
    }

    #[test]
    fn test_lookback_range_fragment() {
        let stmt = build_category_totals("sensor_events", &parse_period("7d").unwrap());
        assert!(stmt.sql.contains("now() - INTERVAL 7 DAY"));
    }

    #[test]
    fn test_histogram_category_is_bound_not_interpolated() {
        let request = HistogramRequest {
            range: RangeSpec::Today,
            window: WindowSize::Hourly,
            category: Some("glass".to_string()),
        };
        let stmt = build_histogram("sensor_events", &request);
        assert!(stmt.sql.contains("category = ?"));
        assert!(!stmt.sql.contains("glass"));
        assert_eq!(stmt.category.as_deref(), Some("glass"));
    }

    #[test]
    fn test_histogram_without_filter_has_no_bind() {
        let request = HistogramRequest {
            range: RangeSpec::default_lookback(),
            window: WindowSize::Hourly,
            category: None,
        };
        let stmt = build_histogram("sensor_events", &request);
        assert!(!stmt.sql.contains('?'));
        assert!(stmt.category.is_none());
        assert!(stmt.sql.contains("toStartOfHour(occurred_at)"));
    }

    #[test]
    fn test_histogram_daily_window_buckets_by_day() {
        let request = HistogramRequest {
            range: parse_period("7d").unwrap(),
            window: WindowSize::Daily,
            category: None,
        };
        let stmt = build_histogram("sensor_events", &request);
        assert!(stmt.sql.contains("toStartOfDay(occurred_at)"));
    }

    #[test]
    fn test_daily_total_binds_category() {
        let stmt = build_daily_total("sensor_events", "glass");
        assert!(stmt.sql.contains("toStartOfDay(now())"));
        assert_eq!(stmt.category.as_deref(), Some("glass"));
    }

    #[test]
    fn test_production_start_yields_no_rows_when_empty() {
        let stmt = build_production_start("sensor_events");
        assert!(stmt.sql.contains("HAVING count() > 0"));
    }
}
