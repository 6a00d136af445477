use crate::domain::{
    parse_group_interval, parse_period, validate_category, DomainError, HistogramRequest,
    RangeSpec, WindowSize,
};
use crate::http::error::ApiError;
use crate::http::types::{
    AverageBody, CategoryCountBody, DailyTotalBody, HistogramPointBody, ProductionTimeBody,
    QueryParams,
};
use crate::http::AppState;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

/// `GET /dados` — time-series histogram of event counts per window per
/// category. `period` defaults to a one-day lookback; an unusable
/// `groupInterval` falls back to the window derived from the range.
pub async fn histogram(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<HistogramPointBody>>, ApiError> {
    let range = match &params.period {
        Some(period) => parse_period(period)?,
        None => RangeSpec::default_lookback(),
    };

    let window = params
        .group_interval
        .as_deref()
        .and_then(parse_group_interval)
        .unwrap_or_else(|| WindowSize::for_range(&range));

    let category = match params.bag_type {
        Some(category) => {
            validate_category(&category)?;
            Some(category)
        }
        None => None,
    };

    let points = state
        .queries
        .histogram(HistogramRequest {
            range,
            window,
            category,
        })
        .await?;

    Ok(Json(points.into_iter().map(Into::into).collect()))
}

/// `GET /dados/daily` — total count for one category since the start of
/// today. `bagType` is required.
pub async fn daily_total(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<DailyTotalBody>, ApiError> {
    let category = params
        .bag_type
        .ok_or(DomainError::MissingParameter("bagType"))?;
    validate_category(&category)?;

    let total = state.queries.daily_total(category).await?;
    Ok(Json(DailyTotalBody { total }))
}

/// `GET /dados/byBagType` — event count per category over the range.
/// `period` is required.
pub async fn totals_by_category(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<CategoryCountBody>>, ApiError> {
    let period = params
        .period
        .ok_or(DomainError::MissingParameter("period"))?;
    let range = parse_period(&period)?;

    let counts = state.queries.totals_by_category(range).await?;
    Ok(Json(counts.into_iter().map(Into::into).collect()))
}

/// `GET /dados/average` — average of per-hour event counts over the range.
/// `period` is required.
pub async fn hourly_average(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<AverageBody>, ApiError> {
    let period = params
        .period
        .ok_or(DomainError::MissingParameter("period"))?;
    let range = parse_period(&period)?;

    let average = state.queries.hourly_average(range).await?;
    Ok(Json(AverageBody { average }))
}

/// `GET /dados/productionTime` — elapsed time since today's first event,
/// formatted `HH:MM:SS`. 404 when nothing was produced today.
pub async fn production_time(
    State(state): State<AppState>,
) -> Result<Json<ProductionTimeBody>, ApiError> {
    let started_at = state
        .queries
        .production_started_at()
        .await?
        .ok_or_else(|| ApiError::not_found("no production recorded today"))?;

    Ok(Json(ProductionTimeBody {
        duration: crate::domain::format_elapsed(started_at, Utc::now()),
    }))
}
