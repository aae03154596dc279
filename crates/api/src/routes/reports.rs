//! Sales and inventory report handlers (admin only).

#![allow(clippy::used_underscore_binding)]

use axum::{Router, extract::State, routing::get};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use crate::db::ReportRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{InventoryReport, SalesReport};
use crate::response::{ApiQuery, ApiResponse, ApiResult};
use crate::state::AppState;

const DEFAULT_WINDOW_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sales))
        .route("/inventory", get(inventory))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Which end of the window a bare date describes.
#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates. A plain end
/// date covers the whole day.
fn parse_bound(value: &str, bound: Bound) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {value}")))?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

impl SalesQuery {
    fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let end = match self.end_date.as_deref().filter(|v| !v.trim().is_empty()) {
            Some(v) => parse_bound(v, Bound::End)?,
            None => now,
        };
        let start = match self.start_date.as_deref().filter(|v| !v.trim().is_empty()) {
            Some(v) => parse_bound(v, Bound::Start)?,
            None => end - Duration::days(DEFAULT_WINDOW_DAYS),
        };
        if start > end {
            return Err(AppError::BadRequest(
                "startDate must be before endDate".to_string(),
            ));
        }
        Ok((start, end))
    }
}

#[instrument(skip(state, _admin))]
async fn sales(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<SalesReport> {
    let (start, end) = query.window(Utc::now())?;
    let report = ReportRepository::new(state.pool()).sales(start, end).await?;
    Ok(ApiResponse::ok(report))
}

#[instrument(skip(state, _admin))]
async fn inventory(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<InventoryReport> {
    let report = ReportRepository::new(state.pool()).inventory().await?;
    Ok(ApiResponse::ok(report))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> SalesQuery {
        SalesQuery {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        }
    }

    #[test]
    fn test_default_window_is_thirty_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let (start, end) = query(None, None).window(now).unwrap();
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_plain_dates_cover_whole_days() {
        let now = Utc::now();
        let (start, end) = query(Some("2024-01-01"), Some("2024-01-31"))
            .window(now)
            .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_timestamps_are_accepted() {
        let (start, _) = query(Some("2024-03-01T10:00:00+00:00"), Some("2024-03-02"))
            .window(Utc::now())
            .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_bad_or_reversed_window() {
        assert!(query(Some("yesterday"), None).window(Utc::now()).is_err());
        assert!(
            query(Some("2024-02-01"), Some("2024-01-01"))
                .window(Utc::now())
                .is_err()
        );
    }
}
