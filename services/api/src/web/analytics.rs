//! services/api/src/web/analytics.rs
//!
//! Aggregate incident counts for the staff dashboard.

use axum::{extract::State, Extension, Json};
use incident_core::{CategoryCount, IncidentStats, Principal};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::incidents::IncidentResponse;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct CountResponse {
    pub label: String,
    pub count: u64,
}

impl From<CategoryCount> for CountResponse {
    fn from(c: CategoryCount) -> Self {
        Self {
            label: c.label,
            count: c.count,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_incidents: u64,
    pub by_type: Vec<CountResponse>,
    pub by_severity: Vec<CountResponse>,
    pub by_status: Vec<CountResponse>,
    pub recent_incidents: Vec<IncidentResponse>,
}

fn counts(list: Vec<CategoryCount>) -> Vec<CountResponse> {
    list.into_iter().map(CountResponse::from).collect()
}

impl From<IncidentStats> for StatsResponse {
    fn from(stats: IncidentStats) -> Self {
        Self {
            total_incidents: stats.total_incidents,
            by_type: counts(stats.by_type),
            by_severity: counts(stats.by_severity),
            by_status: counts(stats.by_status),
            recent_incidents: stats
                .recent_incidents
                .into_iter()
                .map(IncidentResponse::from)
                .collect(),
        }
    }
}

/// Incident counts by type, severity and status.
#[utoipa::path(
    get,
    path = "/analytics",
    responses(
        (status = 200, description = "Dashboard statistics", body = StatsResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Caller is not staff", body = ErrorBody)
    )
)]
pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.service.incident_stats(&principal).await?;
    Ok(Json(stats.into()))
}
