//! Results dashboard API handlers
//!
//! Read-only views over the session's project data plus the export and
//! report acknowledgments.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use aeroscan_common::time;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aeroscan_common::events::DemoEvent;

use crate::{
    error::{ApiError, ApiResult},
    models::{DefectType, ExportFormat, ReportFormat, Severity, Step},
    services::{
        analytics::{check_bin_width, DEFAULT_BIN_WIDTH_CM},
        category_distribution, depth_histogram, render_report_text, synthesize_surface,
        DefectFilter, HeightField, SummaryMetrics,
    },
    view::{render_defect_table, AnalyticsView, DefectTableView},
    AppState,
};

/// GET /api/sessions/:id/defects query
///
/// Both parameters are comma-separated; an absent parameter does not filter.
#[derive(Debug, Default, Deserialize)]
pub struct DefectQuery {
    pub types: Option<String>,
    pub severities: Option<String>,
}

impl DefectQuery {
    pub fn to_filter(&self) -> ApiResult<DefectFilter> {
        Ok(DefectFilter {
            types: parse_list::<DefectType>(self.types.as_deref())?,
            severities: parse_list::<Severity>(self.severities.as_deref())?,
        })
    }
}

fn parse_list<T>(raw: Option<&str>) -> ApiResult<Option<Vec<T>>>
where
    T: FromStr<Err = aeroscan_common::Error>,
{
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse::<T>().map_err(ApiError::from))
            .collect()
    })
    .transpose()
}

/// GET /api/sessions/:id/analytics query
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub bin_width: Option<f64>,
}

/// Export / report acknowledgment
#[derive(Debug, Serialize)]
pub struct AcknowledgmentResponse {
    pub session_id: Uuid,
    pub format: String,
    pub message: String,
}

/// POST /api/sessions/:id/report request
#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub format: ReportFormat,
}

/// POST /api/sessions/:id/report response
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub session_id: Uuid,
    pub format: ReportFormat,
    pub message: String,
    pub preview: String,
}

/// GET /api/sessions/:id/defects
pub async fn list_defects(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<DefectQuery>,
) -> ApiResult<Json<DefectTableView>> {
    let filter = query.to_filter()?;
    let snapshot = state.sessions.get(session_id).await?;
    let records = snapshot.require_project_data("list_defects")?;

    let table = render_defect_table(records, &filter);
    tracing::debug!(
        session_id = %session_id,
        shown = table.records.len(),
        total = table.total,
        "Defect table filtered"
    );
    Ok(Json(table))
}

/// GET /api/sessions/:id/analytics
pub async fn analytics(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsView>> {
    let bin_width = query.bin_width.unwrap_or(DEFAULT_BIN_WIDTH_CM);
    let snapshot = state.sessions.get(session_id).await?;
    let records = snapshot.require_project_data("analytics")?;
    check_bin_width(records, bin_width)?;

    Ok(Json(AnalyticsView {
        distribution: category_distribution(records),
        histogram: depth_histogram(records, bin_width),
        summary: SummaryMetrics::from_records(records),
    }))
}

/// GET /api/sessions/:id/surface
pub async fn surface(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<HeightField>> {
    let snapshot = state.sessions.get(session_id).await?;
    let records = snapshot.require_project_data("surface")?;
    let seed = snapshot.data_seed().unwrap_or(state.config.seed);
    Ok(Json(synthesize_surface(seed, records)))
}

/// POST /api/sessions/:id/export/:format
///
/// Acknowledges the export; no file is produced.
pub async fn export(
    State(state): State<AppState>,
    Path((session_id, format)): Path<(Uuid, String)>,
) -> ApiResult<Json<AcknowledgmentResponse>> {
    let format: ExportFormat = format.parse()?;
    state
        .sessions
        .get(session_id)
        .await?
        .require_step(Step::Results, "export")?;

    tracing::info!(session_id = %session_id, format = %format, "Export acknowledged");
    state.event_bus.emit_lossy(DemoEvent::ExportAcknowledged {
        session_id,
        format: format.label().to_string(),
        timestamp: time::now(),
    });

    Ok(Json(AcknowledgmentResponse {
        session_id,
        format: format.label().to_string(),
        message: format.acknowledgment(),
    }))
}

/// POST /api/sessions/:id/report
///
/// Marks the report as generated in the requested format.
pub async fn generate_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    request: Option<Json<ReportRequest>>,
) -> ApiResult<Json<ReportResponse>> {
    let format = request.map(|Json(r)| r.format).unwrap_or_default();

    let (message, preview) = state
        .sessions
        .update(session_id, |s| {
            let message = s.generate_report(format)?;
            let summary = SummaryMetrics::from_records(s.require_project_data("generate_report")?);
            Ok((message, render_report_text(s.metadata(), &summary)))
        })
        .await?;

    tracing::info!(session_id = %session_id, format = %format, "Report generated");
    state.event_bus.emit_lossy(DemoEvent::ReportGenerated {
        session_id,
        format: format.label().to_string(),
        timestamp: time::now(),
    });

    Ok(Json(ReportResponse {
        session_id,
        format,
        message,
        preview,
    }))
}

/// Build results dashboard routes
pub fn results_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions/:id/defects", get(list_defects))
        .route("/api/sessions/:id/analytics", get(analytics))
        .route("/api/sessions/:id/surface", get(surface))
        .route("/api/sessions/:id/export/:format", post(export))
        .route("/api/sessions/:id/report", post(generate_report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_comma_separated_lists() {
        let query = DefectQuery {
            types: Some("pit, Rut track".to_string()),
            severities: Some("high".to_string()),
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.types, Some(vec![DefectType::Pit, DefectType::RutTrack]));
        assert_eq!(filter.severities, Some(vec![Severity::High]));
    }

    #[test]
    fn test_absent_query_does_not_filter() {
        let filter = DefectQuery::default().to_filter().unwrap();
        assert_eq!(filter, DefectFilter::default());
    }

    #[test]
    fn test_unknown_value_is_bad_request() {
        let query = DefectQuery {
            types: Some("pit,sinkhole".to_string()),
            severities: None,
        };
        assert!(matches!(query.to_filter(), Err(ApiError::BadRequest(_))));
    }
}
