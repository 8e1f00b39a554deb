use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use moodwatch_domains::{Comment, MarkReadOutcome, ReportPage, ReportRequest, ReportRow};

use crate::error::Result;
use crate::state::AppState;

pub async fn generate_report(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<ReportPage>> {
    let Json(request) = payload?;
    let filters = request.into_filters()?;
    Ok(Json(filters.run(&state.pool).await?))
}

/// Unread comments, flagged read as they are returned.
pub async fn take_unread(State(state): State<AppState>) -> Result<Json<Vec<ReportRow>>> {
    Ok(Json(ReportRow::list_unread_and_mark_read(&state.pool).await?))
}

/// Served under `/report/read` but selects unread comments, without marking them.
pub async fn peek_unread(State(state): State<AppState>) -> Result<Json<Vec<ReportRow>>> {
    Ok(Json(ReportRow::list_unread(&state.pool).await?))
}

pub async fn mark_all_read(State(state): State<AppState>) -> Result<Json<MarkReadOutcome>> {
    Ok(Json(Comment::mark_all_unread_as_read(&state.pool).await?))
}
