use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use super::catalog::DataResponse;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{Notification, Requester};
use crate::state::AppState;

// GET /points/my
pub async fn my_points(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> AppResult<Json<DataResponse<i64>>> {
    let user = {
        let db = state.db()?;
        queries::get_user(&db, &requester.user_id)?
    };
    let user = user.ok_or_else(|| AppError::NotFound("user".to_string()))?;

    Ok(DataResponse::new(user.points))
}

// GET /notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let data = {
        let db = state.db()?;
        queries::list_notifications(&db, &requester.user_id)?
    };

    Ok(DataResponse::new(data))
}

// POST /notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let updated = {
        let db = state.db()?;
        queries::mark_notification_read(&db, &id, &requester.user_id)?
    };

    if !updated {
        return Err(AppError::NotFound("notification".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

// DELETE /notifications/all
pub async fn delete_read(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = {
        let db = state.db()?;
        if queries::get_user(&db, &requester.user_id)?.is_none() {
            return Err(AppError::NotFound("user".to_string()));
        }
        queries::delete_read_notifications(&db, &requester.user_id)?
    };

    tracing::debug!(user_id = %requester.user_id, deleted, "deleted read notifications");
    Ok(Json(serde_json::json!({ "success": true, "deleted": deleted })))
}
