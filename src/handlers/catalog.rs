use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{Service, WorkingHours};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    success: bool,
    data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarberSummary {
    id: String,
    name: String,
    surname: String,
    display_name: String,
    description: Option<String>,
}

// GET /barbers
pub async fn list_barbers(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<DataResponse<Vec<BarberSummary>>>> {
    let barbers = {
        let db = state.db()?;
        queries::list_barbers(&db)?
    };

    let data = barbers
        .into_iter()
        .map(|b| BarberSummary {
            display_name: b.display_name(),
            id: b.id,
            name: b.name,
            surname: b.surname,
            description: b.description,
        })
        .collect();

    Ok(DataResponse::new(data))
}

// GET /barbers/:id/working-hours
pub async fn working_hours(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<WorkingHours>>>> {
    let data = {
        let db = state.db()?;
        if queries::get_barber(&db, &id)?.is_none() {
            return Err(AppError::NotFound("barber".to_string()));
        }
        queries::list_working_hours(&db, &id)?
    };

    Ok(DataResponse::new(data))
}

// GET /services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<DataResponse<Vec<Service>>>> {
    let data = {
        let db = state.db()?;
        queries::list_services(&db)?
    };

    Ok(DataResponse::new(data))
}
