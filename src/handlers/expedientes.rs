use std::collections::HashMap;

use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::permissions::Permission;
use crate::database::models::{CreateExpediente, Estado, Expediente, UpdateExpediente};
use crate::filter::SearchRequest;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::PageResult;

#[derive(Debug, Deserialize)]
pub struct EstadoBody {
    pub estado: Estado,
}

/// GET /api/expedientes and GET /api/expedientes/search
///
/// Query parameters: `page`, `limit`, `sortBy`, `sortOrder`, `fecha_inicio`,
/// `fecha_fin`, plus any filterable column (`grado=CAP`, `cip=123`).
pub async fn list(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<PageResult<Expediente>> {
    auth_user.require(Permission::ExpedienteRead)?;

    let request = SearchRequest::from_query(&params)?;
    let page = state.expedientes.list(&request).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/expedientes
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateExpediente>,
) -> ApiResult<Expediente> {
    auth_user.require(Permission::ExpedienteCreate)?;

    let record = state.expedientes.create(body, auth_user.user_id).await?;
    Ok(ApiResponse::created(record))
}

/// GET /api/expedientes/:id
pub async fn get(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Expediente> {
    auth_user.require(Permission::ExpedienteRead)?;

    Ok(ApiResponse::success(state.expedientes.get(id).await?))
}

/// PUT /api/expedientes/:id - partial update, absent fields are kept
pub async fn update(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateExpediente>,
) -> ApiResult<Expediente> {
    auth_user.require(Permission::ExpedienteUpdate)?;

    let record = state.expedientes.update(id, body, auth_user.user_id).await?;
    Ok(ApiResponse::success(record))
}

/// PUT /api/expedientes/:id/estado - moves the file in or out of the archive
pub async fn update_estado(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<EstadoBody>,
) -> ApiResult<Expediente> {
    auth_user.require(Permission::ExpedienteUpdate)?;

    let record = state.expedientes.update_estado(id, body.estado, auth_user.user_id).await?;
    Ok(ApiResponse::success(record))
}

/// DELETE /api/expedientes/:id - soft delete
pub async fn delete(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    auth_user.require(Permission::ExpedienteDelete)?;

    state.expedientes.delete(id, auth_user.user_id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
