use std::collections::HashMap;

use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::permissions::Permission;
use crate::database::models::{CreateProfile, Profile, UpdateProfile};
use crate::filter::SearchRequest;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::PageResult;

#[derive(Debug, Deserialize)]
pub struct PermissionsBody {
    pub permissions: Vec<String>,
}

pub async fn list(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<PageResult<Profile>> {
    auth_user.require(Permission::ProfileRead)?;

    let request = SearchRequest::from_query(&params)?;
    Ok(ApiResponse::success(state.profiles.list(&request).await?))
}

pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateProfile>,
) -> ApiResult<Profile> {
    auth_user.require(Permission::ProfileCreate)?;

    let profile = state.profiles.create(body, auth_user.user_id).await?;
    Ok(ApiResponse::created(profile))
}

pub async fn get(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Profile> {
    auth_user.require(Permission::ProfileRead)?;

    Ok(ApiResponse::success(state.profiles.get(id).await?))
}

pub async fn update(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfile>,
) -> ApiResult<Profile> {
    auth_user.require(Permission::ProfileUpdate)?;

    Ok(ApiResponse::success(state.profiles.update(id, body, auth_user.user_id).await?))
}

pub async fn delete(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    auth_user.require(Permission::ProfileDelete)?;

    state.profiles.delete(id, auth_user.user_id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// GET /api/profiles/:id/permissions
pub async fn permissions(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    auth_user.require(Permission::ProfileRead)?;

    let profile = state.profiles.get(id).await?;
    Ok(ApiResponse::success(json!({
        "id": profile.id,
        "slug": profile.slug,
        "permissions": profile.permissions,
    })))
}

/// PUT /api/profiles/:id/permissions - replaces the whole set
pub async fn update_permissions(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<PermissionsBody>,
) -> ApiResult<Profile> {
    auth_user.require(Permission::ProfileUpdate)?;

    let profile = state
        .profiles
        .update_permissions(id, body.permissions, auth_user.user_id)
        .await?;
    Ok(ApiResponse::success(profile))
}
