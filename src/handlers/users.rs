use std::collections::HashMap;

use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::permissions::Permission;
use crate::database::models::{ChangePassword, CreateUser, UpdateOwnUser, UpdateUser, User};
use crate::filter::SearchRequest;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::PageResult;

pub async fn list(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<PageResult<User>> {
    auth_user.require(Permission::UserRead)?;

    let request = SearchRequest::from_query(&params)?;
    Ok(ApiResponse::success(state.users.list(&request).await?))
}

pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateUser>,
) -> ApiResult<User> {
    auth_user.require(Permission::UserCreate)?;

    let user = state.users.create(body, Some(auth_user.user_id)).await?;
    Ok(ApiResponse::created(user))
}

pub async fn get(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<User> {
    auth_user.require(Permission::UserRead)?;

    Ok(ApiResponse::success(state.users.get(id).await?))
}

pub async fn update(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateUser>,
) -> ApiResult<User> {
    auth_user.require(Permission::UserUpdate)?;

    Ok(ApiResponse::success(state.users.update(id, body, auth_user.user_id).await?))
}

pub async fn delete(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    auth_user.require(Permission::UserDelete)?;

    state.users.delete(id, auth_user.user_id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// GET /api/users/profile - the caller's own record
pub async fn own_profile(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(state.users.get(auth_user.user_id).await?))
}

/// PUT /api/users/profile - name and phone only; roles and status stay put
pub async fn update_own_profile(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateOwnUser>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(state.users.update_own(auth_user.user_id, body).await?))
}

/// PUT /api/users/password
pub async fn change_password(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChangePassword>,
) -> ApiResult<Value> {
    state.users.change_password(auth_user.user_id, body).await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated" })))
}
