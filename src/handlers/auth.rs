use axum::extract::Extension;
use serde_json::{json, Value};

use crate::auth::permissions::{self, Permission};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/whoami - identity carried by the presented token
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(auth_user))
}

/// GET /api/permissions - the caller's effective permissions and the full
/// catalogue a profile can be built from
pub async fn permissions(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    auth_user.require(Permission::ProfileRead)?;

    Ok(ApiResponse::success(json!({
        "roles": auth_user.roles,
        "permissions": auth_user.permissions,
        "available": permissions::catalog(),
    })))
}
