use axum::extract::Extension;

use crate::app::AppState;
use crate::auth::permissions::Permission;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ExpedienteStats;

/// GET /api/dashboard/stats - archive totals by estado, situación, grado and
/// shelf, plus registrations over time
pub async fn stats(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<ExpedienteStats> {
    auth_user.require(Permission::DashboardStats)?;

    Ok(ApiResponse::success(state.expedientes.stats().await?))
}
