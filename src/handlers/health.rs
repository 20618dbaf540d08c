use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Expedientes API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Records management API for military personnel case files",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health, /api/health (public)",
                "expedientes": "/api/expedientes[/:id[/estado]], /api/expedientes/search (protected)",
                "dashboard": "/api/dashboard/stats (protected)",
                "users": "/api/users[/:id] (protected)",
                "auth": "/api/auth/whoami, /api/permissions (protected)",
            }
        }
    }))
}

pub async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.expedientes.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "Record store unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
