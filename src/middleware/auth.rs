use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{self, permissions::Permission, Claims};
use crate::error::ApiError;

/// Authenticated user context: the token's identity plus the permissions its
/// roles resolve to through the stored profiles.
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: BTreeSet<Permission>,
}

impl AuthUser {
    pub fn new(claims: Claims, permissions: BTreeSet<Permission>) -> Self {
        Self { user_id: claims.sub, email: claims.email, roles: claims.roles, permissions }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Fails with 403 unless one of the user's profiles grants `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.can(permission) {
            return Ok(());
        }
        tracing::debug!("User {} lacks permission {}", self.user_id, permission.as_str());
        Err(ApiError::forbidden(format!("Missing permission: {}", permission.as_str())))
    }
}

/// JWT authentication middleware that validates tokens and extracts user context.
/// Expects `AppState` to be installed as an extension by an outer layer.
pub async fn jwt_auth_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let token = match extract_jwt_from_headers(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    let claims = match auth::validate_jwt(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            return ApiError::unauthorized(e.to_string()).into_response();
        }
    };

    let Some(state) = request.extensions().get::<AppState>().cloned() else {
        tracing::error!("AppState extension missing in front of jwt_auth_middleware");
        return ApiError::internal_server_error("Server misconfigured").into_response();
    };
    let permissions = match state.profiles.resolve(&claims.roles).await {
        Ok(permissions) => permissions,
        Err(e) => return ApiError::from(e).into_response(),
    };

    request.extensions_mut().insert(AuthUser::new(claims, permissions));

    next.run(request).await
}

/// Extract JWT token from Authorization header, falling back to the session cookie
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return super::guard::cookie_token(headers).ok_or_else(|| "Missing Authorization header".to_string());
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    use crate::auth::permissions::{default_permissions, expand};

    fn user(role: &str) -> AuthUser {
        let claims = Claims::new(Uuid::new_v4(), "test@example.com".into(), vec![role.to_string()]);
        AuthUser::new(claims, expand(default_permissions(role).iter().copied()))
    }

    #[test]
    fn require_checks_resolved_permissions() {
        assert!(user("administrador").require(Permission::ExpedienteDelete).is_ok());
        assert!(user("abogado").require(Permission::ExpedienteRead).is_ok());

        let err = user("abogado").require(Permission::ExpedienteCreate).unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(extract_jwt_from_headers(&headers).is_err());
    }

    #[test]
    fn falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=tok123"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "tok123");

        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
    }
}
