use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::config;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// API request without credentials; answered with 401.
    Reject,
    /// Page request without credentials; sent to the login page.
    Redirect { location: String },
}

/// Decides whether a request may reach a handler before any handler runs.
///
/// Only checks that a session credential is present. Token validity is
/// enforced by `jwt_auth_middleware` on the protected routes.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    public_paths: Vec<String>,
    login_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        let security = &config::config().security;
        Self::new(security.public_paths.clone(), security.login_path.clone())
    }
}

impl RouteGuard {
    pub fn new(public_paths: Vec<String>, login_path: impl Into<String>) -> Self {
        Self { public_paths, login_path: login_path.into() }
    }

    pub fn is_public(&self, path: &str) -> bool {
        if path == "/" || path == self.login_path {
            return true;
        }
        self.public_paths.iter().any(|p| {
            path == p || path.strip_prefix(p.as_str()).map_or(false, |rest| rest.starts_with('/'))
        })
    }

    pub fn evaluate(&self, path: &str, credential: Option<&str>) -> GuardDecision {
        if self.is_public(path) {
            return GuardDecision::Allow;
        }
        if credential.map_or(false, |c| !c.trim().is_empty()) {
            return GuardDecision::Allow;
        }
        if path == "/api" || path.starts_with("/api/") {
            return GuardDecision::Reject;
        }
        let target: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
        GuardDecision::Redirect { location: format!("{}?redirect={}", self.login_path, target) }
    }
}

/// Reads the session cookie value, if any.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| cookie_token(headers))
}

pub async fn route_guard_middleware(request: Request, next: Next) -> Response {
    let guard = RouteGuard::default();
    let path = request.uri().path().to_string();
    let token = credential(request.headers());

    match guard.evaluate(&path, token.as_deref()) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Reject => {
            tracing::debug!("Guard rejected {}", path);
            ApiError::unauthorized("Authentication required").into_response()
        }
        GuardDecision::Redirect { location } => {
            tracing::debug!("Guard redirected {} to {}", path, location);
            Redirect::to(&location).into_response()
        }
    }
}
