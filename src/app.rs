use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, put},
    Extension, Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::database::models::{Expediente, Profile, User};
use crate::database::{MemoryStore, PgStore};
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, rate_limit_middleware, route_guard_middleware, RateLimiter};
use crate::services::{ExpedienteService, ProfileService, UserService};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub expedientes: ExpedienteService,
    pub users: UserService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(expedientes: ExpedienteService, users: UserService, profiles: ProfileService) -> Self {
        Self { expedientes, users, profiles }
    }

    /// System profiles are not seeded here; call `ProfileService::seed_system_profiles`.
    pub fn postgres(pool: PgPool) -> Self {
        let profiles = ProfileService::new(Arc::new(PgStore::<Profile>::new(pool.clone())));
        Self::new(
            ExpedienteService::new(Arc::new(PgStore::<Expediente>::new(pool.clone()))),
            UserService::new(Arc::new(PgStore::<User>::new(pool)), profiles.clone()),
            profiles,
        )
    }

    /// Starts with the built-in profiles already present.
    pub fn in_memory() -> Self {
        Self::with_memory_stores(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::with_records(Profile::system_defaults())),
        )
    }

    pub fn with_memory_stores(
        expedientes: Arc<MemoryStore<Expediente>>,
        users: Arc<MemoryStore<User>>,
        profiles: Arc<MemoryStore<Profile>>,
    ) -> Self {
        let profiles = ProfileService::new(profiles);
        Self::new(
            ExpedienteService::new(expedientes),
            UserService::new(users, profiles.clone()),
            profiles,
        )
    }
}

pub fn app(state: AppState) -> Router {
    app_with_limiter(state, RateLimiter::from_config())
}

/// Builds the router with an explicit rate limiter; `None` disables limiting.
pub fn app_with_limiter(state: AppState, limiter: Option<Arc<RateLimiter>>) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/api/health", get(handlers::health::health))
        // Protected API
        .merge(protected_routes())
        .layer(Extension(state))
        .layer(middleware::from_fn(route_guard_middleware));

    if let Some(limiter) = limiter {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    let router = router.layer(cors_layer());

    if config::config().api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn protected_routes() -> Router {
    use handlers::{auth, dashboard, expedientes, profiles, users};

    Router::new()
        .route("/api/expedientes", get(expedientes::list).post(expedientes::create))
        .route("/api/expedientes/search", get(expedientes::list))
        .route(
            "/api/expedientes/:id",
            get(expedientes::get).put(expedientes::update).delete(expedientes::delete),
        )
        .route("/api/expedientes/:id/estado", put(expedientes::update_estado))
        .route("/api/dashboard/stats", get(dashboard::stats))
        .route("/api/users", get(users::list).post(users::create))
        // Self-service routes are static segments and win over `:id`.
        .route("/api/users/profile", get(users::own_profile).put(users::update_own_profile))
        .route("/api/users/password", put(users::change_password))
        .route("/api/users/:id", get(users::get).put(users::update).delete(users::delete))
        .route("/api/profiles", get(profiles::list).post(profiles::create))
        .route(
            "/api/profiles/:id",
            get(profiles::get).put(profiles::update).delete(profiles::delete),
        )
        .route(
            "/api/profiles/:id/permissions",
            get(profiles::permissions).put(profiles::update_permissions),
        )
        .route("/api/permissions", get(auth::permissions))
        .route("/api/auth/whoami", get(auth::whoami))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}
