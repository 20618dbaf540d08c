pub mod auth;
pub mod guard;
pub mod rate_limit;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use guard::{route_guard_middleware, GuardDecision, RouteGuard};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use response::{ApiResponse, ApiResult};
