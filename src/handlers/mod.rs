// Request handlers grouped by resource. Everything except `health` sits
// behind `jwt_auth_middleware` and checks a permission before touching a
// service.
pub mod auth;
pub mod dashboard;
pub mod expedientes;
pub mod health;
pub mod profiles;
pub mod users;
