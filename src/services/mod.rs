pub mod error;
pub mod expediente_service;
pub mod list_service;
pub mod page;
pub mod profile_service;
pub mod user_service;

pub use error::ServiceError;
pub use expediente_service::{ExpedienteService, ExpedienteStats};
pub use list_service::ListService;
pub use page::PageResult;
pub use profile_service::ProfileService;
pub use user_service::UserService;
