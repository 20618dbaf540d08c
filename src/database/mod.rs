pub mod entity;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod schema;
pub mod store;

pub use entity::Entity;
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{RecordStore, StoreError};
