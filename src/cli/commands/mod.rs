pub mod find;
pub mod migrate;
