// quarry-core/src/ports/mod.rs

pub mod json_source;
pub mod table_store;

pub use json_source::JsonSource;
pub use table_store::TableStore;
