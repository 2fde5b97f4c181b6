// quarry-core/src/ports/table_store.rs

// The pipeline only knows "read a table" and "write a table". Which file
// format or engine sits behind that is the adapter's business.

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::path::Path;

use crate::error::QuarryError;

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn read_table(&self, path: &Path) -> Result<DataFrame, QuarryError>;

    /// Persist `df` at `path`, replacing any previous file.
    async fn write_table(&self, df: &DataFrame, path: &Path) -> Result<(), QuarryError>;

    fn engine_name(&self) -> &str;
}
