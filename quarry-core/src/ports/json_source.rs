// quarry-core/src/ports/json_source.rs

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::QuarryError;

/// Optional enrichment source. Offline-first: a fresh enough cache file is
/// returned without touching the network.
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn fetch_cached_json(
        &self,
        url: &str,
        cache_path: &Path,
        ttl: Option<Duration>,
    ) -> Result<serde_json::Value, QuarryError>;
}
