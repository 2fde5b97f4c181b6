// quarry-core/src/infrastructure/adapters/http_cache.rs

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::QuarryError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{atomic_write, file_age};
use crate::ports::json_source::JsonSource;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON fetcher that keeps a copy of every response on disk.
pub struct HttpJsonCache {
    client: reqwest::Client,
}

impl HttpJsonCache {
    /// Fails when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<serde_json::Value, InfrastructureError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InfrastructureError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<serde_json::Value>().await?)
    }
}

/// A cache file is usable when it exists and, if a TTL is set, is younger
/// than it.
fn is_fresh(cache_path: &Path, ttl: Option<Duration>) -> Result<bool, InfrastructureError> {
    Ok(match (file_age(cache_path)?, ttl) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(age), Some(ttl)) => age < ttl,
    })
}

#[async_trait]
impl JsonSource for HttpJsonCache {
    #[instrument(skip(self), fields(cache = %cache_path.display()))]
    async fn fetch_cached_json(
        &self,
        url: &str,
        cache_path: &Path,
        ttl: Option<Duration>,
    ) -> Result<serde_json::Value, QuarryError> {
        if is_fresh(cache_path, ttl)? {
            debug!("serving from cache");
            let content = fs::read_to_string(cache_path)?;
            let value = serde_json::from_str(&content).map_err(InfrastructureError::from)?;
            return Ok(value);
        }

        info!(url, "cache miss, fetching");
        let value = self.download(url).await?;
        let pretty = serde_json::to_string_pretty(&value).map_err(InfrastructureError::from)?;
        atomic_write(cache_path, pretty)?;
        Ok(value)
    }
}
