// quarry/src/commands/fetch.rs
//
// USE CASE: Fetch a JSON document through the offline-first cache.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

use quarry_core::infrastructure::adapters::HttpJsonCache;
use quarry_core::ports::JsonSource;

pub async fn execute(url: String, cache: PathBuf, ttl: Option<u64>) -> anyhow::Result<()> {
    let source = HttpJsonCache::new().context("Failed to build the HTTP client")?;
    let value = source
        .fetch_cached_json(&url, &cache, ttl.map(Duration::from_secs))
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
