// src/pipeline/bootstrap.rs

//! Index creation and removal.

use crate::error::Result;
use crate::models::SearchConfig;
use crate::services::SearchIndex;

/// Create the index with the configured settings unless it already exists.
///
/// Returns `true` when the index was created.
pub async fn ensure_index(index: &dyn SearchIndex, config: &SearchConfig) -> Result<bool> {
    if index.exists().await? {
        log::info!("Index {} already exists", index.name());
        return Ok(false);
    }
    let body = config.create_body()?;
    index.create(&body).await?;
    Ok(true)
}

/// Delete the index; a missing index counts as deleted.
pub async fn delete_index(index: &dyn SearchIndex) -> Result<()> {
    if index.delete().await? {
        log::info!("Deleted index {}", index.name());
    } else {
        log::info!("Index {} did not exist", index.name());
    }
    Ok(())
}
