// src/services/search.rs

//! Search index client (OpenSearch / Elasticsearch REST API).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SearchConfig;

/// A document index the crawl writes into.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Name of the index.
    fn name(&self) -> &str;

    async fn exists(&self) -> Result<bool>;

    /// Create the index with the given settings/mappings body.
    async fn create(&self, body: &Value) -> Result<()>;

    /// Insert or replace a document; the write is visible on return.
    async fn upsert(&self, id: &str, document: &Value) -> Result<()>;

    /// Delete the index; `false` when there was nothing to delete.
    async fn delete(&self) -> Result<bool>;
}

/// Index on an OpenSearch or Elasticsearch node.
#[derive(Clone)]
pub struct OpenSearchIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl OpenSearchIndex {
    pub fn new(client: Client, config: &SearchConfig) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            index: config.index.clone(),
        }
    }

    /// `{base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("search url {} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::index(status.as_u16(), error_reason(&body)))
    }
}

/// Pull the error reason out of an OpenSearch error body.
fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/reason")
                .or_else(|| v.pointer("/error/type"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl SearchIndex for OpenSearchIndex {
    fn name(&self) -> &str {
        &self.index
    }

    async fn exists(&self) -> Result<bool> {
        let url = self.url(&[self.index.as_str()])?;
        let response = self.client.head(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(AppError::index(status.as_u16(), "index exists check failed")),
        }
    }

    async fn create(&self, body: &Value) -> Result<()> {
        let url = self.url(&[self.index.as_str()])?;
        let response = self.client.put(url).json(body).send().await?;
        Self::check(response).await?;
        log::info!("Created index {}", self.index);
        Ok(())
    }

    async fn upsert(&self, id: &str, document: &Value) -> Result<()> {
        let mut url = self.url(&[self.index.as_str(), "_doc", id])?;
        url.query_pairs_mut().append_pair("refresh", "true");
        let response = self.client.put(url).json(document).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self) -> Result<bool> {
        let url = self.url(&[self.index.as_str()])?;
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }
}
