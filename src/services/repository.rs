// src/services/repository.rs

//! Repository API client.
//!
//! Lists crates by membership and profile, fetches whole crate graphs and
//! reads file content.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{ApiConfig, CrateRef};
use crate::utils::endpoint;
use crate::utils::http::{create_client, ensure_success};

/// Source of crates for the crawl.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Crates that are members of `member_of` (top-level when `None`) and
    /// conform to `conforms_to`.
    async fn list_objects(
        &self,
        member_of: Option<&str>,
        conforms_to: &str,
    ) -> Result<Vec<CrateRef>>;

    /// The full JSON-LD document of one crate.
    async fn fetch_crate(&self, id: &str) -> Result<Value>;

    /// Text content of a file inside a crate; `None` when it does not exist.
    async fn fetch_file(&self, item_id: &str, path: &str) -> Result<Option<String>>;
}

/// One page of a listing response.
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    total: Option<usize>,
}

/// Repository reached over its REST API.
#[derive(Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
    page_size: usize,
}

impl HttpRepository {
    /// Create a repository client from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self::with_client(create_client(config)?, config))
    }

    /// Create a repository client sharing an existing HTTP client.
    pub fn with_client(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.admin_token.clone().filter(|t| !t.is_empty()),
            page_size: config.page_size.max(1),
        }
    }

    async fn list_page(
        &self,
        member_of: Option<&str>,
        conforms_to: &str,
        offset: usize,
    ) -> Result<ListingPage> {
        let mut url = endpoint(&self.base_url, "object")?;
        url.query_pairs_mut()
            .append_pair("memberOf", member_of.unwrap_or(""))
            .append_pair("conformsTo", conforms_to)
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("offset", &offset.to_string());

        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let response = ensure_success(response, url.as_str()).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Repository for HttpRepository {
    async fn list_objects(
        &self,
        member_of: Option<&str>,
        conforms_to: &str,
    ) -> Result<Vec<CrateRef>> {
        let mut refs = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0;

        loop {
            let page = self.list_page(member_of, conforms_to, offset).await?;
            let page_len = page.data.len();
            let before = refs.len();
            offset += page_len;

            for entry in page.data {
                let crate_ref = match serde_json::from_value::<CrateRef>(entry) {
                    Ok(crate_ref) => crate_ref,
                    Err(e) => {
                        log::warn!("Dropping listing entry under {:?}: {}", member_of, e);
                        continue;
                    }
                };
                if seen.insert(crate_ref.id.clone()) {
                    refs.push(crate_ref);
                }
            }

            // a server that ignores `offset` would repeat the same page forever
            let no_progress = refs.len() == before;
            let exhausted = page.total.is_some_and(|total| offset >= total);
            if page_len < self.page_size || no_progress || exhausted {
                break;
            }
        }

        log::debug!(
            "Listed {} crate(s) memberOf={:?} conformsTo={}",
            refs.len(),
            member_of,
            conforms_to
        );
        Ok(refs)
    }

    async fn fetch_crate(&self, id: &str) -> Result<Value> {
        let mut url = endpoint(&self.base_url, "object/meta")?;
        url.query_pairs_mut()
            .append_pair("id", id)
            .append_key_only("noUrid");

        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let response = ensure_success(response, url.as_str()).await?;
        let json: Value = response.json().await?;

        Ok(match json {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        })
    }

    async fn fetch_file(&self, item_id: &str, path: &str) -> Result<Option<String>> {
        let mut url = endpoint(&self.base_url, "stream")?;
        url.query_pairs_mut()
            .append_pair("id", item_id)
            .append_pair("path", path);

        log::debug!("GET {}", url);
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response, url.as_str()).await?;
        Ok(Some(response.text().await?))
    }
}
