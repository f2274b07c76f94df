// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{AppError, Result};
use crate::models::ApiConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &ApiConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(&config.user_agent);
    if config.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.timeout_secs));
    }
    Ok(builder.build()?)
}

/// Turn a non-success response into a fetch error carrying its body.
pub async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::fetch(
        context,
        format!("status {}: {}", status.as_u16(), truncate(&body, 200)),
    ))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
