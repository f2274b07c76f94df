// src/pipeline/writer.rs

//! Per-item index writes with failure isolation.

use std::sync::Arc;

use serde_json::Value;

use crate::models::ItemKind;
use crate::services::SearchIndex;
use crate::storage::{DiagnosticSink, DiagnosticStage};

/// Result of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The write failed; the document went to the diagnostic sink instead.
    Failed { diagnostic: Option<String> },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}

/// Composite document id: `{rootId}/{crateId}/{itemId}`.
pub fn document_id(root_id: &str, crate_id: &str, item_id: &str) -> String {
    format!("{root_id}/{crate_id}/{item_id}")
}

/// Writes documents to the search index, diverting failures to the
/// diagnostic sink. Never returns an error.
#[derive(Clone)]
pub struct IndexWriter {
    index: Arc<dyn SearchIndex>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl IndexWriter {
    pub fn new(index: Arc<dyn SearchIndex>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self { index, diagnostics }
    }

    /// Insert or replace `document` under `id`.
    pub async fn upsert(
        &self,
        id: &str,
        crate_id: &str,
        kind: ItemKind,
        document: &Value,
    ) -> WriteOutcome {
        match self.index.upsert(id, document).await {
            Ok(()) => {
                log::debug!("Indexed {} {}", kind.as_str(), id);
                WriteOutcome::Written
            }
            Err(e) => {
                log::error!("Can't index {} {}: {}", kind.as_str(), id, e);
                let diagnostic = self.divert(crate_id, kind.into(), document).await;
                WriteOutcome::Failed { diagnostic }
            }
        }
    }

    /// Record a payload that never reached the index.
    pub async fn divert(
        &self,
        crate_id: &str,
        stage: DiagnosticStage,
        payload: &Value,
    ) -> Option<String> {
        match self.diagnostics.record(crate_id, stage, payload).await {
            Ok(location) => Some(location),
            Err(e) => {
                log::error!(
                    "Failed to write diagnostic {} for {}: {}",
                    stage.suffix(),
                    crate_id,
                    e
                );
                None
            }
        }
    }
}
