//! Diagnostic file sink.
//!
//! When a document cannot be written to the search index, or a crate
//! cannot be fetched, the payload is kept on disk for later inspection.
//!
//! ## Directory Structure
//!
//! ```text
//! {log_folder}/
//! ├── arcpname,corpus_normalRoot.json       # collection document
//! ├── arcpname,object_normalItem.json       # object document
//! ├── arcpname,object_normalFileItem.json   # file document
//! └── arcpname,broken_fetchError.json       # failed fetch
//! ```

pub mod local;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::ItemKind;
use crate::utils::sanitize_filename;

// Re-export for convenience
pub use local::LocalDiagnostics;

/// Pipeline stage a diagnostic payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticStage {
    Root,
    Item,
    File,
    Fetch,
}

impl DiagnosticStage {
    pub fn suffix(&self) -> &'static str {
        match self {
            DiagnosticStage::Root => "_normalRoot.json",
            DiagnosticStage::Item => "_normalItem.json",
            DiagnosticStage::File => "_normalFileItem.json",
            DiagnosticStage::Fetch => "_fetchError.json",
        }
    }

    /// File name for a crate's payload at this stage.
    pub fn file_name(&self, crate_id: &str) -> String {
        format!("{}{}", sanitize_filename(crate_id), self.suffix())
    }
}

impl From<ItemKind> for DiagnosticStage {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Collection => DiagnosticStage::Root,
            ItemKind::Object => DiagnosticStage::Item,
            ItemKind::File => DiagnosticStage::File,
        }
    }
}

/// Trait for diagnostic backends.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Persist a payload for `crate_id`, returning where it went.
    async fn record(&self, crate_id: &str, stage: DiagnosticStage, payload: &Value)
    -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(
            DiagnosticStage::Root.file_name("arcp://name,corpus"),
            "arcpname,corpus_normalRoot.json"
        );
        assert_eq!(
            DiagnosticStage::from(ItemKind::File).file_name("x"),
            "x_normalFileItem.json"
        );
        assert_eq!(
            DiagnosticStage::Fetch.file_name("a/b"),
            "ab_fetchError.json"
        );
    }
}
