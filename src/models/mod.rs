// src/models/mod.rs

//! Domain models for the indexer.
//!
//! This module contains the data structures shared across the pipeline,
//! organized by their primary purpose.

mod config;
mod crate_ref;
mod license;

// Re-export all public types
pub use config::{
    ApiConfig, Config, ConformsToConfig, CrawlConfig, FetchErrorPolicy, LicenseConfig,
    LoggingConfig, SearchConfig, VocabularyConfig,
};
pub use crate_ref::{CollectionStack, CrateRef, Pointer};
pub use license::{License, MetadataLicense};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Conformance role of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemKind {
    Collection,
    Object,
    File,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Collection => "collection",
            ItemKind::Object => "object",
            ItemKind::File => "file",
        }
    }
}

/// Counters for one crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub collections: usize,
    pub objects: usize,
    pub files: usize,
    /// Items left out for want of a license or of a conformance role
    pub skipped: usize,
    pub write_failures: usize,
    pub fetch_failures: usize,
}

impl CrawlStats {
    pub fn start() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            collections: 0,
            objects: 0,
            files: 0,
            skipped: 0,
            write_failures: 0,
            fetch_failures: 0,
        }
    }

    /// Count one written document.
    pub fn record_written(&mut self, kind: ItemKind) {
        match kind {
            ItemKind::Collection => self.collections += 1,
            ItemKind::Object => self.objects += 1,
            ItemKind::File => self.files += 1,
        }
    }

    pub fn written(&self) -> usize {
        self.collections + self.objects + self.files
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }
}
