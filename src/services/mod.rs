//! Service layer for the indexer.
//!
//! This module contains the collaborators the crawl is built from:
//! - Repository API client (`HttpRepository`)
//! - Search index client (`OpenSearchIndex`)
//! - License resolution (`LicenseResolver`)
//! - Geometry centroids (`centroid`, `locate`)

pub mod geo;
mod licenses;
mod repository;
mod search;

pub use geo::{GeoCentroid, centroid, locate};
pub use licenses::LicenseResolver;
pub use repository::{HttpRepository, Repository};
pub use search::{OpenSearchIndex, SearchIndex};
