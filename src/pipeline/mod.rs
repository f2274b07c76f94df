//! Pipeline entry points for indexer operations.
//!
//! - `run_indexer`: Crawl the repository and write every licensed item
//! - `ensure_index` / `delete_index`: Search index bootstrap

pub mod bootstrap;
pub mod crawl;
pub mod writer;

pub use bootstrap::{delete_index, ensure_index};
pub use crawl::{Indexer, run_indexer};
pub use writer::{IndexWriter, WriteOutcome, document_id};
