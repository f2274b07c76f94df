// src/services/licenses.rs

//! Content and metadata license resolution.
//!
//! Content licenses are resolved through a caller-supplied chain of
//! candidates (own license, root dataset), then the license inherited from
//! the enclosing item, then the configured default. Metadata licenses are always read from the crate's own
//! descriptor.

use serde_json::Value;

use crate::graph::{Graph, literal_str, reference_id};
use crate::models::{License, LicenseConfig, MetadataLicense};

/// Resolves licenses against one crate graph, falling back to configured
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct LicenseResolver {
    default: Option<License>,
    default_metadata: Option<MetadataLicense>,
}

impl LicenseResolver {
    pub fn new(config: &LicenseConfig) -> Self {
        Self {
            default: config.default.clone(),
            default_metadata: config.default_metadata.clone(),
        }
    }

    /// First candidate that dereferences to a license entity, else the
    /// inherited license, else the default. `None` means the item must not
    /// be indexed.
    pub fn resolve_content_license(
        &self,
        graph: &Graph,
        candidates: &[Option<&Value>],
        inherited: Option<&License>,
    ) -> Option<License> {
        candidates
            .iter()
            .flatten()
            .find_map(|candidate| {
                let resolved = graph.resolve(candidate);
                if resolved.is_none() {
                    log::debug!("License {} not resolved in graph", describe(candidate));
                }
                resolved
            })
            .map(License::from_entity)
            .or_else(|| inherited.cloned())
            .or_else(|| self.default.clone())
    }

    /// License governing whether the crate's metadata may be surfaced.
    pub fn resolve_metadata_license(&self, graph: &Graph) -> Option<MetadataLicense> {
        let declared = graph
            .descriptor()
            .and_then(|descriptor| descriptor.first("license"));

        match declared {
            Some(value) => Some(match graph.resolve(value) {
                Some(entity) => MetadataLicense::from_entity(entity),
                None => MetadataLicense {
                    is_public: false,
                    name: None,
                    id: reference_id(value).or_else(|| literal_str(value)).map(String::from),
                    description: None,
                },
            }),
            None => {
                if self.default_metadata.is_none() {
                    log::error!(
                        "No metadata license found for {}, skipping",
                        graph.root_id()
                    );
                }
                self.default_metadata.clone()
            }
        }
    }
}

fn describe(value: &Value) -> String {
    reference_id(value)
        .or_else(|| literal_str(value))
        .map(String::from)
        .unwrap_or_else(|| value.to_string())
}
