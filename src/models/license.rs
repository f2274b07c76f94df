//! License data structures.

use serde::{Deserialize, Serialize};

use crate::graph::{Entity, literal_bool, literal_str};

/// A content license: governs access to an item's bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(rename = "@id", alias = "id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "isPublic", default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    /// `Some(false)` forbids inlining file content into the index
    #[serde(
        rename = "allowTextIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allow_text_index: Option<bool>,

    /// Access group the license grants membership through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl License {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            is_public: None,
            allow_text_index: None,
            group: None,
        }
    }

    /// Read a license from its graph entity.
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name().map(String::from),
            description: entity.first_str("description").map(String::from),
            is_public: entity.first("isPublic").and_then(literal_bool),
            allow_text_index: entity.first("allowTextIndex").and_then(literal_bool),
            group: entity
                .first("group")
                .and_then(|v| literal_str(v).or_else(|| crate::graph::reference_id(v)))
                .map(String::from),
        }
    }

    /// Whether file content under this license may be text-indexed.
    pub fn permits_text_index(&self) -> bool {
        self.allow_text_index != Some(false)
    }
}

/// A metadata license: governs whether descriptive fields may be surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataLicense {
    #[serde(rename = "isPublic", default)]
    pub is_public: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, alias = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataLicense {
    /// Read a metadata license from its graph entity.
    ///
    /// A missing `metadataIsPublic` flag reads as not public.
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            is_public: entity
                .first("metadataIsPublic")
                .and_then(literal_bool)
                .unwrap_or(false),
            name: entity.name().map(String::from),
            id: Some(entity.id.clone()),
            description: entity.first_str("description").map(String::from),
        }
    }
}
