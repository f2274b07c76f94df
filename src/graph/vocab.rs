// src/graph/vocab.rs

//! Vocabulary map and property-name normalization.
//!
//! Terms are loaded once from a JSON-LD context file. Bare property names
//! whose IRI falls in the indexer's own namespace are rewritten to the short
//! prefixed form (`subjectLanguage` -> `ldac:subjectLanguage`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use super::{Entity, Graph};
use crate::error::{AppError, Result};
use crate::models::VocabularyConfig;

/// Term -> IRI map for one namespace.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    namespace: String,
    prefix: String,
    terms: HashMap<String, String>,
}

impl Vocabulary {
    /// Empty vocabulary; only the prefix itself resolves.
    pub fn new(namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let prefix = prefix.into();
        let mut terms = HashMap::new();
        terms.insert(prefix.clone(), namespace.clone());
        Self {
            namespace,
            prefix,
            terms,
        }
    }

    /// Add or replace a term mapping.
    pub fn with_term(mut self, term: impl Into<String>, iri: impl Into<String>) -> Self {
        self.terms.insert(term.into(), iri.into());
        self
    }

    /// Read term definitions from a JSON-LD context.
    ///
    /// Accepts `{"@context": ...}` or the context itself, as an object or an
    /// array of objects. Remote context URLs inside an array are ignored.
    pub fn from_context(
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        context: &Value,
    ) -> Result<Self> {
        let mut vocab = Self::new(namespace, prefix);
        let context = context.get("@context").unwrap_or(context);

        let objects: Vec<&serde_json::Map<String, Value>> = match context {
            Value::Object(map) => vec![map],
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => {
                return Err(AppError::config(
                    "vocabulary context must be an object or an array",
                ));
            }
        };

        for map in objects {
            for (term, definition) in map {
                if term.starts_with('@') {
                    continue;
                }
                let iri = match definition {
                    Value::String(iri) => Some(iri.as_str()),
                    Value::Object(def) => def.get("@id").and_then(Value::as_str),
                    _ => None,
                };
                if let Some(iri) = iri {
                    vocab.terms.insert(term.clone(), iri.to_string());
                }
            }
        }

        log::debug!("Loaded {} vocabulary terms", vocab.terms.len());
        Ok(vocab)
    }

    /// Load the vocabulary described by the configuration.
    pub fn load(config: &VocabularyConfig) -> Result<Self> {
        match &config.context_file {
            Some(path) => Self::load_file(&config.namespace, &config.prefix, path),
            None => Ok(Self::new(&config.namespace, &config.prefix)),
        }
    }

    fn load_file(namespace: &str, prefix: &str, path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let context: Value = serde_json::from_str(&content)?;
        Self::from_context(namespace, prefix, &context)
    }

    /// Absolute IRI of a term, expanding compact `prefix:suffix` values.
    pub fn resolve(&self, term: &str) -> Option<String> {
        let raw = self.terms.get(term)?;
        if raw.contains("://") {
            return Some(raw.clone());
        }
        let (prefix, suffix) = raw.split_once(':')?;
        let base = self.terms.get(prefix)?;
        Some(format!("{base}{suffix}"))
    }

    /// Prefixed name for a term in the own namespace.
    pub fn short_name(&self, term: &str) -> Option<String> {
        let iri = self.resolve(term)?;
        let local = iri.strip_prefix(&self.namespace)?;
        if local.is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.prefix, local))
    }

    /// Name under the own prefix, whether or not the term is mapped.
    pub fn prefixed(&self, term: &str) -> String {
        format!("{}:{}", self.prefix, term)
    }

    /// Rename own-namespace properties of one entity.
    pub fn normalize_entity(&self, entity: &Entity) -> Entity {
        let mut normalized = Entity {
            id: entity.id.clone(),
            types: entity.types.clone(),
            properties: Default::default(),
        };

        for (property, values) in &entity.properties {
            let target = if is_prefixed_or_reserved(property) {
                None
            } else {
                self.short_name(property)
            };
            normalized
                .properties
                .entry(target.unwrap_or_else(|| property.clone()))
                .or_default()
                .extend(values.iter().cloned());
        }

        normalized
    }

    /// Rename own-namespace properties across the graph.
    pub fn normalize(&self, graph: &Graph) -> Result<Graph> {
        graph.map_entities(|entity| self.normalize_entity(entity))
    }
}

fn is_prefixed_or_reserved(property: &str) -> bool {
    property.starts_with('@') || property.contains(':')
}
