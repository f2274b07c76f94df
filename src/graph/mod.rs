// src/graph/mod.rs

//! Linked entity graph for a single crate.
//!
//! A crate's metadata arrives as a JSON-LD document with an `@graph` array.
//! Entities reference each other by `@id` only; the [`Graph`] owns them for
//! the duration of one crate and answers lookups, dereferences and reverse
//! links. Every property value is held as an array.

pub mod flatten;
pub mod vocab;

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::error::{AppError, Result};

pub use flatten::flatten;
pub use vocab::Vocabulary;

/// Ids the metadata descriptor may carry.
pub const DESCRIPTOR_IDS: [&str; 2] = ["ro-crate-metadata.json", "ro-crate-metadata.jsonld"];

/// Root dataset id used when the descriptor has no `about`.
const DEFAULT_ROOT_ID: &str = "./";

/// A node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub types: Vec<String>,
    pub properties: BTreeMap<String, Vec<Value>>,
}

impl Entity {
    /// Create an entity with no properties.
    pub fn new(id: impl Into<String>, types: &[&str]) -> Self {
        Self {
            id: id.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
            properties: BTreeMap::new(),
        }
    }

    /// Build an entity from one `@graph` member.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| AppError::graph("graph member is not an object"))?;
        let id = object
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::graph("graph member has no @id"))?
            .to_string();

        let types = match object.get("@type") {
            Some(Value::String(t)) => vec![t.clone()],
            Some(Value::Array(ts)) => ts
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        let properties = object
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "@id" | "@type" | "@reverse"))
            .map(|(key, value)| (key.clone(), as_array(value)))
            .collect();

        Ok(Self {
            id,
            types,
            properties,
        })
    }

    /// Builder-style property setter.
    pub fn with(mut self, property: &str, value: Value) -> Self {
        self.properties
            .insert(property.to_string(), as_array(&value));
        self
    }

    /// Copy of this entity without the given properties.
    pub fn without(&self, properties: &[&str]) -> Self {
        let mut copy = self.clone();
        for property in properties {
            copy.properties.remove(*property);
        }
        copy
    }

    /// All values of a property (empty when absent).
    pub fn get(&self, property: &str) -> &[Value] {
        self.properties
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of the first property present among `properties`.
    pub fn first_of(&self, properties: &[&str]) -> Option<&Value> {
        properties.iter().find_map(|p| self.get(p).first())
    }

    /// First value of a property.
    pub fn first(&self, property: &str) -> Option<&Value> {
        self.get(property).first()
    }

    /// First value of a property as a string literal.
    pub fn first_str(&self, property: &str) -> Option<&str> {
        self.first(property).and_then(literal_str)
    }

    /// Display name of the entity.
    pub fn name(&self) -> Option<&str> {
        self.first_str("name")
    }

    /// Ids referenced by a property.
    pub fn references<'a>(&'a self, property: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.get(property).iter().filter_map(reference_id)
    }

    pub fn has_type(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }

    /// Whether `conformsTo` lists the given profile IRI.
    pub fn conforms_to(&self, profile: &str) -> bool {
        self.get("conformsTo")
            .iter()
            .any(|v| reference_id(v).or_else(|| v.as_str()) == Some(profile))
    }
}

/// Wrap a single value as an array.
fn as_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values.clone(),
        other => vec![other.clone()],
    }
}

/// Id of a `{"@id": ...}` reference.
pub fn reference_id(value: &Value) -> Option<&str> {
    value.as_object()?.get("@id")?.as_str()
}

/// String literal, plain or wrapped as `{"@value": ...}`.
pub fn literal_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("@value").and_then(Value::as_str),
        _ => None,
    }
}

/// Boolean literal; accepts `true`, `"true"` and the wrapped forms.
pub fn literal_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Array(values) => values.first().and_then(literal_bool),
        Value::Object(map) => map.get("@value").and_then(literal_bool),
        _ => None,
    }
}

/// All entities of one crate plus the lookups needed to walk them.
#[derive(Debug, Clone)]
pub struct Graph {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    root_id: String,
    /// target id -> property -> source ids
    reverse: HashMap<String, BTreeMap<String, Vec<String>>>,
}

impl Graph {
    /// Parse a JSON-LD crate document (`{"@context": ..., "@graph": [...]}`).
    pub fn from_json(document: &Value) -> Result<Self> {
        let members = document
            .get("@graph")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::graph("document has no @graph array"))?;
        let entities = members
            .iter()
            .map(Entity::from_value)
            .collect::<Result<Vec<_>>>()?;
        Self::from_entities(entities)
    }

    /// Build a graph from entities, locating the root dataset.
    pub fn from_entities(entities: Vec<Entity>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entities.len());
        let mut reverse: HashMap<String, BTreeMap<String, Vec<String>>> = HashMap::new();

        for (position, entity) in entities.iter().enumerate() {
            index.insert(entity.id.clone(), position);
            for (property, values) in &entity.properties {
                for target in values.iter().filter_map(reference_id) {
                    reverse
                        .entry(target.to_string())
                        .or_default()
                        .entry(property.clone())
                        .or_default()
                        .push(entity.id.clone());
                }
            }
        }

        let descriptor = DESCRIPTOR_IDS
            .iter()
            .find_map(|id| index.get(*id))
            .map(|&i| &entities[i]);
        let root_id = descriptor
            .and_then(|d| d.references("about").next())
            .unwrap_or(DEFAULT_ROOT_ID)
            .to_string();

        if !index.contains_key(&root_id) {
            return Err(AppError::graph(format!(
                "root dataset {root_id} not found in graph"
            )));
        }

        Ok(Self {
            entities,
            index,
            root_id,
            reverse,
        })
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// The root dataset.
    pub fn root(&self) -> &Entity {
        // from_entities guarantees the root is indexed
        &self.entities[self.index[&self.root_id]]
    }

    /// The metadata descriptor entity, if the crate has one.
    pub fn descriptor(&self) -> Option<&Entity> {
        DESCRIPTOR_IDS.iter().find_map(|id| self.entity(id))
    }

    /// Dereference an id string or `{"@id"}` object against the graph.
    pub fn resolve(&self, value: &Value) -> Option<&Entity> {
        match value {
            Value::String(id) => self.entity(id),
            Value::Array(values) => values.first().and_then(|v| self.resolve(v)),
            other => reference_id(other).and_then(|id| self.entity(id)),
        }
    }

    /// Ids of entities linking to `id` through `property`.
    pub fn reverse_links(&self, id: &str, property: &str) -> &[String] {
        self.reverse
            .get(id)
            .and_then(|props| props.get(property))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rebuild the graph with every entity passed through `f`.
    pub fn map_entities(&self, f: impl Fn(&Entity) -> Entity) -> Result<Self> {
        Self::from_entities(self.entities.iter().map(f).collect())
    }
}
