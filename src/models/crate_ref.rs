//! Listing results and hierarchy pointers.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::graph::{Entity, literal_str, reference_id};

/// Lightweight pointer to a crate, as returned by a listing call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCrateRef")]
pub struct CrateRef {
    pub id: String,
    pub types: Vec<String>,
    /// Profiles the listing says the crate conforms to; may be empty
    pub conforms_to: Vec<String>,
    pub record_name: Option<String>,
}

impl CrateRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            types: Vec::new(),
            conforms_to: Vec::new(),
            record_name: None,
        }
    }

    /// Whether the listing places this crate under `profile`. Entries that
    /// declare no profile are taken at the listing's word.
    pub fn declares(&self, profile: &str) -> bool {
        self.conforms_to.is_empty() || self.conforms_to.iter().any(|p| p == profile)
    }

    /// Pointer used as `_root` when this crate heads a traversal.
    pub fn to_pointer(&self) -> Pointer {
        Pointer {
            id: self.id.clone(),
            types: self.types.clone(),
            name: self.record_name.clone(),
        }
    }
}

/// Wire shape of a listing entry.
#[derive(Deserialize)]
struct RawCrateRef {
    #[serde(rename = "crateId")]
    crate_id: Option<String>,
    id: Option<String>,
    #[serde(rename = "@type", default)]
    types: Value,
    #[serde(rename = "conformsTo", default)]
    conforms_to: Value,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
}

impl TryFrom<RawCrateRef> for CrateRef {
    type Error = String;

    fn try_from(raw: RawCrateRef) -> Result<Self, Self::Error> {
        let id = raw
            .crate_id
            .or(raw.id)
            .ok_or_else(|| "listing entry has neither crateId nor id".to_string())?;
        let record_name = raw
            .record
            .as_ref()
            .and_then(|r| r.get("name"))
            .or(raw.name.as_ref())
            .and_then(first_literal)
            .map(String::from);

        Ok(Self {
            id,
            types: id_list(&raw.types),
            conforms_to: id_list(&raw.conforms_to),
            record_name,
        })
    }
}

fn first_literal(value: &Value) -> Option<&str> {
    match value {
        Value::Array(values) => values.first().and_then(first_literal),
        other => literal_str(other),
    }
}

/// Strings or `{"@id"}` objects, single or in an array.
fn id_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(values) => values.iter().flat_map(id_list).collect(),
        Value::String(s) => vec![s.clone()],
        other => reference_id(other).map(String::from).into_iter().collect(),
    }
}

/// `{@id, @type?, name}` reference written into `_root`, `_memberOf`
/// and the collection stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    pub id: String,
    pub types: Vec<String>,
    pub name: Option<String>,
}

impl Pointer {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            types: Vec::new(),
            name: name.map(String::from),
        }
    }

    /// Pointer to a graph entity.
    pub fn to_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            types: entity.types.clone(),
            name: entity.name().map(String::from),
        }
    }

    /// Copy without `@type`, as used in stacks and `_memberOf`.
    pub fn untyped(&self) -> Self {
        Self {
            types: Vec::new(),
            ..self.clone()
        }
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({ "@id": self.id });
        if !self.types.is_empty() {
            value["@type"] = json!(self.types);
        }
        value["name"] = match &self.name {
            Some(name) => json!([{ "@value": name }]),
            None => json!([]),
        };
        value
    }
}

/// Ancestor collections from the root down to, not including, the current item.
///
/// Extending a stack returns a new one; siblings never see each other's entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStack(Vec<Pointer>);

impl CollectionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this stack with `entry` appended.
    pub fn extended(&self, entry: Pointer) -> Self {
        let mut entries = self.0.clone();
        entries.push(entry.untyped());
        Self(entries)
    }

    pub fn entries(&self) -> &[Pointer] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(Pointer::to_value).collect())
    }

    /// Entries that are not the traversal root.
    pub fn sub_collections(&self, root_id: &str) -> Value {
        self.filtered(|p| p.id != root_id)
    }

    /// Entries that are the traversal root.
    pub fn main_collections(&self, root_id: &str) -> Value {
        self.filtered(|p| p.id == root_id)
    }

    fn filtered(&self, keep: impl Fn(&Pointer) -> bool) -> Value {
        Value::Array(
            self.0
                .iter()
                .filter(|p| keep(p))
                .map(Pointer::to_value)
                .collect(),
        )
    }
}
