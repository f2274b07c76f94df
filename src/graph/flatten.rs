// src/graph/flatten.rs

//! Depth-bounded tree view of a graph entity.
//!
//! References are inlined up to `depth` levels; deeper references, references
//! to ids the graph does not hold, and references back into the current path
//! become `{"@id": ...}` stubs. Literals are wrapped as `{"@value": ...}` so
//! every property of the tree is an array of objects.

use serde_json::{Map, Value, json};

use super::{Entity, Graph, reference_id};

/// Flatten `root` into a JSON tree, expanding references `depth` levels deep.
pub fn flatten(graph: &Graph, root: &Entity, depth: usize) -> Map<String, Value> {
    let mut path = Vec::new();
    tree(graph, root, depth, &mut path)
}

fn tree<'g>(
    graph: &'g Graph,
    entity: &'g Entity,
    depth: usize,
    path: &mut Vec<&'g str>,
) -> Map<String, Value> {
    path.push(&entity.id);

    let mut object = Map::new();
    object.insert("@id".into(), Value::String(entity.id.clone()));
    object.insert(
        "@type".into(),
        Value::Array(entity.types.iter().cloned().map(Value::String).collect()),
    );
    for (property, values) in &entity.properties {
        let nodes = values
            .iter()
            .map(|value| node(graph, value, depth, path))
            .collect();
        object.insert(property.clone(), Value::Array(nodes));
    }

    path.pop();
    object
}

fn node<'g>(graph: &'g Graph, value: &'g Value, depth: usize, path: &mut Vec<&'g str>) -> Value {
    if let Some(id) = reference_id(value) {
        // cycle guard: an entity already on the path is never re-entered
        if depth > 0 && !path.contains(&id) {
            if let Some(target) = graph.entity(id) {
                return Value::Object(tree(graph, target, depth - 1, path));
            }
        }
        return json!({ "@id": id });
    }

    match value {
        Value::Object(_) => value.clone(),
        literal => json!({ "@value": literal }),
    }
}
