// src/services/geo.rs

//! Representative points for WKT shapes.

use std::str::FromStr;

use geo::{Geometry, Point, Polygon};
use serde_json::{Map, Value};

use crate::graph::{Entity, Graph, literal_str};

/// Location properties tried in order.
const LOCATION_PROPERTIES: [&str; 2] = ["contentLocation", "spatialCoverage"];

/// Centroid of a shape and the shape it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCentroid {
    /// `POINT(x y)`
    pub centroid: String,
    /// WKT as declared in the crate
    pub original: String,
}

impl GeoCentroid {
    /// Write `_centroid` and `_contentLocation` into a document.
    pub fn apply(&self, document: &mut Map<String, Value>) {
        document.insert("_centroid".into(), Value::String(self.centroid.clone()));
        document.insert(
            "_contentLocation".into(),
            Value::String(self.original.clone()),
        );
    }
}

/// Centroid of a WKT shape. Points pass through unchanged, polygons get
/// the mean of their vertices, anything else has none.
pub fn centroid(shape: &str) -> Option<GeoCentroid> {
    let trimmed = shape.trim();
    let kind = trimmed
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    let centroid = match kind.as_str() {
        "POINT" => trimmed.to_string(),
        "POLYGON" => match parse_wkt(trimmed)? {
            Geometry::Polygon(polygon) => {
                let point = vertex_mean(&polygon)?;
                format!("POINT({} {})", point.x(), point.y())
            }
            _ => return None,
        },
        _ => return None,
    };

    Some(GeoCentroid {
        centroid,
        original: trimmed.to_string(),
    })
}

/// Mean of the ring vertices, each closing coordinate counted once.
fn vertex_mean(polygon: &Polygon<f64>) -> Option<Point<f64>> {
    let (mut x, mut y, mut count) = (0.0, 0.0, 0usize);
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let coords = &ring.0;
        let open = if ring.is_closed() {
            coords.len().saturating_sub(1)
        } else {
            coords.len()
        };
        for coord in &coords[..open] {
            x += coord.x;
            y += coord.y;
            count += 1;
        }
    }
    (count > 0).then(|| Point::new(x / count as f64, y / count as f64))
}

fn parse_wkt(shape: &str) -> Option<Geometry<f64>> {
    let parsed = wkt::Wkt::<f64>::from_str(shape)
        .map_err(|e| log::warn!("Unparsable WKT {shape}: {e}"))
        .ok()?;
    parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| log::warn!("Unsupported WKT {shape}: {e:?}"))
        .ok()
}

/// Centroid for an entity, from `contentLocation` then `spatialCoverage`.
///
/// Each location is dereferenced to its place, then the place's `geo`
/// entity, whose first `asWKT` literal is the shape.
pub fn locate(graph: &Graph, entity: &Entity) -> Option<GeoCentroid> {
    LOCATION_PROPERTIES.iter().find_map(|property| {
        let place = graph.resolve(entity.first(property)?)?;
        let geometry = graph.resolve(place.first("geo")?)?;
        centroid(geometry.first_str("asWKT")?)
    })
}
