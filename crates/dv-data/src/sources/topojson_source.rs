//! County geometry from a TopoJSON topology
//!
//! Supports quantized (delta-encoded) and plain arcs, `Polygon` and
//! `MultiPolygon` geometries, and nested `GeometryCollection`s.

use std::collections::HashMap;

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use dv_core::{GeometryFeature, GeometryStore};

use super::geojson_source::FeatureKeys;
use crate::DataError;

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    arcs: Option<Value>,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
}

/// Decode the named object of a topology into a geometry store.
///
/// When `object` is absent and the topology has exactly one object, that
/// object is used.
pub fn read_topojson(value: Value, object: &str, keys: &FeatureKeys) -> Result<GeometryStore, DataError> {
    let topology: Topology = serde_json::from_value(value)?;
    if topology.kind != "Topology" {
        return Err(DataError::Topology(format!("expected type 'Topology', found '{}'", topology.kind)));
    }

    let root = match topology.objects.get(object) {
        Some(root) => root,
        None => match (topology.objects.len(), topology.objects.iter().next()) {
            (1, Some((name, root))) => {
                debug!("Topology object '{}' not found, using '{}'", object, name);
                root
            }
            _ => return Err(DataError::Topology(format!("object '{}' not found", object))),
        },
    };

    let arcs = decode_arcs(&topology.arcs, topology.transform);

    let mut leaves = Vec::new();
    flatten(root, &mut leaves);

    let mut features = Vec::with_capacity(leaves.len());
    let mut skipped = 0usize;

    for geometry in leaves {
        let properties = geometry.properties.as_ref();
        let Some(county_id) = keys.county_id(geometry.id.as_ref(), properties) else {
            skipped += 1;
            continue;
        };
        let Some(boundary) = boundary(geometry, &arcs)? else {
            skipped += 1;
            continue;
        };
        features.push(GeometryFeature::new(county_id, keys.name(county_id, properties), boundary));
    }

    if skipped > 0 {
        warn!("Skipped {} topology geometries without an id or polygon arcs", skipped);
    }

    Ok(GeometryStore::new(features))
}

fn flatten<'a>(geometry: &'a TopoGeometry, out: &mut Vec<&'a TopoGeometry>) {
    if geometry.kind == "GeometryCollection" {
        for child in &geometry.geometries {
            flatten(child, out);
        }
    } else {
        out.push(geometry);
    }
}

/// Absolute coordinates for every arc, undoing quantization when present
fn decode_arcs(arcs: &[Vec<Vec<f64>>], transform: Option<Transform>) -> Vec<Vec<Coord<f64>>> {
    arcs.iter()
        .map(|arc| match transform {
            Some(t) => {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| {
                        x += p[0];
                        y += p[1];
                        Coord {
                            x: x * t.scale[0] + t.translate[0],
                            y: y * t.scale[1] + t.translate[1],
                        }
                    })
                    .collect()
            }
            None => arc
                .iter()
                .filter(|p| p.len() >= 2)
                .map(|p| Coord { x: p[0], y: p[1] })
                .collect(),
        })
        .collect()
}

fn boundary(geometry: &TopoGeometry, arcs: &[Vec<Coord<f64>>]) -> Result<Option<MultiPolygon<f64>>, DataError> {
    let Some(raw) = geometry.arcs.clone() else {
        return Ok(None);
    };

    let polygons = match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Vec<i64>> = serde_json::from_value(raw)?;
            vec![polygon(&rings, arcs)?]
        }
        "MultiPolygon" => {
            let parts: Vec<Vec<Vec<i64>>> = serde_json::from_value(raw)?;
            parts.iter().map(|rings| polygon(rings, arcs)).collect::<Result<_, _>>()?
        }
        _ => return Ok(None),
    };

    Ok(Some(MultiPolygon(polygons)))
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>, DataError> {
    let mut rings = rings.iter().map(|ring| stitch(ring, arcs));
    let exterior = rings
        .next()
        .transpose()?
        .ok_or_else(|| DataError::Topology("polygon without rings".to_string()))?;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Join arcs into one ring. A negative index `i` means arc `!i` reversed;
/// consecutive arcs share their joining point.
fn stitch(indices: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<LineString<f64>, DataError> {
    let mut coords: Vec<Coord<f64>> = Vec::new();

    for &index in indices {
        let (position, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(position)
            .ok()
            .and_then(|p| arcs.get(p))
            .ok_or_else(|| DataError::Topology(format!("arc index {} out of range", index)))?;

        let points: Box<dyn Iterator<Item = &Coord<f64>>> = if reversed {
            Box::new(arc.iter().rev())
        } else {
            Box::new(arc.iter())
        };

        let skip_first = !coords.is_empty();
        coords.extend(points.skip(usize::from(skip_first)).copied());
    }

    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Two unit squares sharing the edge x = 1, quantized with scale 1 / translate (-90, 30)
    fn topology() -> Value {
        json!({
            "type": "Topology",
            "transform": {"scale": [1.0, 1.0], "translate": [-90.0, 30.0]},
            "arcs": [
                [[1, 0], [0, 1]],
                [[1, 1], [-1, 0], [0, -1], [1, 0]],
                [[1, 0], [1, 0], [0, 1], [-1, 0]]
            ],
            "objects": {
                "counties": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Polygon", "id": "01001", "properties": {"name": "West"}, "arcs": [[0, 1]]},
                        {"type": "MultiPolygon", "id": 1003, "properties": {"name": "East"}, "arcs": [[[2, -1]]]},
                        {"type": "Polygon", "properties": {"name": "No id"}, "arcs": [[0]]},
                        {"type": "Point", "id": 1005, "coordinates": [0, 0]}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_decodes_quantized_arcs() {
        let store = read_topojson(topology(), "counties", &FeatureKeys::default()).unwrap();
        assert_eq!(store.len(), 2);

        let west = store.get(1001).unwrap();
        assert_eq!(west.name, "West");
        let ring: Vec<(f64, f64)> = west.boundary.0[0].exterior().coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            ring,
            vec![(-89.0, 30.0), (-89.0, 31.0), (-90.0, 31.0), (-90.0, 30.0), (-89.0, 30.0)]
        );
    }

    #[test]
    fn test_reversed_arc() {
        let store = read_topojson(topology(), "counties", &FeatureKeys::default()).unwrap();
        let east = store.get(1003).unwrap();
        let ring: Vec<(f64, f64)> = east.boundary.0[0].exterior().coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            ring,
            vec![(-89.0, 30.0), (-88.0, 30.0), (-88.0, 31.0), (-89.0, 31.0), (-89.0, 30.0)]
        );
    }

    #[test]
    fn test_single_object_fallback() {
        let store = read_topojson(topology(), "states", &FeatureKeys::default()).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_bad_arc_index() {
        let doc = json!({
            "type": "Topology",
            "arcs": [],
            "objects": {"counties": {"type": "Polygon", "id": 1, "arcs": [[4]]}}
        });
        let err = read_topojson(doc, "counties", &FeatureKeys::default()).unwrap_err();
        assert!(matches!(err, DataError::Topology(_)));
    }
}
