//! County geometry from a GeoJSON feature collection

use geo_types::{Geometry, MultiPolygon};
use geojson::{feature::Id, GeoJson};
use serde_json::{Map, Value};
use tracing::warn;

use dv_core::{CountyId, GeometryFeature, GeometryStore};

use super::metric_csv::parse_county_id;
use crate::DataError;

/// Where to find a feature's id and display name
#[derive(Debug, Clone)]
pub struct FeatureKeys {
    /// Property holding the county id; the feature `id` is used when unset
    pub id_property: Option<String>,
    pub name_property: String,
}

impl Default for FeatureKeys {
    fn default() -> Self {
        Self {
            id_property: None,
            name_property: "name".to_string(),
        }
    }
}

impl FeatureKeys {
    pub(crate) fn county_id(&self, feature_id: Option<&Value>, properties: Option<&Map<String, Value>>) -> Option<CountyId> {
        match &self.id_property {
            Some(key) => properties.and_then(|p| p.get(key)).and_then(id_from_value),
            None => feature_id
                .and_then(id_from_value)
                .or_else(|| properties.and_then(|p| p.get("id")).and_then(id_from_value)),
        }
    }

    pub(crate) fn name(&self, county_id: CountyId, properties: Option<&Map<String, Value>>) -> String {
        properties
            .and_then(|p| p.get(&self.name_property))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("County {county_id}"))
    }
}

fn id_from_value(value: &Value) -> Option<CountyId> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| CountyId::try_from(v).ok())
            .or_else(|| n.as_f64().and_then(|f| parse_county_id(&f.to_string()))),
        Value::String(s) => parse_county_id(s),
        _ => None,
    }
}

/// Polygonal geometries become a multipolygon; everything else is rejected
pub(crate) fn as_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    }
}

/// Build the geometry store from a parsed GeoJSON document
pub fn read_geojson(value: Value, keys: &FeatureKeys) -> Result<GeometryStore, DataError> {
    let collection = match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(feature) => geojson::FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => {
            return Err(DataError::GeoJson("expected a FeatureCollection, found a bare geometry".to_string()))
        }
    };

    let mut features = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in collection.features {
        let feature_id = feature.id.as_ref().map(|id| match id {
            Id::String(s) => Value::String(s.clone()),
            Id::Number(n) => Value::Number(n.clone()),
        });
        let properties = feature.properties.as_ref();

        let Some(county_id) = keys.county_id(feature_id.as_ref(), properties) else {
            skipped += 1;
            continue;
        };
        let name = keys.name(county_id, properties);

        let boundary = feature
            .geometry
            .map(Geometry::<f64>::try_from)
            .transpose()?
            .and_then(as_multipolygon);
        let Some(boundary) = boundary else {
            skipped += 1;
            continue;
        };

        features.push(GeometryFeature::new(county_id, name, boundary));
    }

    if skipped > 0 {
        warn!("Skipped {} GeoJSON features without an id or polygon geometry", skipped);
    }

    Ok(GeometryStore::new(features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]
        })
    }

    #[test]
    fn test_reads_feature_collection() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "01001", "properties": {"name": "Autauga"}, "geometry": square(0.0)},
                {"type": "Feature", "id": 1003, "properties": {}, "geometry": square(1.0)},
                {"type": "Feature", "properties": {"id": 1005, "name": "Barbour"}, "geometry": square(2.0)},
                {"type": "Feature", "properties": {"name": "Nowhere"}, "geometry": square(3.0)},
                {"type": "Feature", "id": 1007, "properties": {}, "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}
            ]
        });

        let store = read_geojson(doc, &FeatureKeys::default()).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1001).unwrap().name, "Autauga");
        assert_eq!(store.get(1003).unwrap().name, "County 1003");
        assert_eq!(store.get(1005).unwrap().boundary.0.len(), 1);
        assert!(!store.contains(1007));
    }

    #[test]
    fn test_id_property_override() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 1, "properties": {"GEOID": "02013", "NAME": "Aleutians East"}, "geometry": square(0.0)}
            ]
        });
        let keys = FeatureKeys {
            id_property: Some("GEOID".to_string()),
            name_property: "NAME".to_string(),
        };

        let store = read_geojson(doc, &keys).unwrap();
        assert_eq!(store.features()[0].county_id, 2013);
        assert_eq!(store.features()[0].name, "Aleutians East");
    }

    #[test]
    fn test_rejects_bare_geometry() {
        let err = read_geojson(square(0.0), &FeatureKeys::default()).unwrap_err();
        assert!(matches!(err, DataError::GeoJson(_)));
    }
}
