//! Base geographic features

use std::sync::Arc;

use ahash::AHashMap;
use geo_types::MultiPolygon;

use super::CountyId;

/// One county boundary with its stable identifier
#[derive(Debug, Clone)]
pub struct GeometryFeature {
    pub county_id: CountyId,
    pub name: String,
    /// Shared with every enriched record built from this feature
    pub boundary: Arc<MultiPolygon<f64>>,
}

impl GeometryFeature {
    pub fn new(county_id: CountyId, name: impl Into<String>, boundary: MultiPolygon<f64>) -> Self {
        Self {
            county_id,
            name: name.into(),
            boundary: Arc::new(boundary),
        }
    }
}

/// Immutable feature collection, loaded once for the process lifetime
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    features: Vec<GeometryFeature>,
    index: AHashMap<CountyId, usize>,
}

impl GeometryStore {
    /// Build a store, keeping input order. The first feature wins id lookups.
    pub fn new(features: Vec<GeometryFeature>) -> Self {
        let mut index = AHashMap::with_capacity(features.len());
        let mut duplicates = 0usize;

        for (position, feature) in features.iter().enumerate() {
            if index.contains_key(&feature.county_id) {
                duplicates += 1;
            } else {
                index.insert(feature.county_id, position);
            }
        }

        if duplicates > 0 {
            tracing::warn!("Geometry contains {} duplicate county ids", duplicates);
        }

        Self { features, index }
    }

    pub fn features(&self) -> &[GeometryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, county_id: CountyId) -> Option<&GeometryFeature> {
        self.index.get(&county_id).map(|&i| &self.features[i])
    }

    pub fn contains(&self, county_id: CountyId) -> bool {
        self.index.contains_key(&county_id)
    }
}
