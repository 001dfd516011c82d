use crate::crs::crs_utils::EpsgCode;

/// Attribute fields of a feature, keyed by field name.
pub type FeatureMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<geo::Geometry>,
    pub attributes: FeatureMap,
}

impl Feature {
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            geometry: Some(value),
            attributes: FeatureMap::new(),
        }
    }
}

/// Features sharing one coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: EpsgCode,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>, crs: EpsgCode) -> Self {
        Self { features, crs }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
