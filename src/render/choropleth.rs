use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::Deserialize;

use crate::{
    crs::crs_utils::{epsg_code_to_authority_string, EPSG_4326},
    geofile::{feature::FeatureCollection, geojson::to_geojson_feature_collection},
    prepare::data_preparer::GRAIN_YIELD,
};

use super::colormap::StepColorScale;

/// Foreign member of each embedded feature carrying its resolved fill color.
pub const FILL_COLOR_MEMBER: &str = "fill_color";

/// Fill color of features whose value could not be joined.
pub const NAN_FILL_COLOR: &str = "black";
pub const LINE_COLOR: &str = "black";
pub const LINE_WEIGHT: f64 = 1.0;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChoroplethParams {
    pub color_scheme: String,
    pub bins: usize,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub legend_caption: String,
    pub tooltip_fields: Vec<String>,
}

impl Default for ChoroplethParams {
    fn default() -> Self {
        Self {
            color_scheme: "Spectral".to_string(),
            bins: 6,
            fill_opacity: 0.9,
            line_opacity: 0.2,
            legend_caption: GRAIN_YIELD.to_string(),
            tooltip_fields: vec![GRAIN_YIELD.to_string()],
        }
    }
}

/// A GeoJSON layer shaded by one numeric field, joined to the geometry by a uid field.
///
/// The join is resolved here: every feature of `data` whose uid has a value carries its fill color
/// in the `fill_color` foreign member, the page only reads it back.
pub struct ChoroplethLayer {
    pub data: geojson::FeatureCollection,
    pub scale: Option<StepColorScale>,
    pub params: ChoroplethParams,
    pub show_legend: bool,
}

/// String form of a uid value used as the join key.
pub fn uid_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(uid) => Some(uid.clone()),
        serde_json::Value::Number(uid) => Some(uid.to_string()),
        _ => None,
    }
}

impl ChoroplethLayer {
    pub fn new(
        collection: &FeatureCollection,
        uid_field: &str,
        value_field: &str,
        params: &ChoroplethParams,
        show_legend: bool,
    ) -> anyhow::Result<Self> {
        if collection.crs != EPSG_4326 {
            return Err(anyhow!(
                "Choropleth data must be in EPSG:4326, got {}",
                epsg_code_to_authority_string(collection.crs)
            ));
        }

        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        let mut num_unjoined = 0;
        for feature in &collection.features {
            let uid = feature.attribute(uid_field).and_then(uid_key);
            let value = feature
                .attribute(value_field)
                .and_then(|value| value.as_f64());
            match (uid, value) {
                (Some(uid), Some(value)) => {
                    values.insert(uid, value);
                }
                _ => num_unjoined += 1,
            }
        }
        if num_unjoined > 0 {
            log::warn!(
                "{} features have no '{}' or '{}' and are filled with {}",
                num_unjoined,
                uid_field,
                value_field,
                NAN_FILL_COLOR
            );
        }

        let scale = StepColorScale::from_values(
            &values.values().copied().collect::<Vec<f64>>(),
            &params.color_scheme,
            params.bins,
        )?;
        let mut data = to_geojson_feature_collection(collection);
        if let Some(scale) = &scale {
            log::debug!("Color scale edges for '{}': {:?}", value_field, scale.edges());
            for (feature, embedded) in collection.features.iter().zip(data.features.iter_mut()) {
                let fill_color = feature
                    .attribute(uid_field)
                    .and_then(uid_key)
                    .and_then(|uid| values.get(&uid))
                    .map(|value| scale.color_for(*value));
                if let Some(fill_color) = fill_color {
                    embedded
                        .foreign_members
                        .get_or_insert_with(serde_json::Map::new)
                        .insert(
                            FILL_COLOR_MEMBER.to_string(),
                            serde_json::Value::from(fill_color),
                        );
                }
            }
        }

        Ok(Self {
            data,
            scale,
            params: params.clone(),
            show_legend,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        crs::crs_utils::EPSG_4326,
        geofile::feature::{Feature, FeatureCollection},
        prepare::data_preparer::GRAIN_YIELD,
    };

    use super::{uid_key, ChoroplethLayer, ChoroplethParams, FILL_COLOR_MEMBER};

    fn fill_colors(layer: &ChoroplethLayer) -> Vec<Option<&str>> {
        layer
            .data
            .features
            .iter()
            .map(|feature| {
                feature
                    .foreign_members
                    .as_ref()
                    .and_then(|members| members.get(FILL_COLOR_MEMBER))
                    .and_then(|color| color.as_str())
            })
            .collect()
    }

    fn prepared_plot(uid: serde_json::Value, value: f64) -> Feature {
        let mut feature = Feature::from(geo::Geometry::Point(geo::Point::new(6.02, 46.16)));
        feature.attributes.insert("_uid0_".to_string(), uid);
        feature
            .attributes
            .insert(GRAIN_YIELD.to_string(), serde_json::json!(value));
        feature
    }

    #[test]
    fn test_choropleth_colors_by_uid() {
        let collection = FeatureCollection::new(
            vec![
                prepared_plot(serde_json::json!("low"), 2.0),
                prepared_plot(serde_json::json!(17), 9.0),
                prepared_plot(serde_json::Value::Null, 5.0),
            ],
            EPSG_4326,
        );
        let layer = ChoroplethLayer::new(
            &collection,
            "_uid0_",
            GRAIN_YIELD,
            &ChoroplethParams::default(),
            true,
        )
        .unwrap();

        assert_eq!(
            vec![Some("#d53e4f"), Some("#3288bd"), None],
            fill_colors(&layer)
        );
        let scale = layer.scale.as_ref().unwrap();
        assert_eq!(Some(&2.0), scale.edges().first());
        assert_eq!(Some(&9.0), scale.edges().last());
    }

    #[test]
    fn test_choropleth_joins_float_uids() {
        let collection = FeatureCollection::new(
            vec![
                prepared_plot(serde_json::json!(12.0), 2.0),
                prepared_plot(serde_json::json!(13.0), 9.0),
            ],
            EPSG_4326,
        );
        let layer = ChoroplethLayer::new(
            &collection,
            "_uid0_",
            GRAIN_YIELD,
            &ChoroplethParams::default(),
            true,
        )
        .unwrap();

        assert_eq!(
            vec![Some("#d53e4f"), Some("#3288bd")],
            fill_colors(&layer)
        );
        // Properties are embedded untouched.
        assert_eq!(
            Some(&serde_json::json!(12.0)),
            layer.data.features[0]
                .properties
                .as_ref()
                .unwrap()
                .get("_uid0_")
        );
    }

    #[test]
    fn test_choropleth_empty_collection_has_no_scale() {
        let collection = FeatureCollection::new(vec![], EPSG_4326);
        let layer = ChoroplethLayer::new(
            &collection,
            "_uid0_",
            GRAIN_YIELD,
            &ChoroplethParams::default(),
            true,
        )
        .unwrap();
        assert!(layer.scale.is_none());
        assert!(fill_colors(&layer).is_empty());
    }

    #[test]
    fn test_choropleth_rejects_projected_data() {
        let collection = FeatureCollection::new(vec![], 2056);
        assert!(ChoroplethLayer::new(
            &collection,
            "_uid0_",
            GRAIN_YIELD,
            &ChoroplethParams::default(),
            true
        )
        .is_err());
    }

    #[test]
    fn test_uid_key() {
        assert_eq!(Some("a1".to_string()), uid_key(&serde_json::json!("a1")));
        assert_eq!(Some("42".to_string()), uid_key(&serde_json::json!(42)));
        assert_eq!(None, uid_key(&serde_json::json!([1])));
    }
}
