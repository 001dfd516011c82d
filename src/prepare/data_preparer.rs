use anyhow::anyhow;
use serde::Deserialize;

use crate::{
    crs::crs_utils::{epsg_code_to_authority_string, project_geometries, EPSG_4326},
    geofile::feature::{Feature, FeatureCollection},
};

/// Name of the field holding the trait label of a row.
pub const TRAIT_NAME_FIELD: &str = "trait_name";
/// Name of the field holding the measured value of a row.
pub const TRAIT_VALUE_FIELD: &str = "trait_value";

pub const GRAIN_YIELD: &str = "Grain Yield [t/ha]";

/// Which trait to keep, what to call its value, and the range and precision it is displayed with.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TraitRule {
    pub trait_name: String,
    pub output_field: String,
    pub min: f64,
    pub max: f64,
    pub decimals: u32,
}

impl Default for TraitRule {
    fn default() -> Self {
        Self {
            trait_name: GRAIN_YIELD.to_string(),
            output_field: GRAIN_YIELD.to_string(),
            min: 2.0,
            max: 9.0,
            decimals: 2,
        }
    }
}

/// Beyond this many decimals an f64 has no digits left to round.
pub const MAX_DECIMALS: u32 = 15;

impl TraitRule {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(anyhow!(
                "Trait '{}' asks for {} decimals, at most {} are supported",
                self.trait_name,
                self.decimals,
                MAX_DECIMALS
            ));
        }
        if !(self.min <= self.max) {
            return Err(anyhow!(
                "Clamp range [{}, {}] of trait '{}' is empty",
                self.min,
                self.max,
                self.trait_name
            ));
        }
        Ok(())
    }

    /// Clamp into [min, max], then round half to even at `decimals` places.
    pub fn clamp_and_round(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.decimals as i32);
        let clamped = value.clamp(self.min, self.max);
        (clamped * scale).round_ties_even() / scale
    }
}

pub struct DataPreparer {
    rule: TraitRule,
}

impl DataPreparer {
    pub fn new(rule: TraitRule) -> anyhow::Result<Self> {
        rule.validate()?;
        Ok(Self { rule })
    }

    pub fn rule(&self) -> &TraitRule {
        &self.rule
    }

    /// Turn a raw collection into the analysis-ready one: reproject to EPSG:4326, keep the rows of
    /// the rule's trait, rename `trait_value` to the output field, then clamp and round it.
    ///
    /// An empty result is not an error. A matching row without a numeric `trait_value` is.
    pub fn prepare(&self, raw: FeatureCollection) -> anyhow::Result<FeatureCollection> {
        let FeatureCollection { features, crs } = raw;
        if crs != EPSG_4326 {
            log::info!(
                "Projecting {} features from {} to {}",
                features.len(),
                epsg_code_to_authority_string(crs),
                epsg_code_to_authority_string(EPSG_4326)
            );
        }
        let (geometries, attributes): (Vec<_>, Vec<_>) = features
            .into_iter()
            .map(|feature| (feature.geometry, feature.attributes))
            .unzip();
        let geometries = project_geometries(geometries, crs, EPSG_4326)?;

        let prepared = geometries
            .into_iter()
            .zip(attributes)
            .map(|(geometry, attributes)| Feature {
                geometry,
                attributes,
            })
            .filter(|feature| self.has_trait(feature))
            .map(|feature| self.rename_and_clamp(feature))
            .collect::<anyhow::Result<Vec<Feature>>>()?;
        Ok(FeatureCollection::new(prepared, EPSG_4326))
    }

    fn has_trait(&self, feature: &Feature) -> bool {
        feature
            .attribute(TRAIT_NAME_FIELD)
            .and_then(|name| name.as_str())
            .map_or(false, |name| name == self.rule.trait_name)
    }

    fn rename_and_clamp(&self, mut feature: Feature) -> anyhow::Result<Feature> {
        let value = feature
            .attributes
            .remove(TRAIT_VALUE_FIELD)
            .ok_or_else(|| anyhow!("Feature of trait '{}' has no trait_value", self.rule.trait_name))?;
        let value = value.as_f64().ok_or_else(|| {
            anyhow!(
                "Feature of trait '{}' has non-numeric trait_value {}",
                self.rule.trait_name,
                value
            )
        })?;
        feature.attributes.insert(
            self.rule.output_field.clone(),
            serde_json::Value::from(self.rule.clamp_and_round(value)),
        );
        Ok(feature)
    }
}
