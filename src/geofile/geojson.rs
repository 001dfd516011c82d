use anyhow::{anyhow, Context};
use std::{fs, path::Path};

use crate::crs::crs_utils::{crs_from_geojson_member, epsg_code_to_authority_string, EPSG_4326};

use super::feature::{Feature, FeatureCollection, FeatureMap};

/// Read a GeoJSON feature collection from file.
///
/// The CRS comes from the legacy `crs` member written by most GIS exports. Files without one are
/// taken to be in EPSG:4326, the only CRS RFC 7946 allows.
pub fn read_features_from_geojson(filepath: &Path) -> anyhow::Result<FeatureCollection> {
    let contents = fs::read_to_string(filepath)
        .with_context(|| format!("Could not read GeoJSON file {:?}", filepath))?;
    let geojson_contents: geojson::GeoJson = contents
        .parse()
        .with_context(|| format!("Could not parse GeoJSON file {:?}", filepath))?;
    let feature_collection = match geojson_contents {
        geojson::GeoJson::FeatureCollection(feature_collection) => feature_collection,
        _ => {
            return Err(anyhow!(
                "{:?} does not contain a FeatureCollection",
                filepath
            ))
        }
    };

    let crs = match feature_collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
    {
        Some(member) => crs_from_geojson_member(member)?,
        None => EPSG_4326,
    };
    log::debug!(
        "Reading {:?} in {}",
        filepath,
        epsg_code_to_authority_string(crs)
    );

    let features = feature_collection
        .features
        .into_iter()
        .map(feature_from_geojson)
        .collect::<anyhow::Result<Vec<Feature>>>()?;
    Ok(FeatureCollection::new(features, crs))
}

fn feature_from_geojson(feature: geojson::Feature) -> anyhow::Result<Feature> {
    let geometry = match feature.geometry {
        Some(geometry) => Some(
            geo::Geometry::<f64>::try_from(geometry)
                .map_err(|err| anyhow!("Could not convert GeoJSON geometry, {}", err))?,
        ),
        None => None,
    };
    Ok(Feature {
        geometry,
        attributes: feature.properties.unwrap_or_else(FeatureMap::new),
    })
}

pub fn to_geojson_feature_collection(collection: &FeatureCollection) -> geojson::FeatureCollection {
    collection
        .features
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: feature.geometry.as_ref().map(geojson::Geometry::from),
            id: None,
            properties: Some(feature.attributes.clone()),
            foreign_members: None,
        })
        .collect()
}

/// Write a collection as GeoJSON. Only EPSG:4326 collections can be written, as RFC 7946 requires.
pub fn write_features_to_geojson(
    collection: &FeatureCollection,
    output_filepath: &Path,
) -> anyhow::Result<()> {
    if collection.crs != EPSG_4326 {
        return Err(anyhow!(
            "Cannot write features in {} to GeoJSON",
            epsg_code_to_authority_string(collection.crs)
        ));
    }
    let geojson_contents = geojson::GeoJson::from(to_geojson_feature_collection(collection));
    fs::write(output_filepath, geojson_contents.to_string())
        .with_context(|| format!("Could not write GeoJSON to {:?}", output_filepath))
}
