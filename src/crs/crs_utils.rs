use anyhow::{anyhow, Context};
use proj::Transform;

pub type EpsgCode = u32;

/// WGS 84 longitude/latitude, the CRS every prepared collection ends up in.
pub const EPSG_4326: EpsgCode = 4326;

pub fn epsg_code_to_authority_string(code: EpsgCode) -> String {
    format!("EPSG:{}", code)
}

/// Parse a CRS name as found in GIS exports into an EPSG code.
///
/// Accepted forms:
/// * `EPSG:2056`
/// * `urn:ogc:def:crs:EPSG::2056` and the versioned `urn:ogc:def:crs:EPSG:6.6:2056`
/// * `urn:ogc:def:crs:OGC:1.3:CRS84` and `OGC:CRS84`, both of which are EPSG:4326 in lon/lat order.
pub fn parse_crs_name(name: &str) -> anyhow::Result<EpsgCode> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84")
        || name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC::CRS84")
        || name.eq_ignore_ascii_case("OGC:CRS84")
    {
        return Ok(EPSG_4326);
    }

    let code = if let Some(code) = name.strip_prefix("EPSG:") {
        code
    } else if let Some(rest) = name.strip_prefix("urn:ogc:def:crs:EPSG:") {
        // Version is optional and sits between the authority and the code.
        rest.rsplit(':')
            .next()
            .ok_or_else(|| anyhow!("Unrecognized coordinate reference system '{}'", name))?
    } else {
        return Err(anyhow!(
            "Unrecognized coordinate reference system '{}'",
            name
        ));
    };
    code.parse::<EpsgCode>()
        .with_context(|| format!("Unrecognized coordinate reference system '{}'", name))
}

/// Read the EPSG code from a legacy (GeoJSON 2008) `crs` member.
///
/// Both the named form, `{"type": "name", "properties": {"name": "EPSG:2056"}}`, and the older
/// `{"type": "EPSG", "properties": {"code": 2056}}` form are supported.
pub fn crs_from_geojson_member(member: &serde_json::Value) -> anyhow::Result<EpsgCode> {
    let crs_type = member
        .get("type")
        .and_then(|crs_type| crs_type.as_str())
        .ok_or_else(|| anyhow!("The crs member has no type"))?;
    let properties = member
        .get("properties")
        .ok_or_else(|| anyhow!("The crs member has no properties"))?;
    match crs_type {
        "name" => {
            let name = properties
                .get("name")
                .and_then(|name| name.as_str())
                .ok_or_else(|| anyhow!("Named crs member without a name"))?;
            parse_crs_name(name)
        }
        "EPSG" => {
            let code = properties
                .get("code")
                .and_then(|code| code.as_u64())
                .ok_or_else(|| anyhow!("EPSG crs member without a numeric code"))?;
            EpsgCode::try_from(code).context("EPSG code out of range")
        }
        other => Err(anyhow!("Unsupported crs member type '{}'", other)),
    }
}

/// Project geometries from `from_crs` into `to_crs`.
///
/// Geometries already in the target CRS are returned untouched, so projecting twice is a no-op.
pub fn project_geometries(
    geometries: Vec<Option<geo::Geometry>>,
    from_crs: EpsgCode,
    to_crs: EpsgCode,
) -> anyhow::Result<Vec<Option<geo::Geometry>>> {
    if from_crs == to_crs {
        return Ok(geometries);
    }
    let projection = proj::Proj::new_known_crs(
        &epsg_code_to_authority_string(from_crs),
        &epsg_code_to_authority_string(to_crs),
        None,
    )
    .with_context(|| {
        format!(
            "Could not create projection from {} to {}",
            epsg_code_to_authority_string(from_crs),
            epsg_code_to_authority_string(to_crs)
        )
    })?;
    geometries
        .into_iter()
        .map(|geometry| match geometry {
            Some(geometry) => geometry
                .transformed(&projection)
                .map(Some)
                .map_err(|err| anyhow!("Could not project geometry, {}", err)),
            None => Ok(None),
        })
        .collect()
}
