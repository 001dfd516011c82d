use std::{fmt::Write, fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{
    choropleth::{ChoroplethLayer, FILL_COLOR_MEMBER, LINE_COLOR, LINE_WEIGHT, NAN_FILL_COLOR},
    overlay::escape_html,
};

const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css";
const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js";
const LEAFLET_SYNC_JS: &str = "https://cdn.jsdelivr.net/gh/jieter/Leaflet.Sync/L.Map.Sync.min.js";

const DOCUMENT_STYLE: &str = r#"
    <style>
        html, body {width: 100%; height: 100%; margin: 0; padding: 0;}
        .map {position: absolute; top: 0; bottom: 0; width: 50%; height: 100%;}
        #map_left {left: 0;}
        #map_right {left: 50%;}
        .legend {
            background-color: white;
            padding: 6px 8px;
            border-radius: 5px;
            font: 12px/18px sans-serif;
        }
        .legend i {
            width: 18px;
            height: 18px;
            float: left;
            margin-right: 8px;
        }
        .legend-caption {font-weight: bold; margin-bottom: 4px;}
    </style>"#;

const TOOLTIP_SCRIPT: &str = r#"
        function escapeHtml(value) {
            return String(value)
                .replace(/&/g, "&amp;")
                .replace(/</g, "&lt;")
                .replace(/>/g, "&gt;")
                .replace(/"/g, "&quot;");
        }
        function tooltipTable(properties, fields) {
            var rows = fields.map(function (field) {
                var value = properties[field];
                if (value === undefined || value === null) {
                    value = "";
                }
                return "<tr><th>" + escapeHtml(field) + "</th><td>" + escapeHtml(value) + "</td></tr>";
            });
            return "<table>" + rows.join("") + "</table>";
        }"#;

/// Built-in XYZ tile sources.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum TileProvider {
    #[serde(rename = "openstreetmap")]
    OpenStreetMap,
    #[serde(rename = "cartodbpositron")]
    CartoDbPositron,
}

impl TileProvider {
    pub fn url(&self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            TileProvider::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
            TileProvider::CartoDbPositron => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>"
            }
        }
    }

    pub fn max_zoom(&self) -> u8 {
        match self {
            TileProvider::OpenStreetMap => 19,
            TileProvider::CartoDbPositron => 20,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapParams {
    pub center: LatLon,
    pub zoom_start: u8,
    /// Attribution of the first tile layer. The other layers keep their own.
    pub attribution: String,
    pub tile_layers: Vec<TileProvider>,
    pub pane_z_index: i32,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            center: LatLon {
                lat: 46.16,
                lon: 6.02,
            },
            zoom_start: 15,
            attribution: "© Terensis GmbH (2024). Basemap data © CartoDB".to_string(),
            tile_layers: vec![TileProvider::OpenStreetMap, TileProvider::CartoDbPositron],
            pane_z_index: 625,
        }
    }
}

/// One half of the dual map. The choropleth is drawn in a custom Leaflet pane named `name`.
pub struct MapPane {
    pub name: String,
    pub choropleth: ChoroplethLayer,
}

/// Two synchronised Leaflet maps side by side, rendered to a standalone HTML document.
pub struct DualMap {
    params: MapParams,
    left: MapPane,
    right: MapPane,
}

/// Serialize for embedding in a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    let json = serde_json::to_string(value).context("Could not serialize map data")?;
    Ok(json.replace("</", "<\\/"))
}

impl DualMap {
    pub fn new(params: MapParams, left: MapPane, right: MapPane) -> Self {
        Self {
            params,
            left,
            right,
        }
    }

    pub fn render(&self) -> anyhow::Result<String> {
        let mut html = String::new();
        writeln!(html, "<!DOCTYPE html>")?;
        writeln!(html, "<html>")?;
        writeln!(html, "<head>")?;
        writeln!(html, "    <meta charset=\"utf-8\" />")?;
        writeln!(
            html,
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no\" />"
        )?;
        writeln!(html, "    <link rel=\"stylesheet\" href=\"{}\" />", LEAFLET_CSS)?;
        writeln!(html, "    <script src=\"{}\"></script>", LEAFLET_JS)?;
        writeln!(html, "    <script src=\"{}\"></script>", LEAFLET_SYNC_JS)?;
        writeln!(html, "{}", DOCUMENT_STYLE)?;
        writeln!(html, "</head>")?;
        writeln!(html, "<body>")?;
        writeln!(html, "    <div class=\"map\" id=\"map_left\"></div>")?;
        writeln!(html, "    <div class=\"map\" id=\"map_right\"></div>")?;
        writeln!(html, "    <script>{}", TOOLTIP_SCRIPT)?;
        self.render_pane(&mut html, "map_left", &self.left)?;
        self.render_pane(&mut html, "map_right", &self.right)?;
        writeln!(html, "        map_left.sync(map_right);")?;
        writeln!(html, "        map_right.sync(map_left);")?;
        writeln!(html, "    </script>")?;
        writeln!(html, "</body>")?;
        writeln!(html, "</html>")?;
        Ok(html)
    }

    fn render_pane(&self, html: &mut String, var: &str, pane: &MapPane) -> anyhow::Result<()> {
        let params = &self.params;
        let layer = &pane.choropleth;
        let pane_name = script_json(&pane.name)?;

        writeln!(
            html,
            "        var {var} = L.map({}, {{center: [{}, {}], zoom: {}, crs: L.CRS.EPSG3857}});",
            script_json(var)?,
            params.center.lat,
            params.center.lon,
            params.zoom_start
        )?;
        for (index, tiles) in params.tile_layers.iter().enumerate() {
            let attribution = if index == 0 {
                params.attribution.as_str()
            } else {
                tiles.attribution()
            };
            writeln!(
                html,
                "        L.tileLayer({}, {{attribution: {}, maxZoom: {}}}).addTo({var});",
                script_json(tiles.url())?,
                script_json(attribution)?,
                tiles.max_zoom()
            )?;
        }

        writeln!(html, "        {var}.createPane({pane_name});")?;
        writeln!(
            html,
            "        {var}.getPane({pane_name}).style.zIndex = {};",
            params.pane_z_index
        )?;
        writeln!(
            html,
            "        var {var}_choropleth = L.geoJson({}, {{",
            script_json(&layer.data)?
        )?;
        writeln!(html, "            pane: {pane_name},")?;
        writeln!(html, "            style: function (feature) {{")?;
        writeln!(
            html,
            "                var fill = feature[{}];",
            script_json(FILL_COLOR_MEMBER)?
        )?;
        writeln!(
            html,
            "                return {{color: {}, weight: {}, opacity: {}, fillColor: fill === undefined ? {} : fill, fillOpacity: {}}};",
            script_json(LINE_COLOR)?,
            LINE_WEIGHT,
            layer.params.line_opacity,
            script_json(NAN_FILL_COLOR)?,
            layer.params.fill_opacity
        )?;
        writeln!(html, "            }}")?;
        writeln!(html, "        }}).bindTooltip(function (layer) {{")?;
        writeln!(
            html,
            "            return tooltipTable(layer.feature.properties, {});",
            script_json(&layer.params.tooltip_fields)?
        )?;
        writeln!(html, "        }}, {{sticky: true}}).addTo({var});")?;

        if !layer.show_legend {
            return Ok(());
        }
        if let Some(legend) = self.legend_html(layer) {
            writeln!(
                html,
                "        var {var}_legend = L.control({{position: \"topright\"}});"
            )?;
            writeln!(html, "        {var}_legend.onAdd = function () {{")?;
            writeln!(
                html,
                "            var div = L.DomUtil.create(\"div\", \"legend\");"
            )?;
            writeln!(html, "            div.innerHTML = {};", script_json(&legend)?)?;
            writeln!(html, "            return div;")?;
            writeln!(html, "        }};")?;
            writeln!(html, "        {var}_legend.addTo({var});")?;
        }
        Ok(())
    }

    fn legend_html(&self, layer: &ChoroplethLayer) -> Option<String> {
        let scale = layer.scale.as_ref()?;
        let mut legend = format!(
            "<div class=\"legend-caption\">{}</div>",
            escape_html(&layer.params.legend_caption)
        );
        for (color, bounds) in scale.colors().iter().zip(scale.edges().windows(2)) {
            legend.push_str(&format!(
                "<i style=\"background: {}\"></i>{:.2} - {:.2}<br>",
                color, bounds[0], bounds[1]
            ));
        }
        Some(legend)
    }

    /// Write the document to `output_filepath`, replacing any previous contents.
    pub fn save(&self, output_filepath: &Path) -> anyhow::Result<()> {
        let html = self.render()?;
        log::info!("Writing dual map to {:?}", output_filepath);
        fs::write(output_filepath, html)
            .with_context(|| format!("Could not write map to {:?}", output_filepath))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testdir::testdir;

    use crate::{
        crs::crs_utils::EPSG_4326,
        geofile::feature::{Feature, FeatureCollection},
        prepare::data_preparer::GRAIN_YIELD,
        render::choropleth::{ChoroplethLayer, ChoroplethParams},
    };

    use super::{DualMap, MapPane, MapParams};

    fn pane(name: &str, values: &[f64], show_legend: bool) -> MapPane {
        let features = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let mut feature =
                    Feature::from(geo::Geometry::Point(geo::Point::new(6.02, 46.16)));
                feature
                    .attributes
                    .insert("_uid0_".to_string(), serde_json::json!(index));
                feature
                    .attributes
                    .insert(GRAIN_YIELD.to_string(), serde_json::json!(value));
                feature
            })
            .collect();
        let collection = FeatureCollection::new(features, EPSG_4326);
        MapPane {
            name: name.to_string(),
            choropleth: ChoroplethLayer::new(
                &collection,
                "_uid0_",
                GRAIN_YIELD,
                &ChoroplethParams::default(),
                show_legend,
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_render_dual_map() {
        let dual_map = DualMap::new(
            MapParams::default(),
            pane("2019", &[2.0, 5.5, 9.0], true),
            pane("2022", &[3.1, 4.2], false),
        );
        let html = dual_map.render().unwrap();

        assert!(html.contains("<div class=\"map\" id=\"map_left\"></div>"));
        assert!(html.contains("<div class=\"map\" id=\"map_right\"></div>"));
        assert!(html.contains("var map_left = L.map(\"map_left\", {center: [46.16, 6.02], zoom: 15"));
        assert!(html.contains("map_left.sync(map_right);"));
        assert!(html.contains("map_right.getPane(\"2022\").style.zIndex = 625;"));
        assert!(html.contains("light_all"));
        assert!(html.contains("© Terensis GmbH (2024). Basemap data © CartoDB"));
        assert!(html.contains("fillOpacity: 0.9"));
        assert!(html.contains("var fill = feature[\"fill_color\"];"));
        assert!(html.contains("\"fill_color\":\"#d53e4f\""));
        assert!(html.contains("\"fill_color\":\"#3288bd\""));
        assert!(html.contains("opacity: 0.2"));
        assert!(html.contains("tooltipTable(layer.feature.properties, [\"Grain Yield [t/ha]\"])"));

        // Only the left pane carries a legend.
        assert_eq!(1, html.matches("L.control(").count());
        assert!(html.contains("var map_left_legend"));
        assert!(html.contains("2.00 - 3.17"));
    }

    #[test]
    fn test_render_escapes_script_end_tags() {
        let mut params = MapParams::default();
        params.attribution = "</script><b>".to_string();
        let dual_map = DualMap::new(params, pane("2019", &[2.0], true), pane("2022", &[], true));
        let html = dual_map.render().unwrap();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("<\\/script><b>"));
        // No values on the right, so no scale and no legend there.
        assert_eq!(1, html.matches("L.control(").count());
    }

    #[test]
    fn test_save_overwrites() {
        let test_dir = testdir!();
        let filepath = test_dir.join("index.html");
        fs::write(&filepath, "stale contents").unwrap();

        let dual_map = DualMap::new(
            MapParams::default(),
            pane("2019", &[2.0], true),
            pane("2022", &[9.0], false),
        );
        dual_map.save(&filepath).unwrap();

        let contents = fs::read_to_string(&filepath).unwrap();
        assert!(contents.starts_with("<!DOCTYPE html>"));
        assert!(!contents.contains("stale contents"));
    }
}
