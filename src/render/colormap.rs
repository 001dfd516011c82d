use anyhow::anyhow;

/// ColorBrewer sequential/diverging palettes, indexed by class count starting at three classes.
const SPECTRAL: &[&[&str]] = &[
    &["#fc8d59", "#ffffbf", "#99d594"],
    &["#d7191c", "#fdae61", "#abdda4", "#2b83ba"],
    &["#d7191c", "#fdae61", "#ffffbf", "#abdda4", "#2b83ba"],
    &["#d53e4f", "#fc8d59", "#fee08b", "#e6f598", "#99d594", "#3288bd"],
    &["#d53e4f", "#fc8d59", "#fee08b", "#ffffbf", "#e6f598", "#99d594", "#3288bd"],
    &["#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#e6f598", "#abdda4", "#66c2a5", "#3288bd"],
    &[
        "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#e6f598", "#abdda4", "#66c2a5",
        "#3288bd",
    ],
    &[
        "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#e6f598", "#abdda4", "#66c2a5",
        "#3288bd", "#5e4fa2",
    ],
    &[
        "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#e6f598", "#abdda4",
        "#66c2a5", "#3288bd", "#5e4fa2",
    ],
];

const RD_YL_GN: &[&[&str]] = &[
    &["#fc8d59", "#ffffbf", "#91cf60"],
    &["#d7191c", "#fdae61", "#a6d96a", "#1a9641"],
    &["#d7191c", "#fdae61", "#ffffbf", "#a6d96a", "#1a9641"],
    &["#d73027", "#fc8d59", "#fee08b", "#d9ef8b", "#91cf60", "#1a9850"],
    &["#d73027", "#fc8d59", "#fee08b", "#ffffbf", "#d9ef8b", "#91cf60", "#1a9850"],
    &["#d73027", "#f46d43", "#fdae61", "#fee08b", "#d9ef8b", "#a6d96a", "#66bd63", "#1a9850"],
    &[
        "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b", "#a6d96a", "#66bd63",
        "#1a9850",
    ],
    &[
        "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#d9ef8b", "#a6d96a", "#66bd63",
        "#1a9850", "#006837",
    ],
    &[
        "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b", "#a6d96a",
        "#66bd63", "#1a9850", "#006837",
    ],
];

const YL_GN: &[&[&str]] = &[
    &["#f7fcb9", "#addd8e", "#31a354"],
    &["#ffffcc", "#c2e699", "#78c679", "#238443"],
    &["#ffffcc", "#c2e699", "#78c679", "#31a354", "#006837"],
    &["#ffffcc", "#d9f0a3", "#addd8e", "#78c679", "#31a354", "#006837"],
    &["#ffffcc", "#d9f0a3", "#addd8e", "#78c679", "#41ab5d", "#238443", "#005a32"],
    &["#ffffe5", "#f7fcb9", "#d9f0a3", "#addd8e", "#78c679", "#41ab5d", "#238443", "#005a32"],
    &[
        "#ffffe5", "#f7fcb9", "#d9f0a3", "#addd8e", "#78c679", "#41ab5d", "#238443", "#006837",
        "#004529",
    ],
];

const MIN_CLASSES: usize = 3;

/// Look up `num_classes` colors of a ColorBrewer scheme. A `_r` suffix reverses the scheme, e.g.
/// `Spectral_r`.
pub fn color_brewer(scheme: &str, num_classes: usize) -> anyhow::Result<Vec<String>> {
    let (base_name, reversed) = match scheme.strip_suffix("_r") {
        Some(base_name) => (base_name, true),
        None => (scheme, false),
    };
    let table = match base_name {
        "Spectral" => SPECTRAL,
        "RdYlGn" => RD_YL_GN,
        "YlGn" => YL_GN,
        _ => return Err(anyhow!("Unknown color scheme '{}'", scheme)),
    };
    let max_classes = MIN_CLASSES + table.len() - 1;
    if num_classes < MIN_CLASSES || num_classes > max_classes {
        return Err(anyhow!(
            "Color scheme '{}' supports {} to {} classes, not {}",
            scheme,
            MIN_CLASSES,
            max_classes,
            num_classes
        ));
    }
    let mut colors: Vec<String> = table[num_classes - MIN_CLASSES]
        .iter()
        .map(|color| color.to_string())
        .collect();
    if reversed {
        colors.reverse();
    }
    Ok(colors)
}

/// Color scale with equal-width bins between the smallest and largest value, one color per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct StepColorScale {
    edges: Vec<f64>,
    colors: Vec<String>,
}

impl StepColorScale {
    /// Build the scale for `values`. Returns `None` when there are no values to bin.
    ///
    /// If all values are equal the range is widened by 0.5 on both sides so the bins have a width.
    pub fn from_values(
        values: &[f64],
        scheme: &str,
        num_bins: usize,
    ) -> anyhow::Result<Option<Self>> {
        let colors = color_brewer(scheme, num_bins)?;
        let (min, max) = match values.iter().copied().fold(None, |range, value| match range {
            None => Some((value, value)),
            Some((min, max)) => Some((f64::min(min, value), f64::max(max, value))),
        }) {
            Some(range) => range,
            None => return Ok(None),
        };
        let (min, max) = if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };
        let width = (max - min) / num_bins as f64;
        let mut edges: Vec<f64> = (0..num_bins).map(|bin| min + bin as f64 * width).collect();
        edges.push(max);
        Ok(Some(Self { edges, colors }))
    }

    /// Bin edges, one more than there are colors.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    /// Color of the bin `value` falls into. Bins are closed on the left; the last one is also
    /// closed on the right. Values outside the scale get the nearest end color.
    pub fn color_for(&self, value: f64) -> &str {
        let bin = self.edges[1..self.edges.len() - 1]
            .iter()
            .take_while(|edge| **edge <= value)
            .count();
        &self.colors[bin]
    }
}
