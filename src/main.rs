extern crate log;
pub mod crs;
pub mod geofile;
pub mod prepare;
pub mod render;
use crate::geofile::geojson::{read_features_from_geojson, write_features_to_geojson};
use crate::prepare::data_preparer::{DataPreparer, TraitRule};
use crate::render::choropleth::{ChoroplethLayer, ChoroplethParams};
use crate::render::dual_map::{DualMap, MapPane, MapParams};
use crate::render::overlay::{Title, TitleOverlay};
use anyhow::anyhow;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs::read_to_string, path::Path};

/// Render two years of trait measurements as a side-by-side choropleth map.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML config file. Without one the grain yield 2019/2022 defaults are used.
    #[arg(short, long)]
    config_filepath: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
struct PaneConfig {
    name: String,
    geofile_path: PathBuf,
    /// Defaults to the pane name.
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    title_left: Option<String>,
    #[serde(default)]
    legend: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
struct Config {
    output_filepath: PathBuf,
    /// Directory to dump the prepared GeoJSON of each pane to.
    dump_dir: Option<PathBuf>,
    uid_field: String,
    trait_rule: TraitRule,
    map: MapParams,
    choropleth: ChoroplethParams,
    panes: Vec<PaneConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_filepath: PathBuf::from("index.html"),
            dump_dir: None,
            uid_field: "_uid0_".to_string(),
            trait_rule: TraitRule::default(),
            map: MapParams::default(),
            choropleth: ChoroplethParams::default(),
            panes: vec![
                PaneConfig {
                    name: "2019".to_string(),
                    geofile_path: PathBuf::from("data/grain_yield_2019.geojson"),
                    title: Some("Grain Yield 2019".to_string()),
                    title_left: None,
                    legend: true,
                },
                PaneConfig {
                    name: "2022".to_string(),
                    geofile_path: PathBuf::from("data/grain_yield_2022.geojson"),
                    title: Some("Grain Yield 2022".to_string()),
                    title_left: Some("60%".to_string()),
                    legend: false,
                },
            ],
        }
    }
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.panes.len() != 2 {
            return Err(anyhow!(
                "A dual map needs exactly 2 panes, {} configured",
                self.panes.len()
            ));
        }
        self.trait_rule.validate()
    }
}

fn load_config(config_filepath: Option<&str>) -> anyhow::Result<Config> {
    let config = match config_filepath {
        Some(config_filepath) => {
            if !Path::new(config_filepath).exists() {
                return Err(anyhow!("Config file {} not found", config_filepath));
            }
            let config_contents = read_to_string(config_filepath)?;
            serde_yaml::from_str(&config_contents)?
        }
        None => {
            log::info!("No config file given, using defaults");
            Config::default()
        }
    };
    config.validate()?;
    Ok(config)
}

fn load_pane(
    pane_config: &PaneConfig,
    config: &Config,
    preparer: &DataPreparer,
) -> anyhow::Result<MapPane> {
    log::info!(
        "Reading features of pane {} from {:?}",
        pane_config.name,
        pane_config.geofile_path
    );
    let raw = read_features_from_geojson(&pane_config.geofile_path)?;
    let num_raw_features = raw.len();
    let prepared = preparer.prepare(raw)?;
    log::info!(
        "Kept {} of {} features with trait '{}'",
        prepared.len(),
        num_raw_features,
        preparer.rule().trait_name
    );
    if prepared.is_empty() {
        log::warn!("Pane {} has no features to display", pane_config.name);
    }

    if let Some(dump_dir) = &config.dump_dir {
        let dump_filepath = dump_dir.join(format!("{}_prepared.geojson", pane_config.name));
        log::info!("Writing prepared features to {:?}", dump_filepath);
        write_features_to_geojson(&prepared, &dump_filepath)?;
    }

    let choropleth = ChoroplethLayer::new(
        &prepared,
        &config.uid_field,
        &preparer.rule().output_field,
        &config.choropleth,
        pane_config.legend,
    )?;
    Ok(MapPane {
        name: pane_config.name.clone(),
        choropleth,
    })
}

fn run(config: &Config) -> anyhow::Result<()> {
    let preparer = DataPreparer::new(config.trait_rule.clone())?;
    let map_panes = config
        .panes
        .iter()
        .map(|pane_config| load_pane(pane_config, config, &preparer))
        .collect::<anyhow::Result<Vec<MapPane>>>()?;
    let [left, right]: [MapPane; 2] = map_panes
        .try_into()
        .map_err(|_| anyhow!("A dual map needs exactly 2 panes"))?;

    DualMap::new(config.map.clone(), left, right).save(&config.output_filepath)?;

    let overlay = TitleOverlay {
        titles: config
            .panes
            .iter()
            .map(|pane_config| Title {
                text: pane_config
                    .title
                    .clone()
                    .unwrap_or_else(|| pane_config.name.clone()),
                left: pane_config.title_left.clone(),
            })
            .collect(),
    };
    overlay.append_to_file(&config.output_filepath)
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    let config = load_config(args.config_filepath.as_deref())?;
    run(&config)
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
