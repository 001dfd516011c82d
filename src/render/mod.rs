pub mod choropleth;
pub mod colormap;
pub mod dual_map;
pub mod overlay;
