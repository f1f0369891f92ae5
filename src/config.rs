use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub stations_csv: PathBuf,
    pub boundaries: PathBuf, // .geojson / .json / .shp
    #[serde(default = "default_district_column")]
    pub district_column: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub title: String,
    pub center: [f64; 2], // [lat, lon]
    pub zoom: u8,
    pub tiles: String,
    pub width: u32,
    pub height: u32,
    pub boundary_layer_name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub export_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

fn default_district_column() -> String {
    "district".to_string()
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            title: "Uttar Pradesh Map Visualization".to_string(),
            center: [26.8467, 80.9462],
            zoom: 7,
            tiles: "CartoDB positron".to_string(),
            width: 800,
            height: 600,
            boundary_layer_name: "Uttar Pradesh Districts".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("uttar_pradesh_map.html"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8501 }
    }
}

impl MapConfig {
    /// Tile URL template and attribution for the configured base map.
    /// Unrecognised names are treated as a URL template.
    pub fn tile_layer(&self) -> (String, String) {
        match self.tiles.to_lowercase().as_str() {
            "cartodb positron" | "cartodbpositron" => (
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
                "&copy; OpenStreetMap contributors &copy; CARTO".to_string(),
            ),
            "openstreetmap" => (
                "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                "&copy; OpenStreetMap contributors".to_string(),
            ),
            _ => (self.tiles.clone(), String::new()),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn with_input(stations_csv: PathBuf, boundaries: PathBuf) -> Self {
        Self {
            input: InputConfig {
                stations_csv,
                boundaries,
                district_column: default_district_column(),
            },
            map: MapConfig::default(),
            output: OutputConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
