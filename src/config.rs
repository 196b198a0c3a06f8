use crate::projection::ProjectionKind;
use crate::scale::BLUES_7;
use crate::topology::MeshFilter;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const COUNTIES_URL: &str = "https://raw.githubusercontent.com/no-stack-dub-sack/testable-projects-fcc/master/src/data/choropleth_map/counties.json";
pub const EDUCATION_URL: &str = "https://raw.githubusercontent.com/no-stack-dub-sack/testable-projects-fcc/master/src/data/choropleth_map/for_user_education.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub legend: LegendConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// http(s) URL or local path of the county topology.
    pub counties_url: String,
    /// http(s) URL or local path of the education statistics.
    pub education_url: String,
    pub counties_object: String,
    pub states_object: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            counties_url: COUNTIES_URL.to_string(),
            education_url: EDUCATION_URL.to_string(),
            counties_object: "counties".to_string(),
            states_object: "states".to_string(),
        }
    }
}

/// What to do with a county shape that has no education record.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingRecord {
    #[default]
    Skip,
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub description: String,
    pub projection: ProjectionKind,
    pub palette: Vec<String>, // Hex codes, lightest first
    pub borders: MeshFilter,
    pub missing_record: MissingRecord,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 950,
            height: 600,
            title: "United States Educational Attainment".to_string(),
            description: "Percentage of adults age 25 and older with at least a bachelor's degree (2010-2014)"
                .to_string(),
            projection: ProjectionKind::default(),
            palette: BLUES_7.iter().map(|c| c.to_string()).collect(),
            borders: MeshFilter::default(),
            missing_record: MissingRecord::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LegendConfig {
    pub width: f64,
    pub height: f64,
    /// Horizontal position as a fraction of the map width.
    pub offset_x_ratio: f64,
    pub offset_y: f64,
    pub tick_size: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 10.0,
            offset_x_ratio: 0.65,
            offset_y: 40.0,
            tick_size: 13.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub html: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::from("choropleth.html"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Loads `path` when it exists, otherwise the built-in configuration.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from_file(path);
        }
        tracing::info!(?path, "config file not found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.map.width == 0 || self.map.height == 0 {
            bail!("map size must be positive, got {}x{}", self.map.width, self.map.height);
        }
        if self.map.palette.len() < 2 {
            bail!("palette needs at least 2 colors, got {}", self.map.palette.len());
        }
        for (i, color) in self.map.palette.iter().enumerate() {
            if self.map.palette[..i].contains(color) {
                bail!("palette color {color:?} is listed more than once");
            }
        }
        if !self.legend.width.is_finite() || self.legend.width <= 0.0 {
            bail!("legend width must be positive, got {}", self.legend.width);
        }
        Ok(())
    }
}
