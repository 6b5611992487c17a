use crate::render::{HexColor, Palette};
use crate::session::DEFAULT_SESSION_TTL;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub prepare: PrepareConfig,
    pub server: ServerConfig,
    pub palette: PaletteConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub boundaries: Option<PathBuf>, // .geojson, .zip or .shp
    pub boundaries_entry: String,    // file inside the zip archive
    pub name_column: String,
    pub simplify_tolerance: Option<f64>,
    pub pois: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            boundaries: None,
            boundaries_entry: "geoBoundaries-CAN-ADM1_simplified.geojson".to_string(),
            name_column: "shapeName".to_string(),
            simplify_tolerance: None,
            pois: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PrepareConfig {
    pub candidates: PathBuf,
    pub name_property: String,
    pub output: PathBuf,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            candidates: PathBuf::from("hotosm_can_points_of_interest_points_geojson.geojson"),
            name_property: "name".to_string(),
            output: PathBuf::from("pois.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: None,
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaletteConfig {
    pub highlighted: String,
    pub default: String,
    pub region_selected: String,
    pub region_unselected: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            highlighted: "#33cc33".to_string(),
            default: "#ff3333".to_string(),
            region_selected: "#3366cc".to_string(),
            region_unselected: "#cccccc".to_string(),
        }
    }
}

impl PaletteConfig {
    pub fn to_palette(&self) -> Result<Palette> {
        Ok(Palette {
            highlighted: HexColor::parse(&self.highlighted).context("palette.highlighted")?,
            default: HexColor::parse(&self.default).context("palette.default")?,
            region_selected: HexColor::parse(&self.region_selected)
                .context("palette.region_selected")?,
            region_unselected: HexColor::parse(&self.region_unselected)
                .context("palette.region_unselected")?,
        })
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Falls back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.palette.to_palette()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }
        Ok(())
    }
}
