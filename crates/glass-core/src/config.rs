// ABOUTME: Application configuration handling.
// ABOUTME: Loads and saves optics, backdrop, window and demo region settings from TOML.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{IntensityTier, OpticalParameters, Rect};

/// Where the refracted scene comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackdropConfig {
    /// Static image, decoded once in the background
    Image { path: PathBuf },
    /// Host scene captured every frame
    Live,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        BackdropConfig::Live
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            title: "liquid-glass".to_string(),
        }
    }
}

/// A region the demo host registers at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionPreset {
    pub rect: Rect,
    pub roundness: f32,
    pub tier: IntensityTier,
    pub enabled: bool,
}

impl Default for RegionPreset {
    fn default() -> Self {
        Self {
            rect: Rect::new(100.0, 100.0, 200.0, 150.0),
            roundness: 0.8,
            tier: IntensityTier::Normal,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global optical parameters
    pub optics: OpticalParameters,

    /// Backdrop source
    pub backdrop: BackdropConfig,

    /// Window dimensions and title
    pub window: WindowSettings,

    /// Regions registered at startup
    pub regions: Vec<RegionPreset>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optics: OpticalParameters::default(),
            backdrop: BackdropConfig::default(),
            window: WindowSettings::default(),
            regions: vec![
                RegionPreset::default(),
                RegionPreset {
                    rect: Rect::new(420.0, 180.0, 320.0, 220.0),
                    roundness: 0.6,
                    tier: IntensityTier::Heavy,
                    enabled: true,
                },
                RegionPreset {
                    rect: Rect::new(160.0, 420.0, 480.0, 120.0),
                    roundness: 1.0,
                    tier: IntensityTier::Light,
                    enabled: true,
                },
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

impl Config {
    /// Get the default config file path (~/.config/liquid-glass/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("liquid-glass").join("config.toml"))
    }

    /// Load config from a path. Optics are sanitized on the way in.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.optics = config.optics.sanitized();
        Ok(config)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to default path
    pub fn save_to_default(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.optics = OpticalParameters::frosted();
        config.backdrop = BackdropConfig::Image {
            path: PathBuf::from("/tmp/wallpaper.png"),
        };
        config.regions.truncate(1);

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.optics, OpticalParameters::frosted());
        assert_eq!(loaded.backdrop, config.backdrop);
        assert_eq!(loaded.regions, config.regions);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let content = r#"
            [optics]
            refraction_index = 1.4
            dispersion = 7.0

            [backdrop]
            kind = "live"
        "#;
        let config: Config = toml::from_str(content).unwrap();

        assert_eq!(config.optics.refraction_index, 1.4);
        assert_eq!(config.optics.dispersion, 7.0);
        assert_eq!(config.optics.blur_radius, OpticalParameters::default().blur_radius);
        assert_eq!(config.window.width, 1200);
        assert_eq!(config.regions.len(), 3);
    }

    #[test]
    fn load_sanitizes_optics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[optics]\nrefraction_index = 9.0\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.optics.refraction_index, 3.0);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load(std::path::Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
