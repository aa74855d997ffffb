use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::GridError;
use crate::theme::{DEFAULT_COLUMN_WIDTH, MIN_COLUMN_WIDTH};

/// Row density preset. Each maps to one fixed row height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    #[default]
    Normal,
    Tall,
    Extra,
}

impl Density {
    pub fn row_height(self) -> f32 {
        match self {
            Self::Compact => 32.0,
            Self::Normal => 40.0,
            Self::Tall => 56.0,
            Self::Extra => 80.0,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "normal" => Some(Self::Normal),
            "tall" => Some(Self::Tall),
            "extra" => Some(Self::Extra),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub density: Density,

    /// Rows materialized beyond each edge of the viewport.
    pub overscan: usize,

    /// Pointer travel (px) before a handle press becomes a drag.
    pub activation_distance: f32,

    /// Horizontal pixels per nesting level in outline trees.
    pub indent_width: f32,

    pub default_column_width: f32,
    pub min_column_width: f32,

    /// Characters shown in a cell before truncation.
    pub max_display_len: usize,

    /// Show the drag-handle column.
    pub reorderable: bool,

    /// Show the selection checkbox column.
    pub selectable: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            density: Density::Normal,
            overscan: 5,
            activation_distance: 5.0,
            indent_width: 24.0,
            default_column_width: DEFAULT_COLUMN_WIDTH,
            min_column_width: MIN_COLUMN_WIDTH,
            max_display_len: 200,
            reorderable: true,
            selectable: true,
        }
    }
}

impl GridConfig {
    pub fn row_height(&self) -> f32 {
        self.density.row_height()
    }

    pub fn from_json(content: &str) -> Result<Self, GridError> {
        let config: GridConfig =
            serde_json::from_str(content).map_err(|e| GridError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GridError> {
        if self.activation_distance < 0.0 {
            return Err(GridError::InvalidConfig(
                "activation_distance must not be negative".to_string(),
            ));
        }
        if self.indent_width <= 0.0 {
            return Err(GridError::InvalidConfig(
                "indent_width must be positive".to_string(),
            ));
        }
        if self.min_column_width > self.default_column_width {
            return Err(GridError::InvalidConfig(
                "min_column_width exceeds default_column_width".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locates and reads the grid config file.
pub struct GridConfigStore {
    path: PathBuf,
}

impl GridConfigStore {
    /// Store at `<config_dir>/smartgrid/grid.json`.
    pub fn new() -> Result<Self, GridError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            GridError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        Ok(Self {
            path: config_dir.join("smartgrid").join("grid.json"),
        })
    }

    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads the config; a missing file yields the defaults.
    pub fn load(&self) -> Result<GridConfig, GridError> {
        if !self.path.exists() {
            log::debug!("No grid config at {:?}, using defaults", self.path);
            return Ok(GridConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        GridConfig::from_json(&content)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_heights() {
        let heights: Vec<f32> = [
            Density::Compact,
            Density::Normal,
            Density::Tall,
            Density::Extra,
        ]
        .into_iter()
        .map(Density::row_height)
        .collect();
        assert_eq!(heights, vec![32.0, 40.0, 56.0, 80.0]);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = GridConfig::from_json(r#"{"density": "tall", "overscan": 2}"#).unwrap();
        assert_eq!(config.density, Density::Tall);
        assert_eq!(config.overscan, 2);
        assert_eq!(config.activation_distance, 5.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = GridConfig::from_json(r#"{"indent_width": 0}"#).unwrap_err();
        assert!(matches!(err, GridError::InvalidConfig(_)));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = GridConfigStore::at(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), GridConfig::default());
    }

    #[test]
    fn file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        fs::write(&path, r#"{"density": "compact", "reorderable": false}"#).unwrap();

        let config = GridConfigStore::at(&path).load().unwrap();
        assert_eq!(config.row_height(), 32.0);
        assert!(!config.reorderable);
    }
}
