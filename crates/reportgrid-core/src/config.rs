//! Editor configuration.

use crate::error::{CanvasError, CanvasResult};
use crate::model::{DesignSettings, LayoutMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default canvas width in pixels.
pub const DEFAULT_BASE_WIDTH: f64 = 800.0;
/// Default number of grid columns per row.
pub const DEFAULT_NUMBER_OF_COLS: usize = 12;
/// Default row height in pixels.
pub const DEFAULT_ROW_HEIGHT: f64 = 78.0;
/// Default number of rows in a fresh design (placeholder row included).
pub const DEFAULT_NUMBER_OF_ROWS: usize = 7;
/// Delay before `is_resizing` is cleared after a resize ends.
pub const DEFAULT_RESIZE_SETTLE_DELAY_MS: u64 = 100;

/// Defaults applied when designs are created.
///
/// Every key is optional in the JSON form; missing keys keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub default_base_width: f64,
    pub default_number_of_cols: usize,
    pub default_row_height: f64,
    pub default_number_of_rows: usize,
    pub default_layout_mode: LayoutMode,
    pub resize_settle_delay_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_base_width: DEFAULT_BASE_WIDTH,
            default_number_of_cols: DEFAULT_NUMBER_OF_COLS,
            default_row_height: DEFAULT_ROW_HEIGHT,
            default_number_of_rows: DEFAULT_NUMBER_OF_ROWS,
            default_layout_mode: LayoutMode::Grid,
            resize_settle_delay_ms: DEFAULT_RESIZE_SETTLE_DELAY_MS,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CanvasError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json).map_err(|e| {
            CanvasError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Design settings derived from these defaults.
    pub fn design_settings(&self) -> DesignSettings {
        DesignSettings {
            base_width: self.default_base_width,
            number_of_cols: self.default_number_of_cols.max(1),
            row_height: self.default_row_height,
            default_number_of_rows: self.default_number_of_rows.max(1),
        }
    }

    pub fn resize_settle_delay(&self) -> Duration {
        Duration::from_millis(self.resize_settle_delay_ms)
    }
}
