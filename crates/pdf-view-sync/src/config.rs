use pdf_bridge::ViewMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::state::{DEFAULT_THEME, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use crate::{Result, ViewError};

/// Viewer behaviour that is fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Zoom used on startup, after `reset-zoom` and after each document load
    pub default_zoom: u32,
    /// Increment applied by `zoom-in` / `zoom-out`
    pub zoom_step: u32,
    pub default_view_mode: ViewMode,
    pub default_theme: String,
    /// Color given to annotations when the invocation doesn't name one
    pub annotation_color: String,
    /// Send a `ToolInvoked` to the host after applying a local tool
    pub echo_local_tools: bool,
    /// How long a delegated call may stay unanswered. `None` waits forever.
    pub delegate_timeout_ms: Option<u64>,
    pub annotations_enabled: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_zoom: DEFAULT_ZOOM,
            zoom_step: ZOOM_STEP,
            default_view_mode: ViewMode::Single,
            default_theme: DEFAULT_THEME.to_string(),
            annotation_color: "#ffff00".to_string(),
            echo_local_tools: true,
            delegate_timeout_ms: None,
            annotations_enabled: true,
        }
    }
}

impl ViewerConfig {
    /// Load config from JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ViewError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ViewError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.default_zoom) {
            return Err(ViewError::Config(format!(
                "Default zoom {} is outside {}..={}",
                self.default_zoom, MIN_ZOOM, MAX_ZOOM
            )));
        }

        if self.zoom_step == 0 {
            return Err(ViewError::Config("Zoom step must be positive".to_string()));
        }

        if self.delegate_timeout_ms == Some(0) {
            return Err(ViewError::Config(
                "Delegate timeout must be positive (omit it to wait forever)".to_string(),
            ));
        }

        Ok(())
    }

    /// A zero timeout is treated as no timeout
    pub fn delegate_timeout(&self) -> Option<Duration> {
        self.delegate_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
