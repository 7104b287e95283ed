//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments
//!
//! The `[[displays]]` and `[[events]]` sections describe an in-memory platform and a
//! script of changes to replay against it; a real embedding only needs
//! `[controller]`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub mod types;

pub use types::{ControllerConfig, DisplayConfig, LoggingConfig, ScriptedEvent};

use crate::bounds::{Insets, Rotation};
use crate::display::NavigationMode;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Displays of the in-memory platform
    #[serde(default)]
    pub displays: Vec<DisplayConfig>,
    /// Changes replayed after startup
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration: one portrait phone panel, no scripted events
    pub fn default_config() -> Result<Self> {
        Ok(Config {
            controller: ControllerConfig::default(),
            logging: LoggingConfig::default(),
            displays: vec![DisplayConfig {
                id: 0,
                unique_id: "local:4619827259835644672".to_string(),
                width: 1080,
                height: 2400,
                rotation: Rotation::R0,
                insets: Insets::new(0, 118, 0, 63),
                cutout: Insets::new(0, 96, 0, 0),
                density_dpi: 440,
                font_scale: 1.0,
                navigation_mode: NavigationMode::Gesture,
                night_mode: false,
                desktop_first_mode: false,
                desktop_taskbar: false,
                taskbar_pinned: false,
                locked_taskbar_on_home: false,
                home_visible: true,
                internal: true,
            }],
            events: Vec::new(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.controller.max_displays == 0 {
            anyhow::bail!("max_displays must be at least 1");
        }
        if self.controller.executor_thread_name.trim().is_empty() {
            anyhow::bail!("executor_thread_name must not be empty");
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }
        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        let mut ids = BTreeSet::new();
        for display in &self.displays {
            validate_display(display)?;
            if !ids.insert(display.id) {
                anyhow::bail!("Duplicate display id: {}", display.id);
            }
        }

        for (index, event) in self.events.iter().enumerate() {
            match event {
                ScriptedEvent::Connect(display) => {
                    validate_display(display).with_context(|| format!("Event #{}", index))?;
                    ids.insert(display.id);
                }
                ScriptedEvent::Density { dpi: 0, .. } => {
                    anyhow::bail!("Event #{}: density must be positive", index)
                }
                ScriptedEvent::FontScale { scale, .. } if !(*scale > 0.0) => {
                    anyhow::bail!("Event #{}: font scale must be positive", index)
                }
                _ => {}
            }
            if let Some(display) = event.display() {
                if !ids.contains(&display.0) {
                    anyhow::bail!("Event #{} targets unknown {}", index, display);
                }
            }
        }

        Ok(())
    }

    /// Override config with CLI arguments
    ///
    /// Each `-v` raises the log level one step (debug, then trace).
    pub fn with_overrides(
        mut self,
        verbose: u8,
        log_format: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Self {
        match verbose {
            0 => {}
            1 => self.logging.level = "debug".to_string(),
            _ => self.logging.level = "trace".to_string(),
        }
        if let Some(format) = log_format {
            self.logging.format = format;
        }
        if log_file.is_some() {
            self.logging.file = log_file;
        }
        self
    }
}

fn validate_display(display: &DisplayConfig) -> Result<()> {
    if display.unique_id.is_empty() {
        anyhow::bail!("Display {} has an empty unique_id", display.id);
    }
    if display.density_dpi == 0 {
        anyhow::bail!("Display {} has zero density", display.id);
    }
    if !(display.font_scale > 0.0) {
        anyhow::bail!(
            "Display {} has invalid font scale {}",
            display.id,
            display.font_scale
        );
    }
    Ok(())
}
