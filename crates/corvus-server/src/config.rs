//! Protocol configuration.
//!
//! This module provides configuration management for the call layer.

use std::path::Path;

use anyhow::Result;
use corvus_common::constants::{
    DEFAULT_MAX_INFLIGHT_CALLS, DEFAULT_PAGE_ROW_LIMIT, MAX_FRAME_SIZE,
};
use serde::{Deserialize, Serialize};

/// Call-layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum accepted frame size in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Maximum number of concurrently in-flight calls per connection.
    #[serde(default = "default_max_inflight_calls")]
    pub max_inflight_calls: usize,

    /// Number of rows the backend is asked to return per page.
    #[serde(default = "default_page_row_limit")]
    pub page_row_limit: usize,
}

fn default_max_frame_size() -> usize {
    MAX_FRAME_SIZE
}

fn default_max_inflight_calls() -> usize {
    DEFAULT_MAX_INFLIGHT_CALLS
}

fn default_page_row_limit() -> usize {
    DEFAULT_PAGE_ROW_LIMIT
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_frame_size: default_max_frame_size(),
            max_inflight_calls: default_max_inflight_calls(),
            page_row_limit: default_page_row_limit(),
        }
    }
}

impl ProtocolConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Creates a builder for configuration.
    pub fn builder() -> ProtocolConfigBuilder {
        ProtocolConfigBuilder::new()
    }
}

/// Builder for protocol configuration.
#[derive(Default)]
pub struct ProtocolConfigBuilder {
    config: ProtocolConfig,
}

impl ProtocolConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum frame size.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Sets the maximum in-flight call count.
    pub fn max_inflight_calls(mut self, max: usize) -> Self {
        self.config.max_inflight_calls = max;
        self
    }

    /// Sets the page row limit.
    pub fn page_row_limit(mut self, limit: usize) -> Self {
        self.config.page_row_limit = limit;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ProtocolConfig {
        self.config
    }
}
