//! Engine configuration
//!
//! Page geometry and buffer budget used by statistics and cost estimation.
//! All cost formulas read these values, so two databases with the same
//! configuration and the same data always produce the same plans.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration text is not valid JSON for this structure
    #[error("Malformed engine configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A value is outside its allowed range
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Page size in bytes (default: 4096)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Bytes reserved at the head of every page (default: 16)
    #[serde(default = "default_page_header_bytes")]
    pub page_header_bytes: usize,

    /// Buffer pages available to a single join (default: 5)
    #[serde(default = "default_buffer_pages")]
    pub buffer_pages: usize,

    /// Fan-out of index inner nodes (default: 200)
    #[serde(default = "default_index_fanout")]
    pub index_fanout: u64,
}

fn default_page_size() -> usize {
    4096
}

fn default_page_header_bytes() -> usize {
    16
}

fn default_buffer_pages() -> usize {
    5
}

fn default_index_fanout() -> u64 {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_header_bytes: default_page_header_bytes(),
            buffer_pages: default_buffer_pages(),
            index_fanout: default_index_fanout(),
        }
    }
}

impl EngineConfig {
    /// Create a default config with the given buffer budget
    pub fn with_buffer_pages(buffer_pages: usize) -> Self {
        Self {
            buffer_pages,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable by the cost model
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_pages < 3 {
            return Err(ConfigError::Invalid(format!(
                "buffer_pages must be at least 3, got {}",
                self.buffer_pages
            )));
        }
        if self.page_size <= self.page_header_bytes {
            return Err(ConfigError::Invalid(format!(
                "page_size {} leaves no room after a {}-byte header",
                self.page_size, self.page_header_bytes
            )));
        }
        if self.index_fanout < 2 {
            return Err(ConfigError::Invalid(format!(
                "index_fanout must be at least 2, got {}",
                self.index_fanout
            )));
        }
        Ok(())
    }

    /// Number of fixed-width records that fit on one page.
    ///
    /// Each slot costs its record width plus one bit in the page's slot bitmap.
    pub fn records_per_page(&self, record_size: usize) -> usize {
        let usable_bits = self.page_size.saturating_sub(self.page_header_bytes).saturating_mul(8);
        (usable_bits / record_size.saturating_mul(8).saturating_add(1)).max(1)
    }

    /// Height of an index over `records` entries
    pub fn index_height(&self, records: u64) -> u64 {
        // a fan-out below 2 never grows
        let fanout = self.index_fanout.max(2);
        let mut height = 1;
        let mut capacity = fanout;
        while capacity < records {
            height += 1;
            capacity = capacity.saturating_mul(fanout);
        }
        height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.page_header_bytes, 16);
        assert_eq!(config.buffer_pages, 5);
        assert_eq!(config.index_fanout, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_records_per_page() {
        let config = EngineConfig::default();
        // bool + int + string(5) + float
        assert_eq!(config.records_per_page(14), 288);
        // a record wider than the page still occupies one slot
        assert_eq!(config.records_per_page(10_000), 1);
    }

    #[test]
    fn test_index_height() {
        let config = EngineConfig::default();
        assert_eq!(config.index_height(0), 1);
        assert_eq!(config.index_height(200), 1);
        assert_eq!(config.index_height(201), 2);
        assert_eq!(config.index_height(40_000), 2);
        assert_eq!(config.index_height(40_001), 3);
    }

    #[test]
    fn test_geometry_terminates_on_unchecked_values() {
        let config = EngineConfig {
            page_size: 8,
            page_header_bytes: 64,
            index_fanout: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.records_per_page(14), 1);
        // treated as fan-out 2
        assert_eq!(config.index_height(10), 4);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json_str(r#"{"buffer_pages": 12}"#).unwrap();
        assert_eq!(config.buffer_pages, 12);
        assert_eq!(config.page_size, 4096);
    }

    #[test]
    fn test_from_json_rejects_small_buffer() {
        let err = EngineConfig::from_json_str(r#"{"buffer_pages": 2}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_json_malformed() {
        let err = EngineConfig::from_json_str("{buffer_pages").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }
}
