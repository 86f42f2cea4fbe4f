//! Configuration management for lnstore
//!
//! Provides map-size presets for different hardware classes and builder
//! setters for custom configurations. The same growth increment is used by
//! every write path when LMDB reports the map as full.

use crate::error::{StoreError, StoreResult};

/// Smallest map size or increment accepted. Also the rounding granule for
/// map sizes, which keeps them a multiple of every common OS page size.
pub const MAP_GRANULE: usize = 64 * 1024;

/// lnstore configuration with map-size presets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Map size requested when an environment is first opened (bytes)
    pub initial_map_size: usize,
    /// Bytes added on top of current usage each time the map fills
    pub growth_increment: usize,
    /// Maximum number of named tables in one environment
    pub max_tables: u32,
    /// Maximum number of concurrent read transactions
    pub max_readers: u32,
}

impl StoreConfig {
    /// Server-class: large initial map, large steps
    pub fn server() -> Self {
        Self {
            initial_map_size: 1024 * 1024 * 1024,
            growth_increment: 100 * 1024 * 1024,
            max_tables: 256,
            max_readers: 512,
        }
    }

    /// Desktop-class: moderate map, moderate steps
    pub fn desktop() -> Self {
        Self {
            initial_map_size: 256 * 1024 * 1024,
            growth_increment: 32 * 1024 * 1024,
            max_tables: 256,
            max_readers: 126,
        }
    }

    /// Minimal: small map that grows in small steps
    pub fn minimal() -> Self {
        Self {
            initial_map_size: 8 * 1024 * 1024,
            growth_increment: 4 * 1024 * 1024,
            max_tables: 64,
            max_readers: 32,
        }
    }

    pub fn with_initial_map_size(mut self, bytes: usize) -> Self {
        self.initial_map_size = bytes;
        self
    }

    pub fn with_growth_increment(mut self, bytes: usize) -> Self {
        self.growth_increment = bytes;
        self
    }

    pub fn with_max_tables(mut self, tables: u32) -> Self {
        self.max_tables = tables;
        self
    }

    pub fn with_max_readers(mut self, readers: u32) -> Self {
        self.max_readers = readers;
        self
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> StoreResult<()> {
        if self.initial_map_size < MAP_GRANULE {
            return Err(StoreError::validation("initial_map_size must be >= 64KB"));
        }
        if self.growth_increment < MAP_GRANULE {
            return Err(StoreError::validation("growth_increment must be >= 64KB"));
        }
        if self.max_tables == 0 || self.max_tables > 4096 {
            return Err(StoreError::validation("max_tables must be in [1, 4096]"));
        }
        if self.max_readers == 0 {
            return Err(StoreError::validation("max_readers must be > 0"));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::server()
    }
}

/// Round `bytes` up to the next multiple of [`MAP_GRANULE`].
pub(crate) fn round_to_granule(bytes: usize) -> usize {
    bytes.div_ceil(MAP_GRANULE).saturating_mul(MAP_GRANULE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_valid() {
        assert!(StoreConfig::server().validate().is_ok());
        assert!(StoreConfig::desktop().validate().is_ok());
        assert!(StoreConfig::minimal().validate().is_ok());
    }

    #[test]
    fn test_tier_ordering() {
        let s = StoreConfig::server();
        let d = StoreConfig::desktop();
        let m = StoreConfig::minimal();
        assert!(s.initial_map_size > d.initial_map_size);
        assert!(d.initial_map_size > m.initial_map_size);
        assert!(s.growth_increment > m.growth_increment);
    }

    #[test]
    fn test_rejects_tiny_sizes() {
        let err = StoreConfig::minimal().with_growth_increment(1024).validate().unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(StoreConfig::minimal().with_initial_map_size(0).validate().is_err());
        assert!(StoreConfig::minimal().with_max_tables(0).validate().is_err());
        assert!(StoreConfig::minimal().with_max_readers(0).validate().is_err());
    }

    #[test]
    fn test_round_to_granule() {
        assert_eq!(round_to_granule(0), 0);
        assert_eq!(round_to_granule(1), MAP_GRANULE);
        assert_eq!(round_to_granule(MAP_GRANULE), MAP_GRANULE);
        assert_eq!(round_to_granule(MAP_GRANULE + 1), 2 * MAP_GRANULE);
    }
}
