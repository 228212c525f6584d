//! Client configuration.

use serde::{Deserialize, Serialize};

/// Default byte threshold under which coordinate variables are preloaded.
pub const DEFAULT_COORD_PRELOAD_SIZE: usize = 50_000;

/// Switches that change how a dataset is mapped and read.
///
/// Passed explicitly to [`crate::DodsDataset::open`]; nothing in the client
/// reads global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DodsConfig {
    /// Relocate slash-named entities and attributes into nested groups, and
    /// promote scalar top-level structures to groups.
    pub use_groups: bool,

    /// Fetch small coordinate variables, strings and URL-constrained
    /// variables at open time.
    pub preload: bool,

    /// Byte size under which a coordinate variable is preloaded.
    pub coord_preload_size: usize,

    /// Also merge single-character strings of plain String arrays along
    /// their last axis. Char variables are always merged.
    pub collapse_single_char_strings: bool,
}

impl Default for DodsConfig {
    fn default() -> Self {
        Self {
            use_groups: false,
            preload: true,
            coord_preload_size: DEFAULT_COORD_PRELOAD_SIZE,
            collapse_single_char_strings: false,
        }
    }
}

impl DodsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DODS_USE_GROUPS") {
            config.use_groups = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("DODS_PRELOAD") {
            config.preload = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("DODS_COORD_PRELOAD_SIZE") {
            if let Ok(size) = val.parse() {
                config.coord_preload_size = size;
            }
        }

        if let Ok(val) = std::env::var("DODS_COLLAPSE_SINGLE_CHAR_STRINGS") {
            config.collapse_single_char_strings = parse_flag(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.preload && self.coord_preload_size == 0 {
            return Err("coord_preload_size must be > 0 when preload is enabled".to_string());
        }

        Ok(())
    }

    pub fn with_groups(mut self, enabled: bool) -> Self {
        self.use_groups = enabled;
        self
    }

    pub fn with_preload(mut self, enabled: bool) -> Self {
        self.preload = enabled;
        self
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DodsConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.use_groups);
        assert_eq!(config.coord_preload_size, 50_000);
    }

    #[test]
    fn test_zero_threshold_rejected_only_with_preload() {
        let mut config = DodsConfig {
            coord_preload_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.preload = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: DodsConfig = serde_json::from_str(r#"{"use_groups": true}"#).unwrap();
        assert!(config.use_groups);
        assert!(config.preload);
        assert_eq!(config.coord_preload_size, DEFAULT_COORD_PRELOAD_SIZE);
    }

    #[test]
    fn test_from_env_overrides() {
        // The only test touching DODS_* variables
        let vars = [
            ("DODS_USE_GROUPS", "true"),
            ("DODS_PRELOAD", "0"),
            ("DODS_COORD_PRELOAD_SIZE", "1234"),
            ("DODS_COLLAPSE_SINGLE_CHAR_STRINGS", "1"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let config = DodsConfig::from_env();

        std::env::set_var("DODS_COORD_PRELOAD_SIZE", "lots");
        let unparsable = DodsConfig::from_env();

        for (key, _) in vars {
            std::env::remove_var(key);
        }
        let defaults = DodsConfig::from_env();

        assert!(config.use_groups);
        assert!(!config.preload);
        assert_eq!(config.coord_preload_size, 1234);
        assert!(config.collapse_single_char_strings);
        assert_eq!(unparsable.coord_preload_size, DEFAULT_COORD_PRELOAD_SIZE);
        assert_eq!(defaults, DodsConfig::default());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("yes"));
    }
}
