//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use sd_core::STANDARD_NAME;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Conversion target when `--to` is omitted. Default: "Standard".
    pub default_format: String,

    /// Overrides the activity log's day length before segmenting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_day_length_ms: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_format: STANDARD_NAME.to_string(),
            maximum_day_length_ms: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // SD_DEFAULT_FORMAT, SD_MAXIMUM_DAY_LENGTH_MS
        figment = figment.merge(Env::prefixed("SD_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory.
///
/// On Linux: `~/.config/sleep-diary`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sleep-diary"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_config_path_ends_with_app_name() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "sleep-diary");
    }

    #[test]
    fn test_default_config_targets_standard() {
        let config = Config::default();
        assert_eq!(config.default_format, "Standard");
        assert_eq!(config.maximum_day_length_ms, None);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sdc.toml");
        std::fs::write(
            &path,
            "default_format = \"SpreadsheetTable\"\nmaximum_day_length_ms = 86400000\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();

        assert_eq!(config.default_format, "SpreadsheetTable");
        assert_eq!(config.maximum_day_length_ms, Some(86_400_000));
    }
}
