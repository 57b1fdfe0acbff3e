use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the generated site, relative to the host application root.
pub const DEFAULT_OUTPUT_DIR: &str = "doc/api";

/// Header and link color when the configured one cannot be used.
pub const DEFAULT_THEME_COLOR: &str = "#3B82F6";

/// Read-only settings of one generation run.
///
/// Every field is optional in the YAML file; missing ones take the defaults
/// of [`Configuration::default`].
///
/// ```yaml
/// output_dir: doc/reference
/// app_name: Storefront
/// theme_color: "#0F766E"
/// include_timestamps: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Root directory of the generated site
    pub output_dir: PathBuf,
    /// Shown in the header of every page
    pub app_name: String,
    /// CSS color used for the header and links
    pub theme_color: String,
    /// Show `created_at`/`updated_at` rows on model pages
    pub include_timestamps: bool,
    pub include_validations: bool,
    pub include_scopes: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            app_name: "Rails Application".to_string(),
            theme_color: DEFAULT_THEME_COLOR.to_string(),
            include_timestamps: true,
            include_validations: true,
            include_scopes: true,
        }
    }
}

impl Configuration {
    /// Defaults for a host application rooted at `app_root`.
    pub fn for_app_root(app_root: &Path) -> Self {
        Self {
            output_dir: app_root.join(DEFAULT_OUTPUT_DIR),
            ..Self::default()
        }
    }

    /// Loads a YAML configuration file.
    ///
    /// A relative `output_dir` is resolved against `app_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn load(path: &Path, app_root: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let mut config: Configuration = if content.trim().is_empty() {
            Configuration::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid configuration file: {}", path.display()))?
        };

        if config.output_dir.is_relative() {
            config.output_dir = app_root.join(&config.output_dir);
        }
        Ok(config)
    }
}
