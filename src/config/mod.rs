//! Application configuration for `hardwire.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── caching    # [caching.fragments|static_routes|dynamic_routes]
//! │   ├── resources  # [resources.<key>]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # HardwireConfig (this file)
//! ```
//!
//! Every field is defaulted, so an empty file (or no file at all) is a valid
//! configuration.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{CachingConfig, CachingPolicy, ResourceFileConfig, ResourcesConfig, ServeConfig};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands},
    debug,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hardwire.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwireConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Directory holding compiled views, fragments and island metadata.
    pub views_dir: PathBuf,

    /// Keep the `.html` extension in page routes.
    pub keep_extension: bool,

    /// HTTP server settings
    pub serve: ServeConfig,

    /// Cache-Control policies
    pub caching: CachingConfig,

    /// File-backed resources registered by the binary
    pub resources: ResourcesConfig,
}

impl Default for HardwireConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            views_dir: PathBuf::from("views"),
            keep_extension: false,
            serve: ServeConfig::default(),
            caching: CachingConfig::default(),
            resources: ResourcesConfig::default(),
        }
    }
}

impl HardwireConfig {
    pub const VIEWS_DIR: FieldPath = FieldPath::new("views_dir");

    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; a missing file means
    /// defaults rooted at cwd.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self::default()
            }
        };

        config.root = config
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(cwd, Path::to_path_buf);
        config.apply_command_options(cli);
        config.normalize_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, _) = Self::parse_with_ignored(content)?;
        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            let mut diag = ConfigDiagnostics::new();
            for field in ignored {
                diag.warn(FieldPath::owned(field), "unknown field");
            }
            diag.print_warnings();
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Join a path onto the project root.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose());

        if let Some(views) = &cli.views {
            self.views_dir = views.clone();
        }

        if let Commands::Serve {
            interface,
            port,
            threads,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.threads, threads.as_ref());
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(value) = cli_option {
            *config_option = value.clone();
        }
    }

    fn normalize_paths(&mut self) {
        self.views_dir = self.root_join(&self.views_dir);
        for resource in self.resources.values_mut() {
            resource.file = self.root.join(&resource.file);
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate field values; problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if !self.views_dir.is_dir() {
            diag.error_with_hint(
                Self::VIEWS_DIR,
                format!("views directory `{}` does not exist", self.views_dir.display()),
                "build the views first or pass --views <dir>",
            );
        }
        self.serve.validate(&mut diag);
        for (key, resource) in &self.resources {
            if !resource.file.is_file() {
                diag.error(
                    FieldPath::owned(format!("resources.{key}.file")),
                    format!("`{}` is not a file", resource.file.display()),
                );
            }
        }

        diag.into_result()
    }
}

/// Parse a test configuration, panicking on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> HardwireConfig {
    let (parsed, ignored) = HardwireConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(HardwireConfig::from_str("views_dir = ").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.views_dir, PathBuf::from("views"));
        assert!(!config.keep_extension);
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let (_, ignored) =
            HardwireConfig::parse_with_ignored("views_dir = \"out\"\nstatic_dir = \"s\"\n[serve]\nwatch = true").unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.iter().any(|f| f == "static_dir"));
        assert!(ignored.iter().any(|f| f == "serve.watch"));
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("[serve]\nport = 0\n[resources.todos]\nfile = \"missing.json\"");
        config.root = dir.path().to_path_buf();
        config.normalize_paths();

        match config.validate() {
            Err(ConfigError::Diagnostics(diag)) => {
                // views dir, port, missing resource file
                assert_eq!(diag.len(), 3);
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_ok() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("views")).unwrap();
        let mut config = test_parse_config("");
        config.root = dir.path().to_path_buf();
        config.normalize_paths();
        assert!(config.validate().is_ok());
    }
}
