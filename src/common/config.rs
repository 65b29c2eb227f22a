//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment < CLI
use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Destination value shipped in the documented sample config. Uploads are
/// refused until the user replaces it.
pub const PLACEHOLDER_DESTINATION: &str = "user@host:/path/";

const MAX_FLAG_LEN: usize = 512;

fn default_base_flags() -> Vec<String> {
    vec!["-avhP".into(), "--progress".into()]
}

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "marksync")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("marksync.toml"))
}

/// Everything the command builder needs to shape an rsync invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    /// Remote rsync target, e.g. `user@host:/srv/inbox/`.
    pub destination: String,
    /// Remote-shell leg, e.g. `["ssh", "-p", "2222"]`. Collapsed into one
    /// `-e` value.
    pub transport_args: Vec<String>,
    /// Flags every invocation starts from. A missing leading dash is added.
    pub base_flags: Vec<String>,
    /// Adds `--relative` so source paths keep their directory structure.
    pub preserve_relative_paths: bool,
    /// Appended after the inferred flags, verbatim.
    pub extra_flags: Vec<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            destination: PLACEHOLDER_DESTINATION.to_string(),
            transport_args: Vec::new(),
            base_flags: default_base_flags(),
            preserve_relative_paths: false,
            extra_flags: Vec::new(),
        }
    }
}

impl TransferConfig {
    /// A destination is usable once it is neither empty nor the documented
    /// placeholder.
    pub fn destination_is_set(&self) -> bool {
        !self.destination.trim().is_empty() && self.destination != PLACEHOLDER_DESTINATION
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TuiSettings {
    /// Show the transfer output pane while a session runs.
    pub show_output_pane: bool,
    /// Lines kept in the output pane scrollback.
    pub output_scrollback: usize,
}

impl Default for TuiSettings {
    fn default() -> Self {
        Self {
            show_output_pane: true,
            output_scrollback: 500,
        }
    }
}

/// Fully resolved application configuration after all layers merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub transfer: TransferConfig,
    pub install_default_keybindings: bool,
    pub tui: TuiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            install_default_keybindings: true,
            tui: TuiSettings::default(),
        }
    }
}

impl AppConfig {
    /// Rejects flag lists that could not have come from a sane setup.
    pub fn validate(&self) -> Result<()> {
        for (name, flags) in [
            ("base_flags", &self.transfer.base_flags),
            ("extra_flags", &self.transfer.extra_flags),
            ("transport_args", &self.transfer.transport_args),
        ] {
            for flag in flags {
                ensure!(
                    flag.len() <= MAX_FLAG_LEN,
                    "Invalid config: transfer.{name} entry exceeds {MAX_FLAG_LEN} bytes"
                );
                ensure!(
                    !flag.contains('\0'),
                    "Invalid config: transfer.{name} entry contains a null byte"
                );
            }
        }
        ensure!(
            self.tui.output_scrollback >= 1,
            "Invalid config: tui.output_scrollback must be >= 1"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Loads config from defaults/file/env. Unknown keys are rejected rather
/// than silently accepted.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path();

    // MARKSYNC_LOG drives the tracing filter, not the schema; without the
    // exclusion deny_unknown_fields would refuse to start whenever logging
    // is turned on.
    let config: AppConfig = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("MARKSYNC_").ignore(&["log"]).split("_"))
        .extract()
        .context("Failed to load configuration")?;

    config.validate()?;

    Ok(config)
}

/// Applies runtime overrides to a loaded config.
pub fn apply_overrides(mut config: AppConfig, overrides: &ConfigOverrides) -> AppConfig {
    if let Some(destination) = &overrides.destination {
        config.transfer.destination = destination.clone();
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_documented_placeholder() {
        let config = AppConfig::default();
        assert_eq!(config.transfer.destination, PLACEHOLDER_DESTINATION);
        assert!(!config.transfer.destination_is_set());
    }

    #[test]
    fn blank_destination_is_unset() {
        let mut transfer = TransferConfig::default();
        transfer.destination = "   ".into();
        assert!(!transfer.destination_is_set());
        transfer.destination = "user@host:/srv/".into();
        assert!(transfer.destination_is_set());
    }

    #[test]
    fn default_flags_request_archive_and_progress() {
        let transfer = TransferConfig::default();
        assert_eq!(transfer.base_flags, vec!["-avhP", "--progress"]);
        assert!(!transfer.preserve_relative_paths);
    }

    #[test]
    fn null_bytes_in_flags_fail_validation() {
        let mut config = AppConfig::default();
        config.transfer.extra_flags = vec!["--bwlimit=100\u{0}".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn destination_override_wins() {
        let overrides = ConfigOverrides {
            destination: Some("user@host:/srv/drop/".into()),
        };
        let config = apply_overrides(AppConfig::default(), &overrides);
        assert_eq!(config.transfer.destination, "user@host:/srv/drop/");
    }
}
