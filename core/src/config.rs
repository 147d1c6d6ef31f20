use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;
use crate::error::UpdaterErr;

/// Fixed location of the run configuration. `$GENTUP_CONFIG` overrides it,
/// which is primarily useful for tests.
pub const CONFIG_PATH: &str = "/etc/gentup.toml";

pub fn find_config_path() -> PathBuf {
    match std::env::var("GENTUP_CONFIG") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(CONFIG_PATH),
    }
}

/// Immutable run configuration: resolved once per invocation from defaults,
/// the config file and CLI overrides, in that precedence order, and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Skip the initial portage tree sync.
    pub skip_sync: bool,

    /// Sync with `emerge-webrsync` (snapshot over HTTP) instead of rsync.
    pub webrsync_only: bool,

    /// Skip syncing layman-managed overlays.
    pub skip_overlay_sync: bool,

    /// Skip cleaning outdated distfiles.
    pub skip_distfile_clean: bool,

    /// Skip upgrading portage itself before the world upgrade.
    pub skip_portage_update: bool,

    /// Skip rebuilding Perl modules after the upgrade.
    pub skip_perl_rebuild: bool,

    /// Build and install a new kernel after the world upgrade.
    pub build_kernel: bool,

    /// Seed the kernel build with the running kernel's configuration.
    pub use_running_kernel_config: bool,

    /// Offer to reboot once the pipeline completes.
    pub reboot_after: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_sync: false,
            webrsync_only: false,
            skip_overlay_sync: false,
            skip_distfile_clean: false,
            skip_portage_update: false,
            skip_perl_rebuild: false,
            build_kernel: false,
            use_running_kernel_config: true,
            reboot_after: false,
        }
    }
}

/// Raw key/value assignments from the config file. Every field is optional so
/// a partial file only overrides what it names; unknown keys are ignored for
/// forward compatibility.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigToml {
    pub skip_sync: Option<bool>,
    pub webrsync_only: Option<bool>,
    pub skip_overlay_sync: Option<bool>,
    pub skip_distfile_clean: Option<bool>,
    pub skip_portage_update: Option<bool>,
    pub skip_perl_rebuild: Option<bool>,
    pub build_kernel: Option<bool>,
    pub use_running_kernel_config: Option<bool>,
    pub reboot_after: Option<bool>,
}

/// Strongly-typed overrides from the CLI. `None` leaves the file/default
/// value untouched, so re-running with the same argument vector reproduces
/// the same `Config`.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub skip_sync: Option<bool>,
    pub webrsync_only: Option<bool>,
    pub skip_overlay_sync: Option<bool>,
    pub skip_portage_update: Option<bool>,
    pub build_kernel: Option<bool>,
}

impl Config {
    /// Load configuration from `path` with `overrides` applied on top.
    ///
    /// A missing file is not an error; the documented defaults apply. A file
    /// that exists but fails to parse is fatal, and nothing from it is
    /// applied partially.
    pub fn load(path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let file = load_config_toml(path)?;
        Ok(Self::merge(file, overrides))
    }

    fn merge(file: ConfigToml, overrides: ConfigOverrides) -> Self {
        let defaults = Self::default();
        Self {
            skip_sync: overrides
                .skip_sync
                .or(file.skip_sync)
                .unwrap_or(defaults.skip_sync),
            webrsync_only: overrides
                .webrsync_only
                .or(file.webrsync_only)
                .unwrap_or(defaults.webrsync_only),
            skip_overlay_sync: overrides
                .skip_overlay_sync
                .or(file.skip_overlay_sync)
                .unwrap_or(defaults.skip_overlay_sync),
            skip_distfile_clean: file
                .skip_distfile_clean
                .unwrap_or(defaults.skip_distfile_clean),
            skip_portage_update: overrides
                .skip_portage_update
                .or(file.skip_portage_update)
                .unwrap_or(defaults.skip_portage_update),
            skip_perl_rebuild: file.skip_perl_rebuild.unwrap_or(defaults.skip_perl_rebuild),
            build_kernel: overrides
                .build_kernel
                .or(file.build_kernel)
                .unwrap_or(defaults.build_kernel),
            use_running_kernel_config: file
                .use_running_kernel_config
                .unwrap_or(defaults.use_running_kernel_config),
            reboot_after: file.reboot_after.unwrap_or(defaults.reboot_after),
        }
    }
}

/// Read `path` and return its raw assignments. Returns an empty set when the
/// file does not exist.
fn load_config_toml(path: &Path) -> Result<ConfigToml> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<ConfigToml>(&contents).map_err(|e| {
            tracing::error!("failed to parse {}: {e}", path.display());
            UpdaterErr::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("{} not found, using defaults", path.display());
            Ok(ConfigToml::default())
        }
        Err(e) => {
            tracing::error!("failed to read {}: {e}", path.display());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_documented_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(
            &dir.path().join("gentup.toml"),
            ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(
            config,
            Config {
                skip_sync: false,
                webrsync_only: false,
                skip_overlay_sync: false,
                skip_distfile_clean: false,
                skip_portage_update: false,
                skip_perl_rebuild: false,
                build_kernel: false,
                use_running_kernel_config: true,
                reboot_after: false,
            }
        );
    }

    #[test]
    fn file_assignments_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gentup.toml");
        std::fs::write(&path, "skip_sync = true\nreboot_after = true\n").unwrap();

        let config = Config::load(&path, ConfigOverrides::default()).unwrap();
        assert!(config.skip_sync);
        assert!(config.reboot_after);
        // Untouched fields keep their defaults.
        assert!(!config.webrsync_only);
        assert!(config.use_running_kernel_config);
    }

    #[test]
    fn cli_overrides_take_precedence_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gentup.toml");
        std::fs::write(&path, "skip_sync = false\n").unwrap();

        let overrides = ConfigOverrides {
            skip_sync: Some(true),
            ..Default::default()
        };
        let config = Config::load(&path, overrides).unwrap();
        assert!(config.skip_sync);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gentup.toml");
        std::fs::write(&path, "some_future_option = true\nskip_sync = true\n").unwrap();

        let config = Config::load(&path, ConfigOverrides::default()).unwrap();
        assert!(config.skip_sync);
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gentup.toml");
        std::fs::write(&path, "skip_sync = maybe\n").unwrap();

        let err = Config::load(&path, ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, UpdaterErr::Config { .. }));
    }

    #[test]
    fn non_boolean_value_applies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gentup.toml");
        std::fs::write(&path, "skip_sync = true\nreboot_after = \"yes\"\n").unwrap();

        // The load fails atomically; the valid assignment above the bad one
        // is not applied either.
        assert!(Config::load(&path, ConfigOverrides::default()).is_err());
    }
}
