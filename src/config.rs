use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{LoaderError, LoaderResult};

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub selectors: SelectorConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectorConfig {
    pub item: String,
    pub container: String,
    pub next: String,
    /// Pagination block hidden while the loader is active. `None` leaves the
    /// page's own pagination untouched.
    pub pagination: Option<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: ".item".to_string(),
            container: ".listing".to_string(),
            next: ".next".to_string(),
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub min_render_delay_ms: u64,
    pub scroll_throttle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_render_delay_ms: 600,
            scroll_throttle_ms: 150,
        }
    }
}

impl TimingConfig {
    pub fn min_render_delay(&self) -> Duration {
        Duration::from_millis(self.min_render_delay_ms)
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }
}

impl Config {
    pub fn load() -> LoaderResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> LoaderResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(LoaderError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            LoaderError::io_with_context(
                source,
                format!("failed to read config: {}", path.display()),
            )
        })?;
        Self::from_toml_str(&raw).map_err(|err| match err {
            LoaderError::InvalidArgument(message) => LoaderError::invalid_argument(format!(
                "failed to parse config {}: {message}",
                path.display()
            )),
            other => other,
        })
    }

    pub fn from_toml_str(raw: &str) -> LoaderResult<Self> {
        let parsed = toml::from_str::<Self>(raw)
            .map_err(|source| LoaderError::invalid_argument(source.to_string()))?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        let defaults = SelectorConfig::default();
        if self.selectors.item.trim().is_empty() {
            self.selectors.item = defaults.item;
        }
        if self.selectors.container.trim().is_empty() {
            self.selectors.container = defaults.container;
        }
        if self.selectors.next.trim().is_empty() {
            self.selectors.next = defaults.next;
        }
        if self
            .selectors
            .pagination
            .as_deref()
            .is_some_and(|selector| selector.trim().is_empty())
        {
            self.selectors.pagination = None;
        }
        self.timing.scroll_throttle_ms = self.timing.scroll_throttle_ms.max(1);
        self
    }
}

/// Base directories searched in order, each with the subpath under it.
const CONFIG_DIRS: [(&str, &[&str]); 3] = [
    ("XDG_CONFIG_HOME", &["ias"]),
    ("HOME", &[".config", "ias"]),
    ("APPDATA", &["ias"]),
];

/// `IAS_CONFIG_PATH` if set, else `config.toml` under the first base
/// directory in [`CONFIG_DIRS`] whose variable is set. Empty values count as
/// unset.
pub fn default_config_path() -> Option<PathBuf> {
    config_path_from(|name| std::env::var_os(name))
}

fn config_path_from(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let lookup = |name: &str| var(name).filter(|value| !value.is_empty());
    if let Some(explicit) = lookup("IAS_CONFIG_PATH") {
        return Some(PathBuf::from(explicit));
    }
    CONFIG_DIRS.iter().find_map(|(name, subpath)| {
        let mut path = PathBuf::from(lookup(name)?);
        path.extend(subpath.iter().copied());
        path.push("config.toml");
        Some(path)
    })
}
