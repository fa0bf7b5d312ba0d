//! Bridge configuration.
//!
//! Layering, later wins:
//! 1. Built-in defaults
//! 2. A TOML file: an explicit path, else `.livecoding/config.toml` in the
//!    current directory, else the per-user config directory
//! 3. `LIVECODING_*` environment variables
//!
//! Command line overrides are applied by the binary, which then calls
//! [`BridgeConfig::validate`] again.

use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{log_capture::DEFAULT_CATEGORY_MARKER, Error, Result};

pub const DEFAULT_PORT: u16 = 8133;
pub const DEFAULT_ROUTE: &str = "/api/livecoding/compile";
const STATUS_SUFFIX: &str = "/status";

/// Path-pattern syntax the router would interpret instead of matching literally
const ROUTE_PATTERN_CHARS: [char; 4] = [':', '*', '{', '}'];

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Trigger route; `POST` here starts a compile
    pub route: String,
    /// Status route; defaults to `<route>/status`
    pub status_route: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            route: DEFAULT_ROUTE.to_string(),
            status_route: None,
        }
    }
}

impl ServerConfig {
    /// Resolved status route
    #[must_use]
    pub fn status_route(&self) -> String {
        self.status_route
            .clone()
            .unwrap_or_else(|| format!("{}{STATUS_SUFFIX}", self.route))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Substring a log category must contain to be captured
    pub category_marker: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            category_marker: DEFAULT_CATEGORY_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Give up waiting after this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: vec!["build".to_string()],
            working_dir: None,
            timeout_secs: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration from defaults, file and environment
///
/// # Errors
///
/// Returns error if:
/// - An explicit config file cannot be read
/// - Config file is malformed TOML
/// - An environment override is malformed
/// - Config values fail validation
pub async fn load_config(explicit: Option<&Path>) -> Result<BridgeConfig> {
    let mut config = match explicit {
        Some(path) => load_toml_file(path).await?,
        None => match discovered_config_path() {
            Some(path) => load_toml_file(&path).await?,
            None => BridgeConfig::default(),
        },
    };

    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// First existing config file among project and user locations
fn discovered_config_path() -> Option<PathBuf> {
    let project = std::env::current_dir()
        .ok()
        .map(|dir| dir.join(".livecoding/config.toml"));
    let global = directories::ProjectDirs::from("", "", "livecoding-bridge")
        .map(|dirs| dirs.config_dir().join("config.toml"));

    [project, global].into_iter().flatten().find(|path| path.exists())
}

/// Load a TOML file; missing sections fall back to defaults
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - TOML is malformed
async fn load_toml_file(path: &Path) -> Result<BridgeConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::IoError(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    tracing::debug!(path = %path.display(), "Loaded config file");
    toml::from_str(&content)
        .map_err(|e| Error::ParseError(format!("Failed to parse config: {}: {e}", path.display())))
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("Invalid {name} value: {e}")))
}

fn normalize_route(name: &str, route: &str) -> Result<String> {
    let trimmed = route.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidConfig(format!("{name} cannot be empty")));
    }
    if let Some(bad) = trimmed.chars().find(|c| ROUTE_PATTERN_CHARS.contains(c)) {
        return Err(Error::InvalidConfig(format!(
            "{name} must be a literal path; '{bad}' is not allowed: {trimmed}"
        )));
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

impl BridgeConfig {
    /// Apply environment variable overrides
    ///
    /// # Errors
    ///
    /// Returns error if environment variable values are invalid
    pub fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("LIVECODING_BIND") {
            self.server.bind_address = parse_env("LIVECODING_BIND", &value)?;
        }

        if let Ok(value) = std::env::var("LIVECODING_PORT") {
            self.server.port = parse_env("LIVECODING_PORT", &value)?;
        }

        if let Ok(value) = std::env::var("LIVECODING_ROUTE") {
            self.server.route = value;
        }

        if let Ok(value) = std::env::var("LIVECODING_STATUS_ROUTE") {
            self.server.status_route = Some(value);
        }

        if let Ok(value) = std::env::var("LIVECODING_CATEGORY") {
            self.capture.category_marker = value;
        }

        if let Ok(value) = std::env::var("LIVECODING_ENGINE_PROGRAM") {
            self.engine.program = value;
        }

        Ok(())
    }

    /// Validate and normalize in place
    ///
    /// # Errors
    ///
    /// Returns error if the port is zero, a route is empty, or the capture
    /// marker or engine program is blank
    pub fn validate(&mut self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::InvalidConfig("port must be between 1 and 65535".into()));
        }

        self.server.route = normalize_route("route", &self.server.route)?;
        self.server.status_route = self
            .server
            .status_route
            .as_deref()
            .map(|route| normalize_route("status_route", route))
            .transpose()?;

        if self.server.status_route() == self.server.route {
            return Err(Error::InvalidConfig(
                "status_route must differ from route".into(),
            ));
        }

        if self.capture.category_marker.trim().is_empty() {
            return Err(Error::InvalidConfig("category_marker cannot be empty".into()));
        }

        if self.engine.program.trim().is_empty() {
            return Err(Error::InvalidConfig("engine program cannot be empty".into()));
        }

        Ok(())
    }
}
