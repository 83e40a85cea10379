//! Daemon configuration.
//!
//! Values come from CLI flags with environment fallbacks (see the
//! `dropcastd` binary); this module only holds the parsed result.

use std::path::PathBuf;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Default watched directory, relative to the working directory
pub const DEFAULT_WATCH_FOLDER: &str = "./watched";

/// Origins allowed by the CORS policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsOrigin {
    /// Any origin (`*`)
    #[default]
    Any,
    /// An explicit allow-list
    List(Vec<String>),
}

impl CorsOrigin {
    /// Parses `*` or a comma-separated list of origins.
    ///
    /// An empty value is treated as `*`.
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

/// CORS policy applied to every route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsConfig {
    pub origin: CorsOrigin,
    pub credentials: bool,
}

impl CorsConfig {
    pub fn new(origin: &str, credentials: bool) -> Self {
        Self {
            origin: CorsOrigin::parse(origin),
            credentials,
        }
    }
}

/// Configuration for the HTTP server and watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port for the HTTP server
    pub port: u16,

    /// Directory to watch for new files (None disables the watcher)
    pub watch_folder: Option<PathBuf>,

    /// CORS policy
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            watch_folder: Some(PathBuf::from(DEFAULT_WATCH_FOLDER)),
            cors: CorsConfig::default(),
        }
    }
}
