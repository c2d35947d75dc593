//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `BOOKWYRM_*` environment variables (`__` separates nested keys, lists are
//! comma separated).
//!
//! ```toml
//! accuracy = 75
//! feed_capacity = 100
//! require_mirrors = false
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [sources]
//! disabled = ["libgen"]
//!
//! [libgen]
//! mirrors = ["https://libgen.is"]
//! results_per_page = 100
//! max_pages = 10
//!
//! [gscholar]
//! mirrors = ["https://scholar.google.com"]
//! max_pages = 3
//!
//! [resolver]
//! mirrors = ["https://sci-hub.se", "https://sci-hub.st"]
//! ```
//!
//! ```bash
//! BOOKWYRM_ACCURACY=90 BOOKWYRM_LIBGEN__MAX_PAGES=3 bookwyrm -t "Victory of Eagles"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matcher::DEFAULT_ACCURACY;

const ENV_PREFIX: &str = "BOOKWYRM";

/// Keys whose environment values are split on commas
const LIST_KEYS: &[&str] = &[
    "sources.enabled",
    "sources.disabled",
    "libgen.mirrors",
    "gscholar.mirrors",
    "resolver.mirrors",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Fuzzy match threshold out of 100
    #[serde(default = "default_accuracy")]
    pub accuracy: u32,

    /// Capacity of the bounded channel sources feed candidates into
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    /// Drop candidates that carry no mirror links
    #[serde(default)]
    pub require_mirrors: bool,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub libgen: LibgenConfig,

    #[serde(default)]
    pub gscholar: GscholarConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accuracy: default_accuracy(),
            feed_capacity: default_feed_capacity(),
            require_mirrors: false,
            http: HttpConfig::default(),
            sources: SourcesConfig::default(),
            libgen: LibgenConfig::default(),
            gscholar: GscholarConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

fn default_accuracy() -> u32 {
    DEFAULT_ACCURACY
}

fn default_feed_capacity() -> usize {
    100
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Which registered sources take part in a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Only these sources, when set
    #[serde(default)]
    pub enabled: Option<Vec<String>>,

    /// Never these sources; wins over `enabled`
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl SourcesConfig {
    pub fn is_enabled(&self, id: &str) -> bool {
        if self.disabled.iter().any(|d| d.eq_ignore_ascii_case(id)) {
            return false;
        }
        match &self.enabled {
            Some(enabled) => enabled.iter().any(|e| e.eq_ignore_ascii_case(id)),
            None => true,
        }
    }
}

/// Library Genesis adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibgenConfig {
    /// Mirror base URLs, tried in order
    #[serde(default = "default_libgen_mirrors")]
    pub mirrors: Vec<String>,

    /// Rows requested per Sci-Tech page (25, 50 or 100)
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,

    /// Upper bound on pages fetched per query
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for LibgenConfig {
    fn default() -> Self {
        Self {
            mirrors: default_libgen_mirrors(),
            results_per_page: default_results_per_page(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_libgen_mirrors() -> Vec<String> {
    vec![
        "https://libgen.is".to_string(),
        "https://libgen.rs".to_string(),
        "http://gen.lib.rus.ec".to_string(),
    ]
}

fn default_results_per_page() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    10
}

/// Google Scholar adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GscholarConfig {
    /// Base URLs, tried in order
    #[serde(default = "default_gscholar_mirrors")]
    pub mirrors: Vec<String>,

    /// Upper bound on result pages (ten results each) per query
    #[serde(default = "default_gscholar_max_pages")]
    pub max_pages: u32,
}

impl Default for GscholarConfig {
    fn default() -> Self {
        Self {
            mirrors: default_gscholar_mirrors(),
            max_pages: default_gscholar_max_pages(),
        }
    }
}

fn default_gscholar_mirrors() -> Vec<String> {
    vec!["https://scholar.google.com".to_string()]
}

fn default_gscholar_max_pages() -> u32 {
    3
}

/// Identifier resolver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolver mirror base URLs, tried in order
    #[serde(default = "default_resolver_mirrors")]
    pub mirrors: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mirrors: default_resolver_mirrors(),
        }
    }
}

fn default_resolver_mirrors() -> Vec<String> {
    vec![
        "https://sci-hub.se".to_string(),
        "https://sci-hub.st".to_string(),
        "https://sci-hub.ru".to_string(),
    ]
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Default configuration file location (`<config dir>/bookwyrm/config.toml`), if it exists
pub fn find_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("bookwyrm").join("config.toml");
    path.is_file().then_some(path)
}

fn environment() -> config::Environment {
    let environment = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    LIST_KEYS
        .iter()
        .fold(environment, |env, key| env.with_list_parse_key(key))
}

fn build(path: Option<&Path>, environment: config::Environment) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder.add_source(environment).build()?.try_deserialize()
}

/// Load configuration from an optional file plus the environment.
///
/// A missing explicit `path` is an error; without one, defaults and the
/// environment are used.
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    build(path, environment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> config::Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        environment().source(Some(map))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.accuracy, 75);
        assert_eq!(config.feed_capacity, 100);
        assert!(!config.require_mirrors);
        assert_eq!(config.libgen.max_pages, 10);
        assert_eq!(config.gscholar.max_pages, 3);
        assert!(!config.resolver.mirrors.is_empty());
    }

    #[test]
    fn test_load_without_file() {
        let config = build(None, env_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
accuracy = 90
require_mirrors = true

[sources]
disabled = ["libgen"]

[libgen]
mirrors = ["http://mirror.test"]
max_pages = 2
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = build(Some(&path), env_from(&[])).unwrap();
        assert_eq!(config.accuracy, 90);
        assert!(config.require_mirrors);
        assert!(!config.sources.is_enabled("libgen"));
        assert_eq!(config.libgen.mirrors, vec!["http://mirror.test"]);
        assert_eq!(config.libgen.max_pages, 2);
        assert_eq!(config.libgen.results_per_page, 100);
        assert_eq!(config.feed_capacity, 100);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "accuracy = 90\n").unwrap();

        let config = build(
            Some(&path),
            env_from(&[
                ("BOOKWYRM_ACCURACY", "60"),
                ("BOOKWYRM_LIBGEN__MAX_PAGES", "3"),
                ("BOOKWYRM_RESOLVER__MIRRORS", "http://a.test,http://b.test"),
                ("BOOKWYRM_GSCHOLAR__MIRRORS", "http://scholar.test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.accuracy, 60);
        assert_eq!(config.libgen.max_pages, 3);
        assert_eq!(config.resolver.mirrors, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.gscholar.mirrors, vec!["http://scholar.test"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = PathBuf::from("/nonexistent/bookwyrm.toml");
        assert!(build(Some(&path), env_from(&[])).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(build(Some(&path), env_from(&[])).is_err());
    }

    #[test]
    fn test_sources_filter() {
        let sources = SourcesConfig {
            enabled: Some(vec!["libgen".to_string(), "other".to_string()]),
            disabled: vec!["other".to_string()],
        };
        assert!(sources.is_enabled("libgen"));
        assert!(!sources.is_enabled("other"));
        assert!(!sources.is_enabled("unlisted"));
        assert!(SourcesConfig::default().is_enabled("anything"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
