//! Configuration file parser for `wiki-spots.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MediaWiki API endpoint.
    pub api_url: String,

    /// Sent as `User-Agent` on every request. Wikimedia asks for contact info here.
    pub user_agent: String,

    /// Categories the tree walk starts from, in prefixed form (`Category:X`).
    pub root_categories: Vec<String>,

    /// How many levels of subcategories to descend below each root. 0 = roots only.
    pub max_depth: usize,

    /// Directory holding the raw API response cache.
    pub cache_dir: PathBuf,

    /// Directory receiving `spots.json`, `spot_categories.json` and `images.json`.
    pub output_dir: PathBuf,

    /// Directory receiving downloaded image files.
    pub image_dir: PathBuf,

    /// Pause after every API request, in milliseconds.
    pub request_delay_ms: u64,

    /// Pause after every image download, in milliseconds.
    pub download_delay_ms: u64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Upper bound on any single response body, in bytes.
    pub max_response_bytes: usize,

    /// Page IDs per detail request, 1 to 20. `prop=extracts` serves at most 20 intros per call.
    pub pages_per_request: usize,

    /// File titles per `imageinfo` request, 1 to 50 (API limit for regular clients).
    pub images_per_request: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://ja.wikipedia.org/w/api.php".to_string(),
            user_agent: concat!(
                "wiki-spots/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/wiki-spots/wiki-spots)"
            )
            .to_string(),
            root_categories: vec!["Category:日本の観光地".to_string()],
            max_depth: 1,
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("json"),
            image_dir: PathBuf::from("img"),
            request_delay_ms: 1000,
            download_delay_ms: 5000,
            timeout_secs: 30,
            max_response_bytes: 50 * 1024 * 1024,
            pages_per_request: 20,
            images_per_request: 50,
        }
    }
}

/// The slice of [`Config`] the HTTP client needs.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub delay: Duration,
    pub max_response_bytes: usize,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// `prop=extracts` returns at most this many intros per request.
    const MAX_PAGES_PER_REQUEST: usize = 20;

    /// Title limit of one `action=query` for non-bot clients.
    const MAX_IMAGES_PER_REQUEST: usize = 50;

    const KNOWN_KEYS: [&'static str; 13] = [
        "api_url",
        "user_agent",
        "root_categories",
        "max_depth",
        "cache_dir",
        "output_dir",
        "image_dir",
        "request_delay_ms",
        "download_delay_ms",
        "timeout_secs",
        "max_response_bytes",
        "pages_per_request",
        "images_per_request",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Values that fail [`Config::validate`] → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            api_url = %config.api_url,
            roots = config.root_categories.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values that would make a run fail late or loop forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_categories.is_empty() {
            return Err(ConfigError::Invalid(
                "root_categories must name at least one category".to_string(),
            ));
        }
        if self.pages_per_request == 0 || self.images_per_request == 0 {
            return Err(ConfigError::Invalid(
                "pages_per_request and images_per_request must be positive".to_string(),
            ));
        }
        if self.pages_per_request > Self::MAX_PAGES_PER_REQUEST {
            return Err(ConfigError::Invalid(format!(
                "pages_per_request is {} (max {}: extracts serves no more intros per call)",
                self.pages_per_request,
                Self::MAX_PAGES_PER_REQUEST
            )));
        }
        if self.images_per_request > Self::MAX_IMAGES_PER_REQUEST {
            return Err(ConfigError::Invalid(format!(
                "images_per_request is {} (max {} titles per query)",
                self.images_per_request,
                Self::MAX_IMAGES_PER_REQUEST
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent must not be empty".to_string()));
        }
        if self.cache_dir == self.output_dir {
            return Err(ConfigError::Invalid(
                "cache_dir and output_dir must differ: both hold an images.json".to_string(),
            ));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| ConfigError::Invalid(format!("api_url '{}': {e}", self.api_url)))?;
        Ok(())
    }

    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            delay: Duration::from_millis(self.request_delay_ms),
            max_response_bytes: self.max_response_bytes,
        }
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("wiki-spots.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, "https://ja.wikipedia.org/w/api.php");
        assert_eq!(config.root_categories, vec!["Category:日本の観光地"]);
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.output_dir, PathBuf::from("json"));
        assert_eq!(config.image_dir, PathBuf::from("img"));
        assert_eq!(config.request_delay_ms, 1000);
        assert_eq!(config.download_delay_ms, 5000);
        assert_eq!(config.pages_per_request, 20);
        assert!(config.user_agent.starts_with("wiki-spots/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_depth, 1);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("json"));
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "max_depth = 3\nimage_dir = \"images\"\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.image_dir, PathBuf::from("images"));
        assert_eq!(config.request_delay_ms, 1000);
    }

    #[test]
    fn test_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let content = r#"
api_url = "https://en.wikipedia.org/w/api.php"
user_agent = "spots-test/1.0 (test@example.com)"
root_categories = ["Category:Tourist attractions in Kyoto", "Category:Parks in Kyoto"]
max_depth = 0
cache_dir = "/tmp/spots/cache"
output_dir = "/tmp/spots/out"
image_dir = "/tmp/spots/img"
request_delay_ms = 0
download_delay_ms = 250
timeout_secs = 5
max_response_bytes = 1024
pages_per_request = 10
images_per_request = 25
"#;
        let path = write_config(&dir, content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_url, "https://en.wikipedia.org/w/api.php");
        assert_eq!(config.root_categories.len(), 2);
        assert_eq!(config.max_depth, 0);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/spots/cache"));
        assert_eq!(config.download_delay(), Duration::from_millis(250));

        let http = config.http();
        assert_eq!(http.user_agent, "spots-test/1.0 (test@example.com)");
        assert_eq!(http.delay, Duration::ZERO);
        assert_eq!(http.timeout, Duration::from_secs(5));
        assert_eq!(http.max_response_bytes, 1024);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "max_depth = 2\nsleep_sec = 5\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_depth, 2);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "max_depth = \"deep\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_empty_roots_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "root_categories = []\n");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("root_categories"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = Config {
            images_per_request: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_oversized_chunks_rejected() {
        let pages = Config {
            pages_per_request: 21,
            ..Config::default()
        };
        let err = pages.validate().unwrap_err();
        assert!(err.to_string().contains("pages_per_request"));

        let images = Config {
            images_per_request: 51,
            ..Config::default()
        };
        assert!(matches!(images.validate(), Err(ConfigError::Invalid(_))));

        let at_limit = Config {
            pages_per_request: 20,
            images_per_request: 50,
            ..Config::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "timeout_secs = 0\n");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_bad_api_url_rejected() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_url"));
    }

    #[test]
    fn test_shared_cache_and_output_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "cache_dir = \"data\"\noutput_dir = \"data\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("cache_dir"));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }
}
