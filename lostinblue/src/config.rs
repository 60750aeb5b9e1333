use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::SearchResult;
use crate::filters::{PathFilter, DEFAULT_EXCLUDE_PATTERN, DEFAULT_INCLUDE_PATTERN};

/// Configuration for loading a corpus and running queries against it.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.lostinblue.yaml` in the current directory
/// 3. Global `$HOME/.config/lostinblue/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Root directory to snapshot
/// root_path: "."
///
/// # Regex every searched file path must match (null disables the filter)
/// include_pattern: "\\.(go|rs|py)$"
///
/// # Regex that prunes whole directories
/// exclude_pattern: "/(node_modules|target|\\.git)/"
///
/// # Worker threads per query (default: CPU cores)
/// thread_count: 8
///
/// # Queue capacity per worker
/// buffering: 10
///
/// # Matches kept per file; the rest are dropped
/// max_matches_per_file: 10
///
/// # Snippet context
/// context_before: 2
/// context_after: 2
///
/// # failfast | lossy
/// encoding_mode: failfast
///
/// # Record unreadable files instead of failing the query
/// skip_errors: false
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// Command-line values take precedence over file values; see [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Root directory of the snapshot
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Regex tested against full file paths; files that don't match are skipped
    #[serde(default = "default_include_pattern")]
    pub include_pattern: Option<String>,

    /// Regex tested against directory paths; a match prunes the subtree
    #[serde(default = "default_exclude_pattern")]
    pub exclude_pattern: Option<String>,

    /// Number of worker threads per query
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Queue capacity per worker; both queues hold `buffering * thread_count` items
    #[serde(default = "default_buffering")]
    pub buffering: NonZeroUsize,

    /// Matches kept per file
    #[serde(default = "default_max_matches")]
    pub max_matches_per_file: usize,

    /// Lines of context above each match
    #[serde(default = "default_context")]
    pub context_before: usize,

    /// Lines of context below each match
    #[serde(default = "default_context")]
    pub context_after: usize,

    /// How to handle invalid UTF-8 while loading files
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Record per-file failures and keep going instead of failing the query
    #[serde(default)]
    pub skip_errors: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How invalid UTF-8 in a file is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Invalid UTF-8 is an error
    #[default]
    FailFast,
    /// Invalid sequences are replaced with U+FFFD
    Lossy,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_include_pattern() -> Option<String> {
    Some(DEFAULT_INCLUDE_PATTERN.to_string())
}

fn default_exclude_pattern() -> Option<String> {
    Some(DEFAULT_EXCLUDE_PATTERN.to_string())
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_buffering() -> NonZeroUsize {
    NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN)
}

fn default_max_matches() -> usize {
    10
}

fn default_context() -> usize {
    2
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            include_pattern: default_include_pattern(),
            exclude_pattern: default_exclude_pattern(),
            thread_count: default_thread_count(),
            buffering: default_buffering(),
            max_matches_per_file: default_max_matches(),
            context_before: default_context(),
            context_after: default_context(),
            encoding_mode: EncodingMode::default(),
            skip_errors: false,
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line. `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_path: Option<PathBuf>,
    pub include_pattern: Option<String>,
    pub exclude_pattern: Option<String>,
    pub thread_count: Option<NonZeroUsize>,
    pub buffering: Option<NonZeroUsize>,
    pub max_matches_per_file: Option<usize>,
    pub context_lines: Option<usize>,
    pub encoding_mode: Option<EncodingMode>,
    pub skip_errors: bool,
    pub log_level: Option<String>,
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file,
    /// which must exist
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("lostinblue/config.yaml")),
            // Local config
            Some(PathBuf::from(".lostinblue.yaml")),
        ];

        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if cli.include_pattern.is_some() {
            self.include_pattern = cli.include_pattern;
        }
        if cli.exclude_pattern.is_some() {
            self.exclude_pattern = cli.exclude_pattern;
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        if let Some(buffering) = cli.buffering {
            self.buffering = buffering;
        }
        if let Some(max) = cli.max_matches_per_file {
            self.max_matches_per_file = max;
        }
        if let Some(lines) = cli.context_lines {
            self.context_before = lines;
            self.context_after = lines;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if cli.skip_errors {
            self.skip_errors = true;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Compiles the include/exclude patterns
    pub fn path_filter(&self) -> SearchResult<PathFilter> {
        PathFilter::new(
            self.include_pattern.as_deref(),
            self.exclude_pattern.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            root_path: "src"
            include_pattern: "\\.go$"
            exclude_pattern: "/vendor/"
            thread_count: 4
            buffering: 3
            max_matches_per_file: 25
            context_before: 1
            context_after: 0
            encoding_mode: lossy
            skip_errors: true
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.root_path, PathBuf::from("src"));
        assert_eq!(config.include_pattern.as_deref(), Some(r"\.go$"));
        assert_eq!(config.exclude_pattern.as_deref(), Some("/vendor/"));
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.buffering, NonZeroUsize::new(3).unwrap());
        assert_eq!(config.max_matches_per_file, 25);
        assert_eq!(config.context_before, 1);
        assert_eq!(config.context_after, 0);
        assert_eq!(config.encoding_mode, EncodingMode::Lossy);
        assert!(config.skip_errors);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"root_path: \".\"\n").unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.root_path, PathBuf::from("."));
        assert_eq!(
            config.include_pattern.as_deref(),
            Some(DEFAULT_INCLUDE_PATTERN)
        );
        assert_eq!(
            config.exclude_pattern.as_deref(),
            Some(DEFAULT_EXCLUDE_PATTERN)
        );
        assert_eq!(
            config.thread_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
        assert_eq!(config.buffering.get(), 10);
        assert_eq!(config.max_matches_per_file, 10);
        assert_eq!(config.context_before, 2);
        assert_eq!(config.context_after, 2);
        assert_eq!(config.encoding_mode, EncodingMode::FailFast);
        assert!(!config.skip_errors);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = SearchConfig {
            root_path: PathBuf::from("src"),
            thread_count: NonZeroUsize::new(4).unwrap(),
            log_level: "info".to_string(),
            ..SearchConfig::default()
        };

        let merged = file_config.merge_with_cli(ConfigOverrides {
            root_path: Some(PathBuf::from("tests")),
            include_pattern: Some(r"\.rs$".to_string()),
            thread_count: Some(NonZeroUsize::new(16).unwrap()),
            context_lines: Some(0),
            skip_errors: true,
            ..ConfigOverrides::default()
        });

        assert_eq!(merged.root_path, PathBuf::from("tests")); // CLI value
        assert_eq!(merged.include_pattern.as_deref(), Some(r"\.rs$")); // CLI value
        assert_eq!(
            merged.exclude_pattern.as_deref(),
            Some(DEFAULT_EXCLUDE_PATTERN)
        ); // File value (CLI None)
        assert_eq!(merged.thread_count.get(), 16);
        assert_eq!(merged.context_before, 0);
        assert_eq!(merged.context_after, 0);
        assert!(merged.skip_errors);
        assert_eq!(merged.log_level, "info"); // File value (CLI None)
    }

    #[test]
    fn test_invalid_config() {
        let config_content = r#"
            root_path: []  # Should be string
            thread_count: "invalid"  # Should be number
        "#;

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let result = SearchConfig::load_from(Some(&config_path));
        assert!(result.is_err(), "Expected error loading invalid config");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SearchConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_path_filter_from_config() {
        let config = SearchConfig {
            include_pattern: Some("(".to_string()),
            ..SearchConfig::default()
        };
        assert!(config.path_filter().is_err());

        let config = SearchConfig {
            include_pattern: None,
            exclude_pattern: None,
            ..SearchConfig::default()
        };
        let filter = config.path_filter().unwrap();
        assert!(filter.should_include_file(Path::new("README")));
    }
}
