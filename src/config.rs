use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default configuration file, looked up in the user's home directory
pub const DEFAULT_CONFIG_FILE: &str = ".podfox.json";

/// Process-wide configuration, constructed once at startup and passed by
/// reference into the components that need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Root directory containing one folder per subscription
    pub podcast_directory: PathBuf,
    /// Default cap on episodes downloaded per batch
    pub maxnum: usize,
    /// Content types eligible for episode extraction
    pub mimetypes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            podcast_directory: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Podcasts"),
            maxnum: 5000,
            mimetypes: [
                "audio/aac",
                "audio/ogg",
                "audio/mpeg",
                "audio/mp3",
                "audio/mp4",
                "video/mp4",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Config {
    /// Load the configuration from the given path, or from `~/.podfox.json`
    /// when no path is supplied.
    ///
    /// A missing file yields the defaults. Malformed JSON is an error, since
    /// silently ignoring a broken configuration would surprise the user.
    /// Unknown keys are ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => expand_home(path),
            None => default_config_path()?,
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::ReadFailed { path, source: e }),
        };

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed { path, source: e })?;
        config.podcast_directory = expand_home(&config.podcast_directory);

        Ok(config)
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_FILE))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.maxnum, 5000);
        assert!(config.mimetypes.contains(&"audio/mpeg".to_string()));
        assert!(config.mimetypes.contains(&"video/mp4".to_string()));
        assert!(config.podcast_directory.ends_with("Podcasts"));
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.maxnum, 5000);
    }

    #[test]
    fn load_reads_kebab_case_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"podcast-directory": "/tmp/pods", "maxnum": 3, "mimetypes": ["audio/ogg"]}"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.podcast_directory, PathBuf::from("/tmp/pods"));
        assert_eq!(config.maxnum, 3);
        assert_eq!(config.mimetypes, vec!["audio/ogg".to_string()]);
    }

    #[test]
    fn load_ignores_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"maxnum": 7, "some-future-option": true}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.maxnum, 7);
    }

    #[test]
    fn load_partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"maxnum": 2}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.maxnum, 2);
        assert!(config.mimetypes.contains(&"audio/mpeg".to_string()));
    }

    #[test]
    fn load_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn expand_home_leaves_absolute_paths_alone() {
        assert_eq!(
            expand_home(Path::new("/var/podcasts")),
            PathBuf::from("/var/podcasts")
        );
    }

    #[test]
    fn expand_home_resolves_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/Podcasts")), home.join("Podcasts"));
        }
    }
}
