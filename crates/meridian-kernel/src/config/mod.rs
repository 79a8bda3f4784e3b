//! Configuration file loading.
//!
//! Gateway settings can be read from YAML, TOML or JSON files.  The format is
//! picked from the file extension, and `${VAR}` / `$VAR` references are
//! replaced with environment variables before parsing.

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::LazyLock;

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));
static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid regex"));

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// Supports both `${VAR_NAME}` and `$VAR_NAME`.  Unset variables are left
/// untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    BARE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Load configuration from a file
///
/// ```rust,ignore
/// use meridian_kernel::config::load_config;
///
/// let config: GatewayServerConfig = load_config("meridian.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Load configuration from a string with explicit format
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted_content = substitute_env_vars(content);

    let config = Cfg::builder()
        .add_source(File::from_str(&substituted_content, format))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration with environment variable overrides
///
/// Variables use the given prefix and `__` for nesting, e.g.
/// `MERIDIAN__PORT=9131` overrides `port`.
pub fn load_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    let substituted = substitute_env_vars(&content);

    let config = Cfg::builder()
        .add_source(File::from_str(&substituted, format))
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        port: u16,
        #[serde(default)]
        pull_urls: Vec<String>,
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("meridian.yaml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("meridian.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("meridian.toml").unwrap(), FileFormat::Toml);
        assert_eq!(detect_format("meridian.json").unwrap(), FileFormat::Json);
        assert!(detect_format("meridian.txt").is_err());
        assert!(detect_format("meridian").is_err());
    }

    #[test]
    fn test_from_str_toml() {
        let toml = r#"
port = 9130
pull_urls = ["http://registry-a:9130", "http://registry-b:9130"]
"#;
        let settings: Settings = from_str(toml, FileFormat::Toml).unwrap();
        assert_eq!(settings.port, 9130);
        assert_eq!(settings.pull_urls.len(), 2);
    }

    #[test]
    fn test_substitution_leaves_unknown_vars() {
        let out = substitute_env_vars("url: ${MERIDIAN_SURELY_UNSET_VAR_42}/x");
        assert_eq!(out, "url: ${MERIDIAN_SURELY_UNSET_VAR_42}/x");
    }

    #[test]
    fn test_substitution_replaces_known_vars() {
        // PATH is set in every test environment.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(substitute_env_vars("${PATH}"), path);
        assert_eq!(substitute_env_vars("$PATH"), path);
    }

    #[test]
    fn test_load_config_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("meridian.yaml");
        std::fs::write(&file, "port: 9140\npull_urls:\n  - http://a\n").unwrap();
        let settings: Settings = load_config(file.to_str().unwrap()).unwrap();
        assert_eq!(
            settings,
            Settings {
                port: 9140,
                pull_urls: vec!["http://a".to_string()],
            }
        );
    }
}
