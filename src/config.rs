use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file structure for redmine-notify.
///
/// Mirrors what a CI host hands the plugin: global tracker settings, the
/// host's own public URL and the per-project plugin options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tracker connection settings
    #[serde(default)]
    pub redmine: RedmineConfig,

    /// CI host settings
    #[serde(default)]
    pub ci: CiConfig,

    /// Plugin options
    #[serde(default)]
    pub plugin: PluginOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedmineConfig {
    /// Redmine base URL, e.g. `https://redmine.example.com`
    #[serde(default)]
    pub server: String,

    /// REST API key
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CiConfig {
    /// Public base URL of the CI host, used for build links and status images
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Turn the plugin into a no-op when false
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Status id to move the issue to when the build passes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u32>,

    /// Only transition when the issue currently has this status id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_status: Option<u32>,

    /// Done ratio to set alongside the status transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,

    /// Host locale tag; accepted for compatibility, notes use `messages`
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Pattern locating the issue id in the commit message (group 1)
    #[serde(default = "default_issue_regexp")]
    pub issue_regexp: String,

    /// Build URL line added to every note, already interpolated by the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_build: Option<String>,

    /// Per-outcome message overrides
    #[serde(default)]
    pub messages: MessageOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            status: None,
            prev_status: None,
            percent: None,
            lang: default_lang(),
            issue_regexp: default_issue_regexp(),
            url_build: None,
            messages: MessageOverrides::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_issue_regexp() -> String {
    r"#(\d+)".to_string()
}

/// Note templates for each build outcome. `%s` is replaced by the build link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub passed: String,
    pub failed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            passed: "Passed %s".to_string(),
            failed: "Failed %s".to_string(),
        }
    }
}

impl Messages {
    /// Default templates with any configured overrides applied.
    pub fn resolve(overrides: &MessageOverrides) -> Self {
        let defaults = Self::default();
        Self {
            passed: overrides.passed.clone().unwrap_or(defaults.passed),
            failed: overrides.failed.clone().unwrap_or(defaults.failed),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./redmine-notify.toml
    /// 3. ./redmine-notify.json
    /// 4. ./redmine-notify.yaml
    /// 5. ./redmine-notify.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "redmine-notify.toml",
            "redmine-notify.json",
            "redmine-notify.yaml",
            "redmine-notify.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.plugin.enabled);
        assert_eq!(config.plugin.lang, "en");
        assert_eq!(config.plugin.issue_regexp, r"#(\d+)");
        assert!(config.plugin.status.is_none());
        assert!(config.redmine.server.is_empty());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[redmine]
server = "https://redmine.example.com"
api_key = "abc123"

[ci]
url = "https://ci.example.com"

[plugin]
status = 3
prev_status = 2
percent = 100
issue_regexp = "refs #(\\d+)"

[plugin.messages]
passed = "Green: %s"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.redmine.server, "https://redmine.example.com");
        assert_eq!(config.redmine.api_key, "abc123");
        assert_eq!(config.ci.url, "https://ci.example.com");
        assert_eq!(config.plugin.status, Some(3));
        assert_eq!(config.plugin.prev_status, Some(2));
        assert_eq!(config.plugin.percent, Some(100));
        assert_eq!(config.plugin.issue_regexp, r"refs #(\d+)");
        assert_eq!(config.plugin.messages.passed.as_deref(), Some("Green: %s"));
        assert!(config.plugin.enabled);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "redmine": { "server": "https://redmine.json.com", "api_key": "k" },
  "plugin": { "enabled": false, "lang": "ru" }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.redmine.server, "https://redmine.json.com");
        assert!(!config.plugin.enabled);
        assert_eq!(config.plugin.lang, "ru");
        assert!(config.ci.url.is_empty());
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        let yaml_content = r#"
redmine:
  server: https://redmine.yaml.com
plugin:
  url_build: https://ci.example.com/build/view/7
"#;
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.redmine.server, "https://redmine.yaml.com");
        assert_eq!(
            config.plugin.url_build.as_deref(),
            Some("https://ci.example.com/build/view/7")
        );
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("does-not-exist.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("redmine-notify.toml");

        let mut config = Config::default();
        config.redmine.server = "https://redmine.example.com".to_string();
        config.plugin.status = Some(5);
        config.save(&path).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.redmine.server, "https://redmine.example.com");
        assert_eq!(reloaded.plugin.status, Some(5));
        assert!(reloaded.plugin.prev_status.is_none());
    }

    #[test]
    fn test_default_messages() {
        let messages = Messages::resolve(&MessageOverrides::default());
        assert_eq!(messages, Messages::default());
        assert_eq!(messages.passed, "Passed %s");
        assert_eq!(messages.failed, "Failed %s");
    }

    #[test]
    fn test_messages_overrides_win() {
        let overrides = MessageOverrides {
            passed: None,
            failed: Some("Broken build %s".to_string()),
        };
        let messages = Messages::resolve(&overrides);
        assert_eq!(messages.passed, "Passed %s");
        assert_eq!(messages.failed, "Broken build %s");
    }
}
