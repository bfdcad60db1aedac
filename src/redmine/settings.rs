use log::warn;
use regex::Regex;
use url::Url;

use crate::auth::ApiKey;
use crate::config::{Config, Messages};
use crate::error::{NotifyError, Result};

/// Validated, immutable view of [`Config`] used by the notifier.
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub server: String,
    pub api_key: ApiKey,
    pub ci_url: String,
    pub issue_pattern: Regex,
    pub status: Option<u32>,
    pub prev_status: Option<u32>,
    pub percent: Option<u8>,
    pub url_build: Option<String>,
    pub messages: Messages,
}

impl NotifierSettings {
    /// Validates `config` once, up front.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] for missing or malformed URLs, an empty
    /// API key or out-of-range status/percent values, and
    /// [`NotifyError::Pattern`] when `issue_regexp` does not compile.
    pub fn from_config(config: &Config) -> Result<Self> {
        let plugin = &config.plugin;

        let server = base_url("redmine.server", &config.redmine.server)?;
        let ci_url = base_url("ci.url", &config.ci.url)?;

        let api_key = ApiKey::from(config.redmine.api_key.trim());
        if api_key.is_empty() {
            return Err(NotifyError::Config("redmine.api_key is required".to_string()));
        }

        for (name, value) in [("status", plugin.status), ("prev_status", plugin.prev_status)] {
            if value == Some(0) {
                return Err(NotifyError::Config(format!(
                    "plugin.{name} must be a positive status id"
                )));
            }
        }

        if let Some(percent) = plugin.percent {
            if percent > 100 {
                return Err(NotifyError::Config(format!(
                    "plugin.percent must be between 0 and 100, got {percent}"
                )));
            }
        }

        if plugin.status.is_none() && (plugin.prev_status.is_some() || plugin.percent.is_some()) {
            warn!("plugin.prev_status and plugin.percent have no effect without plugin.status");
        }

        let url_build = plugin
            .url_build
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(Self {
            server,
            api_key,
            ci_url,
            issue_pattern: issue_pattern(&plugin.issue_regexp)?,
            status: plugin.status,
            prev_status: plugin.prev_status,
            // 0 means "not configured", as in the host's option handling.
            percent: plugin.percent.filter(|percent| *percent > 0),
            url_build,
            messages: Messages::resolve(&plugin.messages),
        })
    }
}

/// Checks that `value` is an absolute URL and strips trailing slashes.
fn base_url(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(NotifyError::Config(format!("{name} is required")));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| NotifyError::Config(format!("Invalid {name} '{trimmed}': {e}")))?;
    if !parsed.has_host() {
        return Err(NotifyError::Config(format!("Invalid {name} '{trimmed}': missing host")));
    }

    Ok(trimmed.to_string())
}

/// Compiles the issue pattern. Group 1 must capture the issue id.
///
/// Accepts both bare patterns (`#(\d+)`) and delimited ones (`/#(\d+)/i`),
/// the latter being the form CI hosts usually carry over from PHP configs.
pub fn issue_pattern(raw: &str) -> Result<Regex> {
    let (body, flags) = split_delimited(raw).unwrap_or((raw, ""));

    // `u` is implied: the regex crate is always Unicode-aware.
    let inline: String = flags.chars().filter(|flag| *flag != 'u').collect();
    let pattern = if inline.is_empty() {
        body.to_string()
    } else {
        format!("(?{inline}){body}")
    };

    let regex = Regex::new(&pattern)?;
    if regex.captures_len() < 2 {
        return Err(NotifyError::Config(format!(
            "plugin.issue_regexp '{raw}' must contain a capture group for the issue id"
        )));
    }

    Ok(regex)
}

fn split_delimited(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let flags = &rest[end + 1..];

    flags
        .chars()
        .all(|flag| matches!(flag, 'i' | 'm' | 's' | 'x' | 'u'))
        .then(|| (&rest[..end], flags))
}
