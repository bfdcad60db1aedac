use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::build::{BuildContext, BuildStatus};
use crate::config::Config;
use crate::output;
use crate::redmine::{FailureLog, IssueNotifier};

#[derive(Parser)]
#[command(name = "redmine-notify")]
#[command(author, version, about = "Update Redmine issues with CI build results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a finished build to the issue referenced in its commit message
    Notify(NotifyArgs),

    /// Write a default configuration file
    Init {
        #[arg(default_value = "redmine-notify.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args)]
struct NotifyArgs {
    /// Configuration file (defaults to ./redmine-notify.{toml,json,yaml,yml})
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, env = "REDMINE_SERVER")]
    server: Option<String>,

    #[arg(long, env = "REDMINE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Public base URL of the CI host
    #[arg(long, env = "CI_URL")]
    ci_url: Option<String>,

    #[arg(short = 'm', long)]
    commit_message: String,

    /// passed, failed or a numeric host status code
    #[arg(short, long)]
    status: BuildStatus,

    /// Build log file, `-` for stdin
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(short = 'P', long)]
    project_id: String,

    #[arg(short, long)]
    branch: String,

    #[arg(long)]
    build_id: u64,

    /// Resolved build URL, overrides `plugin.url_build`
    #[arg(long)]
    build_url: Option<String>,

    /// Skip the update regardless of configuration
    #[arg(long, default_value_t = false)]
    disabled: bool,
}

impl NotifyArgs {
    /// Loads the config file and layers flag/env overrides on top.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(server) = &self.server {
            config.redmine.server = server.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.redmine.api_key = api_key.clone();
        }
        if let Some(ci_url) = &self.ci_url {
            config.ci.url = ci_url.clone();
        }
        if let Some(build_url) = &self.build_url {
            config.plugin.url_build = Some(build_url.clone());
        }
        if self.disabled {
            config.plugin.enabled = false;
        }

        Ok(config)
    }

    fn build_context(&self) -> Result<BuildContext> {
        let log = match &self.log_file {
            Some(path) => read_log(path)?,
            None => String::new(),
        };

        Ok(BuildContext {
            commit_message: self.commit_message.clone(),
            status: self.status,
            log,
            project_id: self.project_id.clone(),
            branch: self.branch.clone(),
            build_id: self.build_id,
        })
    }
}

fn read_log(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read build log from stdin");
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read build log: {}", path.display()))
}

/// Prints update failures to stderr next to the rest of the CLI output.
struct ConsoleFailureLog;

impl FailureLog for ConsoleFailureLog {
    fn log_failure(&self, message: &str) {
        output::print_failure(message);
    }
}

impl Cli {
    async fn execute_notify(&self, args: &NotifyArgs) -> Result<()> {
        let config = args.resolve_config()?;
        let build = args.build_context()?;

        info!(
            "Notifying Redmine for build {} of project {} ({}, code {})",
            build.build_id,
            build.project_id,
            build.status,
            build.status.code()
        );

        let notifier = IssueNotifier::new(&config)
            .context("Invalid redmine-notify configuration")?
            .with_failure_log(Arc::new(ConsoleFailureLog));

        if !notifier.notify(&build).await {
            bail!("Redmine update failed for build {}", build.build_id);
        }

        output::print_success(build.build_id);
        Ok(())
    }

    fn execute_init(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("{} already exists, use --force to overwrite", path.display());
        }

        Config::default().save(path)?;
        info!("Configuration written to: {}", path.display());
        eprintln!("Wrote {}", output::cyan(path.display()));

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Notify(args) => self.execute_notify(args).await,
            Commands::Init { path, force } => self.execute_init(path, *force),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_notify() {
        let cli = parse(&[
            "redmine-notify",
            "notify",
            "--server",
            "https://redmine.example.com",
            "--api-key",
            "secret",
            "-m",
            "Fix login #42",
            "--status",
            "failed",
            "-P",
            "7",
            "-b",
            "main",
            "--build-id",
            "99",
        ]);

        let Commands::Notify(args) = &cli.command else {
            panic!("expected notify command");
        };
        assert_eq!(args.status, BuildStatus::Failed);
        assert_eq!(args.build_id, 99);

        let build = args.build_context().unwrap();
        assert_eq!(build.commit_message, "Fix login #42");
        assert!(build.log.is_empty());
    }

    #[test]
    fn test_status_code_accepted() {
        let cli = parse(&[
            "redmine-notify", "notify", "-m", "x", "-s", "2", "-P", "1", "-b", "dev", "--build-id", "1",
        ]);
        let Commands::Notify(args) = &cli.command else {
            panic!("expected notify command");
        };
        assert_eq!(args.status, BuildStatus::Passed);
    }

    #[test]
    fn test_invalid_status_rejected() {
        let result = Cli::try_parse_from([
            "redmine-notify", "notify", "-m", "x", "-s", "exploded", "-P", "1", "-b", "dev", "--build-id", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("redmine-notify.toml");
        std::fs::write(
            &config_path,
            r#"
[redmine]
server = "https://from-file.example.com"
api_key = "file-key"

[plugin]
status = 3
"#,
        )
        .unwrap();

        let log_path = temp_dir.path().join("build.log");
        std::fs::write(&log_path, "all tests passed").unwrap();

        let cli = parse(&[
            "redmine-notify",
            "notify",
            "--config",
            config_path.to_str().unwrap(),
            "--ci-url",
            "https://ci.example.com",
            "--build-url",
            "https://ci.example.com/build/view/5",
            "--disabled",
            "--log-file",
            log_path.to_str().unwrap(),
            "-m",
            "x",
            "-s",
            "passed",
            "-P",
            "1",
            "-b",
            "dev",
            "--build-id",
            "5",
        ]);
        let Commands::Notify(args) = &cli.command else {
            panic!("expected notify command");
        };

        let config = args.resolve_config().unwrap();
        assert_eq!(config.redmine.server, "https://from-file.example.com");
        assert_eq!(config.redmine.api_key, "file-key");
        assert_eq!(config.ci.url, "https://ci.example.com");
        assert_eq!(
            config.plugin.url_build.as_deref(),
            Some("https://ci.example.com/build/view/5")
        );
        assert!(!config.plugin.enabled);
        assert_eq!(config.plugin.status, Some(3));

        let build = args.build_context().unwrap();
        assert_eq!(build.log, "all tests passed");
    }

    #[tokio::test]
    async fn test_disabled_notify_ignores_missing_settings() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("redmine-notify.toml");
        std::fs::write(&config_path, "[plugin]\nenabled = false\n").unwrap();

        let cli = parse(&[
            "redmine-notify",
            "notify",
            "--config",
            config_path.to_str().unwrap(),
            "-m",
            "Fix login #42",
            "-s",
            "failed",
            "-P",
            "1",
            "-b",
            "dev",
            "--build-id",
            "3",
        ]);

        cli.execute().await.unwrap();
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("redmine-notify.toml");
        let cli = parse(&["redmine-notify", "init", path.to_str().unwrap()]);

        cli.execute_init(&path, false).unwrap();
        assert!(path.exists());
        assert!(cli.execute_init(&path, false).is_err());
        cli.execute_init(&path, true).unwrap();
    }
}
