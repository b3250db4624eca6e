use crate::cli::Cli;
use crate::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_DELAY_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_COMMENT: &str = "Automated import";

/// Optional JSON config file. Every key may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub useragent: Option<String>,
    pub comment: Option<String>,
    pub delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}
impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Everything a run needs, after command line flags are laid over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub username: String,
    pub password: String,
    pub url: Url,
    pub files: String,
    pub useragent: String,
    pub comment: String,
    pub delay: Duration,
    pub timeout: Duration,
    pub dry_run: bool,
}
impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Settings, Error> {
        let config = match &cli.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        Settings::merge(cli, config)
    }
    pub fn merge(cli: Cli, config: Config) -> Result<Settings, Error> {
        let username = cli
            .username
            .or(config.username)
            .ok_or(Error::MissingSetting("username"))?;
        let password = cli
            .password
            .or(config.password)
            .ok_or(Error::MissingSetting("password"))?;
        let url = cli.url.or(config.url).ok_or(Error::MissingSetting("url"))?;
        let url = Url::parse(&url)?;
        let delay = cli.delay.or(config.delay_secs).unwrap_or(DEFAULT_DELAY_SECS);
        let timeout = cli
            .timeout
            .or(config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Settings {
            username,
            password,
            url,
            files: cli.files,
            useragent: cli
                .user_agent
                .or(config.useragent)
                .unwrap_or_else(|| concat!("moinmoin-import/", env!("CARGO_PKG_VERSION")).into()),
            comment: cli
                .comment
                .or(config.comment)
                .unwrap_or_else(|| DEFAULT_COMMENT.into()),
            delay: Duration::from_secs(delay),
            timeout: Duration::from_secs(timeout),
            dry_run: cli.dry_run,
        })
    }
}
