use crate::logging::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "moin-import")]
#[command(about = "Import file content into a MoinMoin wiki")]
#[command(
    long_about = "Import file content into a MoinMoin wiki.\n\n\
    The file name without extension is appended to the base URL, so \
    `--files devcons.md --url https://wiki.example.com/QM/test/` edits \
    https://wiki.example.com/QM/test/devcons. Existing content is overwritten; \
    the wiki keeps the previous revision.\n\n\
    Login goes to the root of the base URL's host, so wikis served below a \
    path prefix are not supported."
)]
#[command(version)]
pub struct Cli {
    /// Username for the MoinMoin wiki
    #[arg(short, long, required_unless_present = "config")]
    pub username: Option<String>,

    /// Password for the MoinMoin wiki
    #[arg(short, long, required_unless_present = "config")]
    pub password: Option<String>,

    /// Files with text to import: a file name or a pattern like 'page-*.txt'
    #[arg(short, long)]
    pub files: String,

    /// Base URL for pages, like https://wiki.example.com/QM/test/
    #[arg(short = 'b', long, value_name = "URL", required_unless_present = "config")]
    pub url: Option<String>,

    /// Log level
    #[arg(short, long = "log", value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// JSON file with defaults for username, password, url, comment, useragent,
    /// delay_secs and timeout_secs
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds to wait between pages so the wiki's surge protection stays quiet
    #[arg(short, long, value_name = "SECS")]
    pub delay: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Edit comment stored with every revision
    #[arg(long)]
    pub comment: Option<String>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Show which page each file would replace without contacting the wiki
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}
