// Copyright © 2018, Peter Atashian
use clap::Parser;
use moinmoin_import::cli::Cli;
use moinmoin_import::logging::{self, LogConfig};
use moinmoin_import::{plan, Error, FixedDelay, Importer, Moinmoin, Settings};
use std::process::ExitCode;
use tracing::{error, info};

fn import(settings: &Settings) -> Result<(), Error> {
    if settings.dry_run {
        for target in plan(&settings.files, &settings.url)? {
            info!("Would replace {} with {}", target.url, target.path.display());
        }
        return Ok(());
    }
    let wiki = Moinmoin::new(settings)?;
    let importer = Importer::new(wiki, FixedDelay(settings.delay));
    importer.run(
        &settings.files,
        &settings.url,
        &settings.username,
        &settings.password,
    )?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&LogConfig::new(cli.log_level));
    let result = Settings::from_cli(cli).and_then(|settings| import(&settings));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_critical() => {
            error!("CRITICAL {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
