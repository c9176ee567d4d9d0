//! `partner-portal` binary entry point.

use clap::Parser;
use log::error;
use partner_core::db::migrations::schema_version;
use partner_core::db::open_db;
use partner_core::{default_log_level, init_logging};
use partner_server::config::{Cli, Command, ServerConfig};
use partner_server::error::ServerError;
use partner_server::seed::apply_seed_file;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let common = cli.command.common();
    let level = common
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    if let Err(err) = init_logging(&level, common.log_dir.as_deref()) {
        eprintln!("logging unavailable: {err}");
    }

    match run(&cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=server status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: &Command) -> Result<(), ServerError> {
    match command {
        Command::Serve(args) => partner_server::serve(&ServerConfig::from(args)).await,
        Command::Seed(args) => {
            let conn = open_db(&args.common.database)?;
            let report = apply_seed_file(&conn, &args.file)?;
            println!(
                "seeded {} partner(s), skipped {}",
                report.created.len(),
                report.skipped.len()
            );
            Ok(())
        }
        Command::Migrate(args) => {
            let conn = open_db(&args.database)?;
            println!(
                "database {} is at schema version {}",
                args.database.display(),
                schema_version(&conn)?
            );
            Ok(())
        }
    }
}
