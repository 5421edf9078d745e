//! `coma-seed`: bulk-loads the demonstration dataset into a COMA store.
//!
//! # Responsibility
//! - Turn flags and environment into a store target and seed options.
//! - Print the per-kind summary on success.
//! - Exit with status 1 after printing the failure on stderr.

use anyhow::{Context, Result};
use clap::Parser;
use coma_core::{
    default_log_level, init_logging, seed, Dataset, LogLevel, SeedOptions, StoreTarget,
};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_DB_FILE: &str = "coma.sqlite3";

/// Seed a COMA domain store with the demonstration dataset.
#[derive(Parser, Debug)]
#[command(name = "coma-seed", author, version, about)]
struct Cli {
    /// SQLite database file to populate.
    #[arg(long, env = "COMA_DB_PATH")]
    db: Option<PathBuf>,

    /// Load into a throwaway in-memory database; overrides `--db`.
    #[arg(long)]
    in_memory: bool,

    /// Keep existing rows instead of clearing every table first.
    #[arg(long)]
    keep_existing: bool,

    /// trace|debug|info|warn|error
    #[arg(long, env = "COMA_LOG_LEVEL", default_value_t = default_log_level())]
    log_level: LogLevel,

    /// Absolute directory for log files; logging stays off when unset.
    #[arg(long, env = "COMA_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn target(&self) -> StoreTarget {
        if self.in_memory {
            return StoreTarget::Memory;
        }
        StoreTarget::File(
            self.db
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE)),
        )
    }

    fn options(&self) -> SeedOptions {
        SeedOptions {
            clear_existing: !self.keep_existing,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=seed_cli module=cli status=error error={err:#}");
            eprintln!("Seeding failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging(cli.log_level, log_dir).context("failed to initialize logging")?;
    }

    let target = cli.target();
    println!("Seeding {target}...");
    let summary = seed::run(&target, &Dataset::demo(), &cli.options())
        .with_context(|| format!("failed to seed `{target}`"))?;

    println!("Seeding completed.");
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use coma_core::{LogLevel, StoreTarget};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn in_memory_flag_selects_memory_target() {
        let cli = Cli::try_parse_from(["coma-seed", "--in-memory", "--keep-existing"]).unwrap();
        assert_eq!(cli.target(), StoreTarget::Memory);
        assert!(!cli.options().clear_existing);
    }

    #[test]
    fn in_memory_flag_wins_over_db_path_from_environment() {
        std::env::set_var("COMA_DB_PATH", "/tmp/coma-env.sqlite3");
        let parsed = Cli::try_parse_from(["coma-seed", "--in-memory"]);
        std::env::remove_var("COMA_DB_PATH");

        let cli = parsed.unwrap();
        assert_eq!(cli.target(), StoreTarget::Memory);
    }

    #[test]
    fn in_memory_flag_wins_over_explicit_db_path() {
        let cli = Cli::try_parse_from(["coma-seed", "--db", "a.sqlite3", "--in-memory"]).unwrap();
        assert_eq!(cli.target(), StoreTarget::Memory);
    }

    #[test]
    fn log_level_accepts_aliases_and_rejects_unknown_values() {
        let cli = Cli::try_parse_from(["coma-seed", "--log-level", "WARNING"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(Cli::try_parse_from(["coma-seed", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn explicit_db_path_is_used() {
        let cli = Cli::try_parse_from(["coma-seed", "--db", "/tmp/demo.sqlite3"]).unwrap();
        assert_eq!(
            cli.target(),
            StoreTarget::File(PathBuf::from("/tmp/demo.sqlite3"))
        );
        assert!(cli.options().clear_existing);
    }
}
