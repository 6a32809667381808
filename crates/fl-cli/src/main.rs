use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fl_cli::commands::{cars, entry, events, import, recompute, status};
use fl_cli::{CarsAction, Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(fl_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = fl_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Import { file } => {
            import::run(&mut stdout, &mut db, file, config.current_locale())?;
        }
        Commands::Cars(CarsAction::List { json }) => cars::list(&mut stdout, &db, *json)?,
        Commands::Cars(CarsAction::Create(args)) => {
            cars::create(&mut stdout, &mut db, args, &config.current_locale())?;
        }
        Commands::Events { car, json } => events::run(&mut stdout, &db, *car, *json)?,
        Commands::Add { car, entry: args } => {
            entry::add(&mut stdout, &mut db, *car, args)?;
        }
        Commands::Edit { event, entry: args } => {
            entry::edit(&mut stdout, &mut db, *event, args)?;
        }
        Commands::Remove { event } => {
            entry::remove(&mut stdout, &mut db, *event)?;
        }
        Commands::Recompute { car } => {
            recompute::run(&mut stdout, &mut db, *car)?;
        }
        Commands::Status => status::run(&mut stdout, &db, &config.database_path)?,
    }

    Ok(())
}
