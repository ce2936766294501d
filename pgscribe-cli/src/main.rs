use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "pgscribe")]
#[command(about = "Introspect a PostgreSQL database and generate Sequelize models, migrations, TypeScript types and DBML diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./pgscribe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection string (overrides config and environment)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code from the database schema
    Generate(commands::generate::GenerateCommand),

    /// Database operations (connection test, introspection)
    Db(commands::db::DbCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database.url = Some(url);
    }

    match cli.command {
        Commands::Generate(generate_cmd) => generate_cmd.execute(config).await,
        Commands::Db(db_cmd) => db_cmd.execute(config).await,
    }
}
