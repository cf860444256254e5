use clap::{Parser, Subcommand};
use configuration::{Settings, StorageBackend};
use std::path::PathBuf;

mod seed;

/// The main entry point for the Academia administration backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = configuration::load_config(cli.config.as_deref())?;
    let _log_guard = configuration::init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Serve(args) => {
            apply_overrides(&mut settings, &args);
            web_server::run_server(settings).await?;
        }
        Commands::Migrate => {
            let db_pool = database::connect(&settings.database).await?;
            database::run_migrations(&db_pool).await?;
            tracing::info!("Database schema is up to date.");
        }
        Commands::Seed => {
            let db_pool = database::connect(&settings.database).await?;
            database::run_migrations(&db_pool).await?;
            seed::run(db_pool, &settings.enrollment).await?;
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Academic administration backend: students, subjects and enrollments.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./academia.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Serve(ServeArgs),
    /// Apply pending database migrations and exit.
    Migrate,
    /// Insert a small demo data set (idempotent).
    Seed,
}

#[derive(Parser)]
struct ServeArgs {
    /// Storage backend, overriding `storage.backend` from the configuration.
    #[arg(long, value_enum)]
    backend: Option<StorageBackend>,

    /// Port to listen on, overriding `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

fn apply_overrides(settings: &mut Settings, args: &ServeArgs) {
    if let Some(backend) = args.backend {
        settings.storage.backend = backend;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
}
