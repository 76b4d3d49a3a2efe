mod cli;

use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use yield_ledger::{
    Ledger,
    config::{self, database},
    errors::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let cli = cli::Cli::parse();

    // 3. Load the application configuration (missing file means defaults)
    let app_config = config::load_config_or_default(&cli.config)
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Initialize database
    let database_url = database::get_database_url(&app_config);
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Run the command
    let ledger = Ledger::new(db, app_config.limits);
    cli::run(cli.command, &ledger, &app_config)
        .await
        .inspect_err(|e| error!(kind = ?e.kind(), "{}", e))
}
