//! restql: relational tables over HTTP with the PostgREST URL grammar.
//!
//! # Usage
//!
//! ```bash
//! # Start serving the configured service
//! restql -f config.yaml start
//!
//! # Print a schema summary for a service as JSON
//! restql -f config.yaml inspect main
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use sqlx::mysql::MySqlPool;
use tracing_subscriber::EnvFilter;

use restql_gateway::{schema, Gateway, GatewayConfig};

#[derive(Parser)]
#[command(name = "restql")]
#[command(version)]
#[command(about = "Relational tables over HTTP with the PostgREST URL grammar")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short = 'f', long, default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start serving the configured service.
    Start,
    /// Print a schema summary for the named service as JSON.
    Inspect {
        /// Service name from the configuration file.
        service: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let mut gateway = Gateway::new(config);
            gateway.init().await?;
            gateway.serve().await?;
        }
        Commands::Inspect { service } => {
            let svc = config
                .service(&service)
                .ok_or_else(|| anyhow!("unknown service: {service}"))?;
            let pool = MySqlPool::connect(&svc.dsn).await?;
            let tables = svc.table_names();
            let info = schema::inspect_tables(&pool, &tables).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
