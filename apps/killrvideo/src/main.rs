//! KillrVideo schema tool
//!
//! Creates, inspects, resets and seeds the killrvideo keyspace. Connection
//! settings come from `CASSANDRA_*` environment variables; a failed connection
//! is reported immediately and never retried.

use clap::{Parser, Subcommand};
use core_config::{Environment, FromEnv};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::cassandra::connect_from_config;
use eyre::Result;
use tracing::info;

mod commands;
mod config;

use commands::catalogue_for;
use config::Config;

#[derive(Parser)]
#[command(name = "killrvideo")]
#[command(about = "Provision and inspect the killrvideo Cassandra keyspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Create the keyspace if it does not exist
    CreateKeyspace {
        /// SimpleStrategy replication factor
        #[arg(short, long, default_value_t = cql_schema::catalogue::REPLICATION_FACTOR)]
        replication_factor: u32,
    },

    /// Create every type, table and index if they do not exist
    CreateSchema {
        /// Print the statements without connecting
        #[arg(long)]
        dry_run: bool,
    },

    /// Drop every index, table and type, keeping the keyspace
    DropSchema,

    /// Drop the keyspace and everything in it
    DropKeyspace,

    /// Remove all rows, keeping the schema
    Truncate {
        /// Only truncate this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Drop and recreate the schema
    Reset,

    /// Show cluster health and which tables exist
    Status,

    /// Insert sample users, videos, comments and files
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    init_tracing(&Environment::from_env());

    let replication_factor = match cli.command {
        Commands::CreateKeyspace { replication_factor } => replication_factor,
        _ => cql_schema::catalogue::REPLICATION_FACTOR,
    };

    if let Commands::CreateSchema { dry_run: true } = cli.command {
        let catalogue = catalogue_for(&config::keyspace_from_env(), replication_factor);
        for statement in commands::dry_run(&catalogue)? {
            println!("{statement}");
        }
        return Ok(());
    }

    let config = Config::from_env()?;
    let catalogue = catalogue_for(&config.keyspace, replication_factor);

    info!(contact_points = ?config.cassandra.contact_points, "Connecting to Cassandra...");
    let session = connect_from_config(&config.cassandra)
        .await
        .map_err(|e| eyre::eyre!("Cassandra connection failed: {}", e))?;

    match cli.command {
        Commands::CreateKeyspace { .. } => commands::create_keyspace(&session, &catalogue).await?,
        Commands::CreateSchema { .. } => commands::create_schema(&session, &catalogue).await?,
        Commands::DropSchema => commands::drop_schema(&session, &catalogue).await?,
        Commands::DropKeyspace => commands::drop_keyspace(&session, &catalogue).await?,
        Commands::Truncate { table } => {
            commands::truncate(&session, &catalogue, table.as_deref()).await?
        }
        Commands::Reset => commands::reset(&session, &catalogue).await?,
        Commands::Status => {
            let status = commands::status(&session, &catalogue).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Seed => commands::seed(&session, &catalogue).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("killrvideo").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_create_keyspace_defaults_to_single_replica() {
        assert_eq!(
            parse(&["create-keyspace"]),
            Commands::CreateKeyspace {
                replication_factor: 1
            }
        );
        assert_eq!(
            parse(&["create-keyspace", "--replication-factor", "3"]),
            Commands::CreateKeyspace {
                replication_factor: 3
            }
        );
    }

    #[test]
    fn test_schema_commands() {
        assert_eq!(
            parse(&["create-schema", "--dry-run"]),
            Commands::CreateSchema { dry_run: true }
        );
        assert_eq!(parse(&["drop-schema"]), Commands::DropSchema);
        assert_eq!(
            parse(&["truncate", "--table", "users"]),
            Commands::Truncate {
                table: Some("users".to_string())
            }
        );
        assert_eq!(parse(&["truncate"]), Commands::Truncate { table: None });
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["killrvideo", "migrate"]).is_err());
    }
}
