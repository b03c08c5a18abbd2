//! rookvault CLI: drives the block-store adapter against a running Transfer Service.
//!
//! Connection settings come from flags or ROOK_REST_API_URL, BACKUP_BUCKET, BACKUP_REGION and
//! BACKUP_PREFIX.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rookvault_blockstore::metadata::read_volume;
use rookvault_blockstore::{BlockStore, RookBlockStore};
use rookvault_cli::{adapter_config, init_tracing};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "rookvault", about = "Snapshot and restore cluster volumes through cold storage")]
struct Cli {
    /// Transfer Service base URL
    #[arg(long, env = "ROOK_REST_API_URL", default_value = "http://localhost:9080")]
    url: String,
    #[arg(long, env = "BACKUP_BUCKET")]
    bucket: Option<String>,
    #[arg(long, env = "BACKUP_REGION")]
    region: Option<String>,
    #[arg(long, env = "BACKUP_PREFIX")]
    prefix: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot operations
    Snapshot {
        #[command(subcommand)]
        sub: SnapshotCommands,
    },
    /// Restore a snapshot into its pool and image
    Restore {
        /// Snapshot ID (`pool||image||tag`)
        snapshot_id: String,
    },
    /// Print the volume ID recorded in a persisted volume metadata file
    VolumeId {
        /// JSON file with the volume metadata
        metadata: std::path::PathBuf,
    },
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// Export a volume and upload it; prints the snapshot ID
    Create {
        /// Volume ID (`pool||image`)
        volume_id: String,
    },
    /// Delete a snapshot from cold storage
    Delete {
        /// Snapshot ID (`pool||image||tag`)
        snapshot_id: String,
    },
    /// List stored snapshots of a volume
    List {
        /// Volume ID (`pool||image`)
        volume_id: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn connect(cli: &Cli) -> anyhow::Result<RookBlockStore> {
    let config = adapter_config(
        &cli.url,
        cli.bucket.as_deref().unwrap_or_default(),
        cli.region.as_deref().unwrap_or_default(),
        cli.prefix.as_deref(),
    );

    let mut store = RookBlockStore::new();
    store
        .init(&config)
        .await
        .context("Failed to initialize block store. Set BACKUP_BUCKET and BACKUP_REGION")?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Snapshot { sub } => {
            let store = connect(&cli).await?;
            match sub {
                SnapshotCommands::Create { volume_id } => {
                    let snapshot_id = store
                        .create_snapshot(volume_id, "", &HashMap::new())
                        .await?;
                    print_json(&serde_json::json!({ "snapshot_id": snapshot_id }))?;
                }
                SnapshotCommands::Delete { snapshot_id } => {
                    store.delete_snapshot(snapshot_id).await?;
                    print_json(&serde_json::json!({ "deleted": snapshot_id }))?;
                }
                SnapshotCommands::List { volume_id } => {
                    let volume = rookvault_core::decode_volume_id(volume_id)?;
                    let filters = HashMap::from([
                        ("pool".to_string(), volume.pool),
                        ("image".to_string(), volume.image),
                    ]);
                    let snapshots = store.list_snapshots(&filters).await?;
                    print_json(&snapshots)?;
                }
            }
        }
        Commands::Restore { snapshot_id } => {
            let store = connect(&cli).await?;
            let volume_id = store
                .create_volume_from_snapshot(snapshot_id, rookvault_blockstore::VOLUME_TYPE, "", None)
                .await?;
            print_json(&serde_json::json!({ "volume_id": volume_id }))?;
        }
        Commands::VolumeId { metadata } => {
            let raw = std::fs::read_to_string(metadata)
                .with_context(|| format!("Failed to read {}", metadata.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Volume metadata is not valid JSON")?;
            let volume_id = read_volume(&value)?.map(|volume| volume.to_string());
            print_json(&serde_json::json!({ "volume_id": volume_id }))?;
        }
    }

    Ok(())
}
