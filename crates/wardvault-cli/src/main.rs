mod backup;
mod cli;
mod config;
mod records;
mod storage;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wardvault_core::store::RecordStore;

use crate::cli::{Command, ConfigCommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command.unwrap_or(Command::List) {
        Command::List => {
            let store = storage::unlock_store(&config, &resolve_pin(cli.pin)?)?;
            records::list(&store).await?;
        }
        Command::Note { id, text } => {
            let store = storage::unlock_store(&config, &resolve_pin(cli.pin)?)?;
            records::set_note(&store, &id, &text).await?;
        }
        Command::ChangePin { new_pin } => {
            let store = storage::unlock_store(&config, &resolve_pin(cli.pin)?)?;
            store
                .change_pin(&new_pin)
                .await
                .map_err(storage::friendly_error)?;
            println!("PIN changed; all records re-encrypted.");
        }
        Command::Export { file } => {
            let store = storage::unlock_store(&config, &resolve_pin(cli.pin)?)?;
            backup::export(&store, &file).await?;
        }
        Command::Import { file } => {
            let store = storage::unlock_store(&config, &resolve_pin(cli.pin)?)?;
            backup::import(&store, &file).await?;
        }
        Command::Reset { yes } => run_reset(&config, cli.pin, yes).await?,
        Command::Health => run_health_check(&config, cli.pin).await?,
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// The PIN comes from `--pin` or the WARDVAULT_PIN environment variable.
fn resolve_pin(flag: Option<String>) -> Result<String> {
    flag.or_else(|| std::env::var("WARDVAULT_PIN").ok())
        .ok_or_else(|| color_eyre::eyre::eyre!("a PIN is required (--pin or WARDVAULT_PIN)"))
}

/// Delete the whole database, salt included. Opening the store never verifies
/// the PIN, so this works as the forgot-PIN escape hatch: any PIN (or none)
/// unlocks a handle good enough to destroy.
async fn run_reset(config: &config::Config, pin: Option<String>, yes: bool) -> Result<()> {
    if !yes {
        color_eyre::eyre::bail!("reset is irreversible; pass --yes to confirm");
    }
    let pin = pin
        .or_else(|| std::env::var("WARDVAULT_PIN").ok())
        .unwrap_or_default();
    let store = storage::unlock_store(config, &pin)?;
    store.reset().await.map_err(storage::friendly_error)?;
    println!("Store deleted. The next unlock starts fresh.");
    Ok(())
}

/// Unlock and decrypt the full record set, reporting counts.
async fn run_health_check(config: &config::Config, pin: Option<String>) -> Result<()> {
    let store = storage::unlock_store(config, &resolve_pin(pin)?)?;
    let records = store.all_records().await.map_err(storage::friendly_error)?;
    println!("Storage: ok ({} records decrypted)", records.len());
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
