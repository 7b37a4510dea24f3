//! odyssey – run the Sonic Odyssey daily tasks for every configured wallet

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::signature::{Keypair, Signer};

use odyssey::api::{login, OdysseyApi, OdysseyClient};
use odyssey::blockchain::{SolanaLedger, TransactionSubmitter};
use odyssey::config::Config;
use odyssey::utils::init_logging;
use odyssey::{wallet, DailyRunner, TaskRunner};

#[derive(Debug, Parser)]
#[command(name = "odyssey", author, version, about = "Sonic Odyssey daily task runner", long_about = None)]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Command to execute (default: run)
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daily tasks for every wallet in the key file
    Run {
        /// Key file overriding `wallet.private_keys_path`
        #[arg(long, value_name = "JSON")]
        keys: Option<PathBuf>,
    },
    /// Derive wallets from a seed phrase and write them to the key file
    Derive {
        /// Mnemonic file overriding `wallet.mnemonics_path`
        #[arg(long, value_name = "JSON")]
        mnemonics: Option<PathBuf>,
        /// Output key file overriding `wallet.private_keys_path`
        #[arg(short, long, value_name = "JSON")]
        output: Option<PathBuf>,
        /// Number of wallets to derive
        #[arg(short = 'n', long)]
        count: Option<u32>,
        /// Which phrase of the mnemonic file to use
        #[arg(long, default_value_t = 0)]
        phrase_index: usize,
        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },
    /// Log in and print each wallet's balance, rings and boxes
    Accounts {
        /// Key file overriding `wallet.private_keys_path`
        #[arg(long, value_name = "JSON")]
        keys: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml());
        return Ok(());
    }

    let config = match &args.config {
        | Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        | None => Config::load().context("Failed to load configuration")?,
    };
    config.validate().context("Invalid configuration")?;

    let level = if args.debug { "debug" } else { config.app.log_level.as_str() };
    init_logging(level);

    match args.command.unwrap_or(Command::Run { keys: None }) {
        | Command::Run { keys } => run(&config, keys.as_deref()).await,
        | Command::Derive { mnemonics, output, count, phrase_index, force } => {
            derive(&config, mnemonics.as_deref(), output.as_deref(), count, phrase_index, force)
        }
        | Command::Accounts { keys } => accounts(&config, keys.as_deref()).await,
    }
}

fn keys_path<'a>(config: &'a Config, keys: Option<&'a Path>) -> &'a Path {
    keys.unwrap_or_else(|| Path::new(&config.wallet.private_keys_path))
}

fn load_wallets(config: &Config, keys: Option<&Path>) -> Result<Vec<Keypair>> {
    let path = keys_path(config, keys);
    let keypairs = wallet::load_keypairs(path)
        .with_context(|| format!("Failed to load private keys from {}", path.display()))?;
    if keypairs.is_empty() {
        bail!("No private keys found in {}", path.display());
    }
    log::info!("Loaded {} wallets from {}", keypairs.len(), path.display());
    Ok(keypairs)
}

async fn run(config: &Config, keys: Option<&Path>) -> Result<()> {
    let keypairs = load_wallets(config, keys)?;

    let api = OdysseyClient::new(&config.api)?;
    let ledger = SolanaLedger::new(&config.solana)?;
    let submitter = TransactionSubmitter::new(
        ledger,
        config.retry.submit,
        Duration::from_millis(config.solana.confirm_poll_ms),
    );
    let runner = DailyRunner::new(TaskRunner::new(api, submitter, config));

    log::info!("🚀 Starting daily tasks for {} wallets", keypairs.len());
    let summary = runner.run(&keypairs).await;
    summary.log_summary();
    Ok(())
}

fn derive(
    config: &Config, mnemonics: Option<&Path>, output: Option<&Path>, count: Option<u32>,
    phrase_index: usize, force: bool,
) -> Result<()> {
    let mnemonics_path = mnemonics.unwrap_or_else(|| Path::new(&config.wallet.mnemonics_path));
    let output = keys_path(config, output);

    if output.exists() && !force {
        bail!("Key file {} exists. Use --force to overwrite.", output.display());
    }

    let phrases = wallet::load_mnemonics(mnemonics_path)
        .with_context(|| format!("Failed to load mnemonics from {}", mnemonics_path.display()))?;
    let phrase = phrases.get(phrase_index).with_context(|| {
        format!("{} holds {} phrases, no index {}", mnemonics_path.display(), phrases.len(), phrase_index)
    })?;

    let count = count.unwrap_or(config.wallet.derive_count);
    let keypairs = wallet::derive_keypairs(phrase, &config.wallet.passphrase, count)?;
    wallet::save_secret_keys(output, &keypairs)?;

    println!("✅ Wrote {} derived wallets to {}", keypairs.len(), output.display());
    if let Some(first) = keypairs.first() {
        println!("   first address: {}", first.pubkey());
    }
    Ok(())
}

async fn accounts(config: &Config, keys: Option<&Path>) -> Result<()> {
    let keypairs = load_wallets(config, keys)?;
    let api = OdysseyClient::new(&config.api)?;

    for (i, keypair) in keypairs.iter().enumerate() {
        let address = keypair.pubkey();
        let info = match login(&api, keypair).await {
            | Ok(token) => api.account_info(&token).await,
            | Err(e) => Err(e),
        };
        match info {
            | Ok(info) => println!(
                "#{:<3} {} | {:.4} SOL | {} rings | {} boxes",
                i + 1,
                address,
                info.balance_sol(),
                info.points,
                info.boxes
            ),
            | Err(e) => println!("#{:<3} {} | error: {}", i + 1, address, e),
        }
        config.pacing.step.sleep().await;
    }
    Ok(())
}
