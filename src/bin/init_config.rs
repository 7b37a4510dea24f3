//! init-config – create a default configuration file and empty key files for the Odyssey runner
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use odyssey::config::Config;
use odyssey::utils::init_logging;
use odyssey::wallet::create_key_file_skeletons;

#[derive(Parser, Debug)]
#[command(
    name    = "init-config",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Write a default `config.toml` for the Sonic Odyssey runner"
)]
struct Args {
    /// Output path (default: ./config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overwrite if the file already exists
    #[arg(short, long)]
    force: bool,
}

fn main() -> Result<()> {
    init_logging("info");
    let args = Args::parse();

    if args.config.exists() && !args.force {
        eprintln!(
            "Config file {} exists. Use --force to overwrite.",
            args.config.display()
        );
        std::process::exit(1);
    }

    let config = Config::default();
    config.save(&args.config)?;
    println!("✅ Wrote default configuration to {}", args.config.display());

    for path in create_key_file_skeletons(&config.wallet)? {
        println!("✅ Created empty {}", path.display());
    }
    println!(
        "   Put base58 private keys in {} or seed phrases in {} and run `odyssey derive`",
        config.wallet.private_keys_path, config.wallet.mnemonics_path
    );
    Ok(())
}
