use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ssi_keys_core::config::Config;
use ssi_keys_core::core_identity::{
    format_timestamp, DidMethod, EnvFileKeystore, PemKeyFiles, Provisioner, SsiKeys, Verifier,
    TEST_MESSAGE,
};
use ssi_keys_core::logging::{init_logging_with_config, LogConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Characters of the signature shown by `verify`
const SIGNATURE_PREVIEW_LEN: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "ssi-keys")]
#[command(author, version, about = "Provision and verify the MediChain SSI signing key", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding ssi_private.pem / ssi_public.pem
    #[arg(long, global = true)]
    key_dir: Option<PathBuf>,

    /// Key-value store receiving the SSI_* fields
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new keypair and store it (rotates any existing key)
    Provision,

    /// Check that the stored keys sign and verify
    Verify,

    /// Sign a message with the stored key
    Sign {
        message: String,
    },

    /// Check a base64 signature over a message
    Check {
        message: String,
        signature: String,
    },

    /// Print the DID document for the stored key
    Did {
        /// DID method: key, web, or any other method name
        #[arg(short, long, default_value = "key")]
        method: DidMethod,
    },

    /// Print the stored key's id, algorithm and public key
    Show,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let vars: HashMap<String, String> = std::env::vars().collect();
    config.apply_overrides(&vars)?;

    if let Some(dir) = &args.key_dir {
        config.keys.key_dir = dir.clone();
    }
    if let Some(file) = &args.env_file {
        config.keys.env_file = file.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.to_ascii_lowercase();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::from_settings(&config.logging)?)?;

    debug!(?config, "Resolved configuration");

    match args.command {
        Command::Provision => provision(&config),
        Command::Verify => verify(&config),
        Command::Sign { message } => {
            let keys = SsiKeys::load(&config)?;
            println!("{}", keys.sign_data(message.as_bytes()));
            Ok(())
        }
        Command::Check { message, signature } => {
            let keys = SsiKeys::load(&config)?;
            let valid = keys.verify_signature(message.as_bytes(), &signature);
            println!("{}", if valid { "valid" } else { "invalid" });
            Ok(())
        }
        Command::Did { method } => {
            let keys = SsiKeys::load(&config)?;
            let document = keys.export_did_document(&method)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        Command::Show => show(&config),
    }
}

fn provision(config: &Config) -> Result<()> {
    println!("Generating SSI keys (Ed25519)...");

    let keystore = EnvFileKeystore::open(&config.keys.env_file)?;
    let pem_files = PemKeyFiles::new(&config.keys.key_dir);
    let record = Provisioner::new(pem_files.clone(), &keystore).provision()?;

    println!("  wrote {}", pem_files.private_key_path().display());
    println!("  wrote {}", pem_files.public_key_path().display());
    println!("  updated {}", keystore.path().display());
    println!();
    println!("SSI keys generated successfully");
    println!("  Key ID:    {}", record.key_id());
    println!("  Key type:  {}", record.algorithm());
    println!("  Key dir:   {}", pem_files.key_dir().display());
    println!();
    println!("Keep {} secret and out of version control.", pem_files.private_key_path().display());

    info!(key_id = %record.key_id(), "Provisioning finished");
    Ok(())
}

fn verify(config: &Config) -> Result<()> {
    println!("Testing SSI keys...");

    let keystore = EnvFileKeystore::open(&config.keys.env_file)?;
    let result = Verifier::new(&keystore).verify()?;

    let preview: String = result
        .signature_base64
        .chars()
        .take(SIGNATURE_PREVIEW_LEN)
        .collect();

    println!("  Key ID:     {}", result.key_id);
    println!("  Message:    {}", TEST_MESSAGE);
    println!("  Signature:  {}...", preview);
    println!();
    if result.ok {
        println!("PASS: {}", result.detail);
    } else {
        println!("FAIL: {}", result.detail);
    }
    Ok(())
}

fn show(config: &Config) -> Result<()> {
    let keys = SsiKeys::load(config)?;
    let generated = keys
        .generated_at()
        .map(format_timestamp)
        .unwrap_or_else(|| "unknown".to_string());

    println!("Key ID:        {}", keys.key_id());
    println!("Algorithm:     {}", keys.algorithm());
    println!("Generated at:  {}", generated);
    println!("Source:        {:?}", keys.source());
    println!();
    print!("{}", keys.public_key_pem()?);
    Ok(())
}
