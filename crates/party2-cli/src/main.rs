//! Party 2 CLI
//!
//! Command-line interface for the Party 2 side of two-party Ed25519:
//! - Key generation with a Party 1 service
//! - Signing a message digest
//! - Showing and checking shares and signatures offline

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fs2::FileExt;
use party1_client::Party1Client;
use party2_core::codec::encode_scalar_hex;
use party2_core::{KeyShare, Party2, RemoteParty, Signature};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};

/// Party 2 - two-party Ed25519 client
#[derive(Parser)]
#[command(name = "party2")]
#[command(about = "Two-party Ed25519 signing client (Party 2)")]
#[command(version)]
struct Cli {
    /// Party 1 service URL
    #[arg(short = 'u', long, env = "PARTY1_URL", default_value = "http://127.0.0.1:8000")]
    party1_url: String,

    /// Data directory for key shares
    #[arg(short, long, env = "DEST", default_value = "./data")]
    dest: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "PARTY1_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key share with Party 1
    Keygen,

    /// Sign a message digest
    Sign {
        /// Share id
        #[arg(short, long)]
        id: String,

        /// Message digest to sign (hex encoded)
        #[arg(short, long)]
        message: String,
    },

    /// Verify a signature against a share's public key
    Verify {
        /// Share id
        #[arg(short, long)]
        id: String,

        /// Message digest that was signed (hex encoded)
        #[arg(short, long)]
        message: String,

        /// 64-byte signature (hex encoded)
        #[arg(short, long)]
        signature: String,
    },

    /// Show key share info
    Info {
        /// Share id
        #[arg(short, long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    // Ensure data directory exists
    std::fs::create_dir_all(&cli.dest)?;

    let client = Party1Client::new(&cli.party1_url)
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    let party = Party2::new(client);

    match cli.command {
        Commands::Keygen => {
            run_keygen(&cli, &party).await?;
        }
        Commands::Sign { ref id, ref message } => {
            run_sign(&cli, &party, id, message).await?;
        }
        Commands::Verify {
            ref id,
            ref message,
            ref signature,
        } => {
            run_verify(&cli, id, message, signature)?;
        }
        Commands::Info { ref id } => {
            show_info(&cli, id)?;
        }
    }

    Ok(())
}

async fn run_keygen<R: RemoteParty>(cli: &Cli, party: &Party2<R>) -> Result<KeyShare> {
    info!(party1 = party.remote().endpoint(), "Starting key generation");

    let share = party.generate_key().await?;

    // Save key share
    let path = share_path(cli, share.id());
    let json = serde_json::to_string_pretty(&share)?;
    std::fs::write(&path, json)?;

    info!(
        id = share.id(),
        public_key = hex::encode(share.public_key_bytes()),
        path = ?path,
        "Key generation completed, share saved"
    );

    println!("Share ID: {}", share.id());
    println!("Public Key: {}", hex::encode(share.public_key_bytes()));

    Ok(share)
}

async fn run_sign<R: RemoteParty>(
    cli: &Cli,
    party: &Party2<R>,
    id: &str,
    message: &str,
) -> Result<Signature> {
    let share = load_share(cli, id)?;
    let digest = hex::decode(message).context("message must be hex encoded")?;

    // Held until the signature is back; other `party2 sign` processes on this share wait
    let _lock = lock_share(cli, id).await?;
    info!(id, digest = message, "Starting signing");

    let signature = party.sign(&digest, &share).await?;

    println!("Signature:");
    println!("  R: {}", hex::encode(signature.r.as_bytes()));
    println!("  s: {}", encode_scalar_hex(&signature.s));
    println!("  Ed25519: {}", hex::encode(signature.to_bytes()));

    Ok(signature)
}

fn run_verify(cli: &Cli, id: &str, message: &str, signature: &str) -> Result<()> {
    let share = load_share(cli, id)?;
    let digest = hex::decode(message).context("message must be hex encoded")?;
    let bytes: [u8; 64] = hex::decode(signature)
        .context("signature must be hex encoded")?
        .try_into()
        .map_err(|_| anyhow::anyhow!("Signature must be 64 bytes"))?;

    let signature = parse_signature(&bytes)?;
    match signature.verify(&share.public_key(), &digest) {
        Ok(()) => {
            println!("Signature is valid");
            Ok(())
        }
        Err(e) => bail!("Signature is invalid: {}", e),
    }
}

fn parse_signature(bytes: &[u8; 64]) -> Result<Signature> {
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    Ok(Signature::new(
        party2_core::Point::from_bytes(r)?,
        party2_core::Scalar::from_le_bytes(s)?,
    ))
}

fn show_info(cli: &Cli, id: &str) -> Result<()> {
    let share = load_share(cli, id)?;

    println!("Key Share Info:");
    println!("  Share ID: {}", share.id());
    println!("  Public Key: {}", hex::encode(share.public_key_bytes()));
    println!(
        "  Party 2 Public Key: {}",
        hex::encode(share.key_pair().public_key().as_bytes())
    );

    Ok(())
}

fn share_path(cli: &Cli, id: &str) -> PathBuf {
    cli.dest.join(format!("keyshare.{}.json", id))
}

/// Exclusive advisory lock on `keyshare.<id>.lock`, released when the file drops
async fn lock_share(cli: &Cli, id: &str) -> Result<File> {
    let path = cli.dest.join(format!("keyshare.{}.lock", id));
    tokio::task::spawn_blocking(move || {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening lock file {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("locking {}", path.display()))?;
        Ok(file)
    })
    .await?
}

fn load_share(cli: &Cli, id: &str) -> Result<KeyShare> {
    let path = share_path(cli, id);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("reading key share {}", path.display()))?;
    let share: KeyShare = serde_json::from_str(&json)?;
    Ok(share)
}
