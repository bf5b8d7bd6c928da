//! Keystone CLI
//!
//! Resolves signing identities from workload identity agents and local key
//! files, and signs artifacts into DSSE envelopes.
//!
//! # Usage
//!
//! ```bash
//! # Sign with a local key and certificate chain
//! keystone sign --infile build.json --key key.pem --certificate cert.pem \
//!     --intermediates intermediate.pem --outfile build.dsse.json
//!
//! # Sign with a workload identity
//! keystone sign --infile build.json --workload-socket unix:///run/spire/agent.sock
//!
//! # Inspect which signers resolve, without signing
//! keystone signers --key key.pem --workload-socket /run/spire/agent.sock
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use keystone_core::signer::chain;
use keystone_core::{resolve_output_sink, KeystoneError, ResolutionResult, SignerResolver};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod envelope;

use config::{CliConfig, SignerOverrides};

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "Resolve signing identities and sign build artifacts")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Credential source flags shared by every command.
#[derive(Args, Debug, Default)]
struct SignerArgs {
    /// Workload attestation agent socket (path or unix:// URI)
    #[arg(long)]
    workload_socket: Option<String>,

    /// Path to a PEM private key
    #[arg(short, long)]
    key: Option<String>,

    /// Path to the PEM certificate for the key
    #[arg(long)]
    certificate: Option<String>,

    /// Path to a PEM intermediate certificate (repeatable)
    #[arg(long = "intermediates")]
    intermediates: Vec<String>,

    /// Workload agent timeout in seconds
    #[arg(long)]
    workload_timeout: Option<u64>,
}

impl From<SignerArgs> for SignerOverrides {
    fn from(args: SignerArgs) -> Self {
        Self {
            workload_socket: args.workload_socket,
            key: args.key,
            certificate: args.certificate,
            intermediates: args.intermediates,
            timeout_secs: args.workload_timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a file into a DSSE envelope with every resolved signer
    Sign {
        /// File to sign
        #[arg(short, long)]
        infile: PathBuf,

        /// Where to write the envelope (standard output if omitted)
        #[arg(short, long)]
        outfile: Option<String>,

        /// DSSE payload type
        #[arg(long, default_value = envelope::DEFAULT_PAYLOAD_TYPE)]
        payload_type: String,

        #[command(flatten)]
        signer: SignerArgs,
    },

    /// List the signers that resolve from the configured sources
    Signers {
        #[command(flatten)]
        signer: SignerArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    init_logging(config.log_level(&cli.log_level));

    if let Some(path) = &config.config_path {
        info!("Loaded configuration from {:?}", path);
    }

    match cli.command {
        Commands::Sign {
            infile,
            outfile,
            payload_type,
            signer,
        } => sign(&config, signer.into(), &infile, &outfile, &payload_type).await,
        Commands::Signers { signer } => list_signers(&config, signer.into()).await,
    }
}

/// Logs go to stderr so stdout stays free for artifacts.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn resolve(config: &CliConfig, overrides: &SignerOverrides) -> ResolutionResult {
    let credentials = config.credentials(overrides);
    SignerResolver::with_workload_timeout(config.workload_timeout(overrides))
        .resolve(&credentials)
        .await
}

async fn sign(
    config: &CliConfig,
    overrides: SignerOverrides,
    infile: &Path,
    outfile: &Option<String>,
    payload_type: &str,
) -> Result<()> {
    let payload = tokio::fs::read(infile)
        .await
        .with_context(|| format!("Failed to read input file {:?}", infile))?;

    let (signers, errors) = resolve(config, &overrides).await.into_parts();
    for error in &errors {
        warn!("{}", error);
    }
    if signers.is_empty() {
        return Err(KeystoneError::no_signers(&errors).into());
    }

    let envelope = envelope::sign_envelope(payload_type, &payload, &signers)?;

    let mut out = resolve_output_sink(config.outfile(outfile))?;
    serde_json::to_writer_pretty(&mut out, &envelope).context("Failed to write envelope")?;
    writeln!(out).context("Failed to write envelope")?;
    out.finish().context("Failed to flush output")?;

    info!(
        "Signed {:?} with {} signer(s)",
        infile,
        envelope.signatures.len()
    );
    Ok(())
}

async fn list_signers(config: &CliConfig, overrides: SignerOverrides) -> Result<()> {
    let result = resolve(config, &overrides).await;

    if result.signers.is_empty() && result.errors.is_empty() {
        println!("No credential sources configured");
        return Ok(());
    }

    for signer in &result.signers {
        let subject = signer
            .certificate()
            .map(chain::subject)
            .unwrap_or_else(|| "-".to_string());
        let expiry = signer
            .not_after()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  subject={}  not_after={}",
            signer.key_id(),
            signer.algorithm(),
            subject,
            expiry
        );
    }

    for error in &result.errors {
        println!("error  {}", error);
    }

    Ok(())
}
