use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use gated_release::{
    config::{parse_attributes, ProtocolConfig},
    logging::init_tracing,
    orchestrator::{run_gatekeeper, run_issuer, run_local, run_requester},
};
use structopt::StructOpt;
use tracing::debug;

#[derive(Clone, Debug, StructOpt)]
#[structopt(name = "gated-release", about = "Proof-gated release of a threshold-shared secret")]
struct Cli {
    /// Configuration file location
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[structopt(long)]
    log_level: Option<String>,

    #[structopt(subcommand)]
    role: Role,
}

#[derive(Clone, Debug, StructOpt)]
enum Role {
    /// Garble the circuits, deal the secret and hand out labels
    Issuer,
    /// Hold the identity keys and gate reencryption on proofs
    Gatekeeper,
    /// Request the secret with an attribute vector such as `1,0`
    Requester {
        #[structopt(long)]
        attributes: String,
    },
    /// Run all three roles in this process
    Local {
        #[structopt(long)]
        attributes: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::from_args();

    let mut config =
        ProtocolConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_tracing(&config.logging).map_err(|e| anyhow!("failed to set up tracing: {e}"))?;
    debug!(?config, "config loaded");

    match cli.role {
        Role::Issuer => run_issuer(&config)?,
        Role::Gatekeeper => run_gatekeeper(&config)?,
        Role::Requester { attributes } => {
            let secret = run_requester(&config, &parse_attributes(&attributes)?)?;
            println!("secret: {}", secret.to_hex());
        }
        Role::Local { attributes } => {
            let outcome = run_local(&config, &parse_attributes(&attributes)?)?;
            for report in outcome.audits.iter() {
                println!("{}", report.render());
            }
            match outcome.result {
                Ok(secret) => {
                    println!("secret: {}", secret.to_hex());
                    let matches = outcome.issuer_secret == Some(secret);
                    println!("matches dealer secret: {}", matches);
                }
                Err(e) => println!("release failed: {}", e),
            }
        }
    }
    Ok(())
}
