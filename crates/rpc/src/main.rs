//! InvoiceClaim CLI
//!
//! Usage: claim [--data ./data] [--keypair key.hex] <COMMAND>

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use claim_core::{Identity, Keypair};
use claim_rpc::{commands, AppConfig, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "claim")]
#[command(about = "Invoice claim workflow with randomized audits and spend caps", long_about = None)]
struct Cli {
    /// Data directory
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// JSON configuration file (engine and worker settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Key file holding the operator's hex seed
    #[arg(short, long, env = "CLAIM_KEYPAIR")]
    keypair: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a keypair and write its seed to a file
    Keygen {
        /// Output file for the seed
        #[arg(short, long, default_value = "./claim.key")]
        output: PathBuf,
    },

    /// Create the operator's organization
    OrgInit {
        /// Largest single invoice, in tokens
        #[arg(long)]
        per_invoice_cap: Decimal,
        /// Total payments per day, in tokens
        #[arg(long)]
        daily_cap: Decimal,
        /// Audit sampling rate in basis points (0-10000)
        #[arg(long, default_value = "500")]
        audit_rate_bps: u16,
        /// Extraction oracle signer (defaults to the operator)
        #[arg(long)]
        oracle_signer: Option<Identity>,
    },

    /// Update the operator's organization
    OrgUpdate {
        #[arg(long)]
        oracle_signer: Option<Identity>,
        #[arg(long)]
        per_invoice_cap: Option<Decimal>,
        #[arg(long)]
        daily_cap: Option<Decimal>,
        #[arg(long)]
        paused: Option<bool>,
        #[arg(long)]
        audit_rate_bps: Option<u16>,
    },

    /// Show an organization (defaults to the operator's)
    OrgShow {
        #[arg(long)]
        org: Option<Identity>,
    },

    /// Register a vendor
    VendorRegister {
        name: String,
        /// Identity that receives payouts
        payout: Identity,
    },

    /// Re-activate a vendor
    VendorActivate { name: String },

    /// Deactivate a vendor
    VendorDeactivate { name: String },

    /// Change a vendor's payout identity
    VendorPayout { name: String, payout: Identity },

    /// List vendors (defaults to the operator's organization)
    Vendors {
        #[arg(long)]
        org: Option<Identity>,
    },

    /// Submit a document reference for extraction
    Submit {
        /// Organization authority
        #[arg(long)]
        org: Identity,
        /// Source document reference
        reference: String,
        /// Amount the requester expects, in tokens
        #[arg(long)]
        amount: Option<Decimal>,
    },

    /// Fulfill a pending request (oracle signer)
    Fulfill {
        #[arg(long)]
        org: Identity,
        /// Requester whose request is fulfilled
        requester: Identity,
        #[arg(long)]
        vendor: String,
        /// Invoice amount in tokens
        #[arg(long)]
        amount: Decimal,
        /// Due date (RFC 3339)
        #[arg(long)]
        due_date: DateTime<Utc>,
        /// Source reference (defaults to the request's)
        #[arg(long)]
        reference: Option<String>,
    },

    /// List pending requests
    Requests {
        #[arg(long)]
        org: Option<Identity>,
    },

    /// Request audit sampling for the operator's invoice
    Sample {
        #[arg(long)]
        org: Identity,
        #[arg(long, default_value = "0")]
        client_seed: u8,
    },

    /// Serve outstanding randomness requests with the local oracle key
    VrfFulfill,

    /// Decide a sampled invoice (authority or oracle signer)
    Audit {
        #[arg(long)]
        org: Identity,
        requester: Identity,
        /// Reject instead of approve
        #[arg(long)]
        reject: bool,
    },

    /// Escrow payment for the operator's invoice
    Pay {
        #[arg(long)]
        org: Identity,
    },

    /// Release the operator's escrowed invoice to the vendor
    Settle {
        #[arg(long)]
        org: Identity,
    },

    /// Show an invoice (defaults to the operator's)
    Show {
        #[arg(long)]
        org: Identity,
        #[arg(long)]
        requester: Option<Identity>,
    },

    /// Close the operator's invoice
    CloseInvoice {
        #[arg(long)]
        org: Identity,
    },

    /// Close the operator's request
    CloseRequest {
        #[arg(long)]
        org: Identity,
    },

    /// Run the extraction oracle against a manifest file
    OracleRun {
        /// JSON manifest keyed by source reference
        #[arg(short, long)]
        manifest: PathBuf,
        /// Poll once and exit
        #[arg(long)]
        once: bool,
    },

    /// Show recent journal events
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Commands::Keygen { output } = &cli.command {
        commands::keygen(output)?;
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let keypair = cli.keypair.as_ref().map(Keypair::read_file).transpose()?;
    let ctx = AppContext::new(&cli.data, config, keypair).await?;

    match cli.command {
        Commands::Keygen { .. } => {}
        Commands::OrgInit {
            per_invoice_cap,
            daily_cap,
            audit_rate_bps,
            oracle_signer,
        } => {
            commands::org_init(&ctx, per_invoice_cap, daily_cap, audit_rate_bps, oracle_signer).await?;
        }
        Commands::OrgUpdate {
            oracle_signer,
            per_invoice_cap,
            daily_cap,
            paused,
            audit_rate_bps,
        } => {
            commands::org_update(&ctx, oracle_signer, per_invoice_cap, daily_cap, paused, audit_rate_bps).await?;
        }
        Commands::OrgShow { org } => {
            commands::org_show(&ctx, org).await?;
        }
        Commands::VendorRegister { name, payout } => {
            commands::vendor_register(&ctx, &name, payout).await?;
        }
        Commands::VendorActivate { name } => {
            commands::vendor_set_active(&ctx, &name, true).await?;
        }
        Commands::VendorDeactivate { name } => {
            commands::vendor_set_active(&ctx, &name, false).await?;
        }
        Commands::VendorPayout { name, payout } => {
            commands::vendor_payout(&ctx, &name, payout).await?;
        }
        Commands::Vendors { org } => {
            commands::vendors(&ctx, org).await?;
        }
        Commands::Submit { org, reference, amount } => {
            commands::submit(&ctx, org, &reference, amount).await?;
        }
        Commands::Fulfill {
            org,
            requester,
            vendor,
            amount,
            due_date,
            reference,
        } => {
            commands::fulfill(&ctx, org, requester, &vendor, amount, due_date, reference).await?;
        }
        Commands::Requests { org } => {
            commands::requests(&ctx, org).await?;
        }
        Commands::Sample { org, client_seed } => {
            commands::sample(&ctx, org, client_seed).await?;
        }
        Commands::VrfFulfill => {
            commands::vrf_fulfill(&ctx).await?;
        }
        Commands::Audit { org, requester, reject } => {
            commands::audit(&ctx, org, requester, !reject).await?;
        }
        Commands::Pay { org } => {
            commands::pay(&ctx, org).await?;
        }
        Commands::Settle { org } => {
            commands::settle(&ctx, org).await?;
        }
        Commands::Show { org, requester } => {
            commands::show(&ctx, org, requester).await?;
        }
        Commands::CloseInvoice { org } => {
            commands::close_invoice(&ctx, org).await?;
        }
        Commands::CloseRequest { org } => {
            commands::close_request(&ctx, org).await?;
        }
        Commands::OracleRun { manifest, once } => {
            commands::oracle_run(&ctx, &manifest, once).await?;
        }
        Commands::History { limit } => {
            commands::history(&ctx, limit).await?;
        }
    }

    Ok(())
}
