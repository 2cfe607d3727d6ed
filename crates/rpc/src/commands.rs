//! CLI commands
//!
//! Each command acts as the configured keypair. Organizations are addressed
//! by their authority identity; requests and invoices by org plus requester.

use claim_core::{Identity, Keypair, RecordKey, TokenAmount};
use claim_engine::{
    ClaimEvent, Fulfillment, InvoiceAccount, InvoiceStatus, OrgConfig, OrgInit, OrgUpdate,
    Reclamation, RandomnessRequest, Settlement, VendorAccount,
};
use claim_oracle::{ExtractionWorker, ManifestExtractor};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;

use crate::context::AppContext;

fn amount(value: Decimal) -> Result<TokenAmount, anyhow::Error> {
    Ok(TokenAmount::from_decimal(value)?)
}

/// Generate a keypair and write its seed to `output`
pub fn keygen(output: &Path) -> Result<Identity, anyhow::Error> {
    if output.exists() {
        anyhow::bail!("Refusing to overwrite existing key file {}", output.display());
    }
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let keypair = Keypair::generate();
    keypair.write_file(output)?;

    println!("✅ Generated keypair");
    println!("   Identity: {}", keypair.identity());
    println!("   Seed saved to {}", output.display());
    Ok(keypair.identity())
}

/// Create the caller's organization
pub async fn org_init(
    ctx: &AppContext,
    per_invoice_cap: Decimal,
    daily_cap: Decimal,
    audit_rate_bps: u16,
    oracle_signer: Option<Identity>,
) -> Result<RecordKey, anyhow::Error> {
    let params = OrgInit {
        authority: ctx.caller()?,
        oracle_signer,
        per_invoice_cap: amount(per_invoice_cap)?,
        daily_cap: amount(daily_cap)?,
        audit_rate_bps,
    };

    let org = ctx.engine.lock().await.init_org(params)?;
    println!("✅ Organization initialized: {}", org);
    Ok(org)
}

/// Update the caller's organization
pub async fn org_update(
    ctx: &AppContext,
    oracle_signer: Option<Identity>,
    per_invoice_cap: Option<Decimal>,
    daily_cap: Option<Decimal>,
    paused: Option<bool>,
    audit_rate_bps: Option<u16>,
) -> Result<OrgConfig, anyhow::Error> {
    let update = OrgUpdate {
        oracle_signer,
        per_invoice_cap: per_invoice_cap.map(amount).transpose()?,
        daily_cap: daily_cap.map(amount).transpose()?,
        paused,
        audit_rate_bps,
    };

    let caller = ctx.caller()?;
    let org = ctx.org_key(None)?;
    let config = ctx.engine.lock().await.update_org(&caller, &org, update)?;

    println!("✅ Organization updated (version {})", config.version);
    Ok(config)
}

/// Print an organization's configuration
pub async fn org_show(ctx: &AppContext, authority: Option<Identity>) -> Result<OrgConfig, anyhow::Error> {
    let org = ctx.org_key(authority)?;
    let config = ctx.engine.lock().await.org(&org)?;

    println!("Organization {}", org);
    println!("  Authority:       {}", config.authority);
    println!("  Oracle signer:   {}", config.oracle_signer);
    println!("  Per-invoice cap: {}", config.per_invoice_cap);
    println!("  Daily cap:       {}", config.daily_cap);
    println!("  Spent today:     {}", config.daily_spent);
    println!("  Audit rate:      {} bps", config.audit_rate_bps);
    println!("  Paused:          {}", config.paused);
    println!("  Invoices:        {}", config.invoice_counter);
    Ok(config)
}

/// Register a vendor with the caller's organization
pub async fn vendor_register(ctx: &AppContext, name: &str, payout: Identity) -> Result<RecordKey, anyhow::Error> {
    let caller = ctx.caller()?;
    let org = ctx.org_key(None)?;
    let key = ctx.engine.lock().await.register_vendor(&caller, &org, name, payout)?;

    println!("✅ Registered vendor '{}' -> {}", name, payout);
    Ok(key)
}

/// Activate or deactivate a vendor
pub async fn vendor_set_active(ctx: &AppContext, name: &str, active: bool) -> Result<VendorAccount, anyhow::Error> {
    let caller = ctx.caller()?;
    let org = ctx.org_key(None)?;
    let mut engine = ctx.engine.lock().await;
    let vendor = if active {
        engine.activate_vendor(&caller, &org, name)?
    } else {
        engine.deactivate_vendor(&caller, &org, name)?
    };

    println!(
        "✅ Vendor '{}' {}",
        name,
        if vendor.is_active { "activated" } else { "deactivated" }
    );
    Ok(vendor)
}

/// Change where a vendor is paid
pub async fn vendor_payout(ctx: &AppContext, name: &str, payout: Identity) -> Result<VendorAccount, anyhow::Error> {
    let caller = ctx.caller()?;
    let org = ctx.org_key(None)?;
    let vendor = ctx
        .engine
        .lock()
        .await
        .update_vendor_payout(&caller, &org, name, payout)?;

    println!("✅ Vendor '{}' now pays out to {}", name, vendor.payout_identity);
    Ok(vendor)
}

/// List an organization's vendors
pub async fn vendors(ctx: &AppContext, authority: Option<Identity>) -> Result<Vec<VendorAccount>, anyhow::Error> {
    let org = ctx.org_key(authority)?;
    let vendors = ctx.engine.lock().await.vendors(&org)?;

    if vendors.is_empty() {
        println!("No vendors registered");
    }
    for vendor in &vendors {
        println!(
            "  {:<24} {} paid={} {}",
            vendor.name,
            vendor.payout_identity,
            vendor.total_paid,
            if vendor.is_active { "active" } else { "inactive" }
        );
    }
    Ok(vendors)
}

/// Submit a document reference for extraction
pub async fn submit(
    ctx: &AppContext,
    org_authority: Identity,
    source_reference: &str,
    requested_amount: Option<Decimal>,
) -> Result<RecordKey, anyhow::Error> {
    let requester = ctx.caller()?;
    let org = RecordKey::org(&org_authority);
    let requested_amount = requested_amount.map(amount).transpose()?;

    let key = ctx
        .engine
        .lock()
        .await
        .submit_request(&org, &requester, source_reference, requested_amount)?;

    println!("✅ Request submitted: {}", key);
    Ok(key)
}

/// Fulfill a pending request as the oracle signer
pub async fn fulfill(
    ctx: &AppContext,
    org_authority: Identity,
    requester: Identity,
    vendor_name: &str,
    invoice_amount: Decimal,
    due_date: DateTime<Utc>,
    source_reference: Option<String>,
) -> Result<RecordKey, anyhow::Error> {
    let caller = ctx.caller()?;
    let org = RecordKey::org(&org_authority);
    let request_key = RecordKey::request(&org, &requester);

    let mut engine = ctx.engine.lock().await;
    let source_reference = match source_reference {
        Some(reference) => reference,
        None => engine.request(&request_key)?.source_reference,
    };

    let fulfillment = Fulfillment {
        vendor_name: vendor_name.to_string(),
        amount: amount(invoice_amount)?,
        due_date,
        source_reference,
    };
    let invoice = engine.fulfill_request(&caller, &request_key, fulfillment)?;

    println!("✅ Invoice created: {}", invoice);
    Ok(invoice)
}

/// List pending requests, optionally for one organization
pub async fn requests(
    ctx: &AppContext,
    org_authority: Option<Identity>,
) -> Result<Vec<RecordKey>, anyhow::Error> {
    let org = org_authority.map(|authority| RecordKey::org(&authority));
    let pending = ctx.engine.lock().await.pending_requests(org.as_ref())?;

    if pending.is_empty() {
        println!("No pending requests");
    }
    for (key, request) in &pending {
        println!("  {} {} {}", key, request.authority, request.source_reference);
    }
    Ok(pending.into_iter().map(|(key, _)| key).collect())
}

/// Ask the local randomness oracle to sample the caller's invoice
pub async fn sample(
    ctx: &AppContext,
    org_authority: Identity,
    client_seed: u8,
) -> Result<RandomnessRequest, anyhow::Error> {
    let payer = ctx.caller()?;
    let invoice = RecordKey::invoice(&RecordKey::org(&org_authority), &payer);
    let vrf = ctx.vrf()?;

    let request = ctx
        .engine
        .lock()
        .await
        .request_sample(&payer, &invoice, &vrf, client_seed)?;

    println!("✅ Randomness requested: {} (oracle {})", request.request_id, request.oracle);
    Ok(request)
}

/// Serve outstanding randomness requests with the local oracle key
pub async fn vrf_fulfill(ctx: &AppContext) -> Result<usize, anyhow::Error> {
    let vrf = ctx.vrf()?;
    let served = vrf.serve(&mut *ctx.engine.lock().await)?;

    println!("✅ Served {} randomness request(s)", served);
    Ok(served)
}

/// Approve or reject a sampled invoice
pub async fn audit(
    ctx: &AppContext,
    org_authority: Identity,
    requester: Identity,
    approve: bool,
) -> Result<InvoiceStatus, anyhow::Error> {
    let caller = ctx.caller()?;
    let invoice = RecordKey::invoice(&RecordKey::org(&org_authority), &requester);
    let status = ctx.engine.lock().await.audit_decide(&caller, &invoice, approve)?;

    println!("✅ Audit decided: {}", status);
    Ok(status)
}

/// Move the caller's invoice into escrow
pub async fn pay(ctx: &AppContext, org_authority: Identity) -> Result<InvoiceAccount, anyhow::Error> {
    let caller = ctx.caller()?;
    let invoice_key = RecordKey::invoice(&RecordKey::org(&org_authority), &caller);
    let invoice = ctx.engine.lock().await.process_payment(&caller, &invoice_key)?;

    println!("✅ {} escrowed for '{}'", invoice.amount, invoice.vendor_name);
    Ok(invoice)
}

/// Release the caller's escrowed invoice to the vendor
pub async fn settle(ctx: &AppContext, org_authority: Identity) -> Result<Settlement, anyhow::Error> {
    let caller = ctx.caller()?;
    let invoice_key = RecordKey::invoice(&RecordKey::org(&org_authority), &caller);
    let disbursement = ctx.disbursement()?;
    let settlement = ctx
        .engine
        .lock()
        .await
        .settle(&caller, &invoice_key, &disbursement)?;

    println!(
        "✅ Paid {} to {} (ref: {})",
        settlement.amount, settlement.payout_identity, settlement.reference
    );
    Ok(settlement)
}

/// Print an invoice
pub async fn show(
    ctx: &AppContext,
    org_authority: Identity,
    requester: Option<Identity>,
) -> Result<InvoiceAccount, anyhow::Error> {
    let requester = match requester {
        Some(requester) => requester,
        None => ctx.caller()?,
    };
    let key = RecordKey::invoice(&RecordKey::org(&org_authority), &requester);
    let invoice = ctx.engine.lock().await.invoice(&key)?;

    println!("Invoice {}", key);
    println!("  Vendor:    {}", invoice.vendor_name);
    println!("  Amount:    {}", invoice.amount);
    println!("  Due:       {}", invoice.due_date.to_rfc3339());
    println!("  Reference: {}", invoice.source_reference);
    println!("  Status:    {}", invoice.status);
    Ok(invoice)
}

/// Close the caller's invoice and reclaim its allocation
pub async fn close_invoice(ctx: &AppContext, org_authority: Identity) -> Result<Reclamation, anyhow::Error> {
    let caller = ctx.caller()?;
    let key = RecordKey::invoice(&RecordKey::org(&org_authority), &caller);
    let reclamation = ctx.engine.lock().await.close_invoice(&caller, &key)?;

    println!("✅ Invoice closed, {} bytes reclaimed", reclamation.allocation);
    Ok(reclamation)
}

/// Close the caller's request and reclaim its allocation
pub async fn close_request(ctx: &AppContext, org_authority: Identity) -> Result<Reclamation, anyhow::Error> {
    let caller = ctx.caller()?;
    let key = RecordKey::request(&RecordKey::org(&org_authority), &caller);
    let reclamation = ctx.engine.lock().await.close_request(&caller, &key)?;

    println!("✅ Request closed, {} bytes reclaimed", reclamation.allocation);
    Ok(reclamation)
}

/// Run the extraction worker against a manifest.
///
/// With `once`, polls a single time; otherwise polls until Ctrl-C.
pub async fn oracle_run(ctx: &AppContext, manifest: &Path, once: bool) -> Result<usize, anyhow::Error> {
    let signer = ctx.caller()?;
    let extractor = ManifestExtractor::from_file(manifest)?;
    tracing::info!(entries = extractor.len(), manifest = %manifest.display(), "manifest loaded");

    let worker = ExtractionWorker::new(
        ctx.engine.clone(),
        Arc::new(extractor),
        signer,
        ctx.config.worker.clone(),
    )
    .with_vrf(Arc::new(ctx.vrf()?));

    if once {
        let processed = worker.run_once().await?;
        println!("✅ Processed {} item(s)", processed);
        return Ok(processed);
    }

    println!("Oracle worker running as {} (Ctrl-C to stop)", signer);
    worker
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;
    println!("✅ Oracle worker stopped");
    Ok(0)
}

/// Print the most recent journal events
pub async fn history(ctx: &AppContext, limit: usize) -> Result<Vec<ClaimEvent>, anyhow::Error> {
    let events = ctx.engine.lock().await.history(limit)?;

    if events.is_empty() {
        println!("No events recorded");
    }
    for event in &events {
        println!(
            "  {} {}",
            event.timestamp().format("%Y-%m-%d %H:%M:%S"),
            serde_json::to_string(event)?
        );
    }
    Ok(events)
}
