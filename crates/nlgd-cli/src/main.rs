use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use nlgd_core::document::ContractOptions;
use nlgd_core::pricing::{self, format_currency, DocumentTotals};
use nlgd_core::{
    builtin_catalog, filter_catalog, new_id, CatalogType, ClientInfo, Contract, Estimate,
    EstimateStatus, Invoice, Payment, PaymentMethod,
};
use nlgd_storage::{DocumentKind, LocalStore, StoreConfig};
use nlgd_sync::{PgRemote, Reconciler, StaticSessionProvider, SyncConfig};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nlgd-cli")]
#[command(about = "NLGD landscape estimate tool")]
struct Cli {
    /// Overrides NLGD_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a blank estimate from the stored defaults.
    NewEstimate {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        state: Option<String>,
    },
    /// List estimates, contracts, or invoices, newest first.
    List { kind: Option<String> },
    Show { id: String },
    Duplicate { id: String },
    Status { id: String, status: String },
    /// Derive a contract from an estimate.
    Contract { estimate_id: String },
    /// Derive an invoice from an estimate.
    Invoice {
        estimate_id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Pay {
        invoice_id: String,
        amount: Decimal,
        #[arg(long, default_value = "check")]
        method: String,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete { kind: String, id: String },
    Export { path: PathBuf },
    Import { path: PathBuf },
    ImportEstimate { path: PathBuf },
    /// Search the catalogs, seeding empty ones from the built-in list.
    Catalog {
        query: String,
        #[arg(long = "type")]
        catalog_type: Option<String>,
    },
    /// Pull, merge, and push everything for the configured user.
    Sync,
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut store_config = StoreConfig::from_env();
    if let Some(dir) = cli.data_dir {
        store_config.data_dir = dir;
    }
    let store = LocalStore::open(&store_config).await?;
    let sync_config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::List { kind: None }) {
        Commands::Sync => run_sync(store, &sync_config).await,
        Commands::Migrate => {
            let remote = PgRemote::connect(&sync_config.database_url, 1).await?;
            remote.run_migrations().await?;
            println!("migrations applied");
            Ok(())
        }
        command => {
            let reconciler = attach_reconciler(&store, &sync_config).await?;
            let result = run_local(&store, command).await;
            if let Some(reconciler) = reconciler {
                match reconciler.flush().await {
                    Ok(report) => info!(?report, "pushed local changes"),
                    Err(err) => warn!(error = %err, "push after command failed"),
                }
            }
            result
        }
    }
}

/// Hooks a reconciler onto the store when a remote is configured, so local
/// writes are pushed before the process exits.
async fn attach_reconciler(store: &LocalStore, config: &SyncConfig) -> Result<Option<Reconciler>> {
    let Some(remote) = config.build_remote().await? else {
        return Ok(None);
    };
    let sessions = Arc::new(StaticSessionProvider::new(config.session()));
    let reconciler = Reconciler::new(store.clone(), remote, sessions, config.debounce());
    reconciler.attach();
    Ok(Some(reconciler))
}

async fn run_sync(store: LocalStore, config: &SyncConfig) -> Result<()> {
    let Some(remote) = config.build_remote().await? else {
        bail!("no remote configured; set NLGD_REMOTE to memory, rest, or postgres");
    };
    let Some(session) = config.session() else {
        bail!("NLGD_USER_ID is required to sync");
    };
    let sessions = Arc::new(StaticSessionProvider::new(Some(session)));
    let reconciler = Reconciler::new(store, remote, sessions, config.debounce());
    let report = reconciler.initial_sync().await.context("initial sync")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_local(store: &LocalStore, command: Commands) -> Result<()> {
    match command {
        Commands::NewEstimate { client, state } => {
            let client = ClientInfo {
                name: client.unwrap_or_default(),
                state: state.unwrap_or_default(),
                ..ClientInfo::default()
            };
            let estimate = store
                .create_estimate(client)
                .await
                .context("creating estimate")?;
            println!("{} {}", estimate.estimate_number, estimate.id);
        }
        Commands::List { kind } => {
            let kinds = match kind {
                Some(kind) => vec![parse_kind(&kind)?],
                None => DocumentKind::ALL.to_vec(),
            };
            for kind in kinds {
                list_kind(store, kind).await;
            }
        }
        Commands::Show { id } => show(store, &id).await?,
        Commands::Duplicate { id } => {
            let copy = store
                .duplicate_estimate(&id)
                .await?
                .with_context(|| format!("estimate {id} not found"))?;
            println!("{} {}", copy.estimate_number, copy.id);
        }
        Commands::Status { id, status } => {
            let status = EstimateStatus::parse(&status)
                .with_context(|| format!("unknown estimate status {status:?}"))?;
            let estimate = store
                .set_estimate_status(&id, status)
                .await?
                .with_context(|| format!("estimate {id} not found"))?;
            println!("{} {}", estimate.estimate_number, estimate.status.as_str());
        }
        Commands::Contract { estimate_id } => {
            let contract = store
                .create_contract_from(&estimate_id, &ContractOptions::default())
                .await?
                .with_context(|| format!("estimate {estimate_id} not found"))?;
            println!("{} {}", contract.contract_number, contract.id);
        }
        Commands::Invoice { estimate_id, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let invoice = store
                .create_invoice_from(&estimate_id, date)
                .await?
                .with_context(|| format!("estimate {estimate_id} not found"))?;
            println!("{} {}", invoice.invoice_number, invoice.id);
        }
        Commands::Pay {
            invoice_id,
            amount,
            method,
            note,
            date,
        } => {
            let method = PaymentMethod::parse(&method)
                .with_context(|| format!("unknown payment method {method:?}"))?;
            let payment = Payment {
                id: new_id(),
                date: date.unwrap_or_else(|| Utc::now().date_naive()),
                amount,
                method,
                note,
            };
            let invoice = store
                .record_payment(&invoice_id, payment)
                .await?
                .with_context(|| format!("invoice {invoice_id} not found"))?;
            println!(
                "{} {} remaining {}",
                invoice.invoice_number,
                invoice.status.as_str(),
                format_currency(pricing::displayed_remaining(&invoice))
            );
        }
        Commands::Delete { kind, id } => {
            let removed = match parse_kind(&kind)? {
                DocumentKind::Estimate => store.delete::<Estimate>(&id).await?,
                DocumentKind::Contract => store.delete::<Contract>(&id).await?,
                DocumentKind::Invoice => store.delete::<Invoice>(&id).await?,
            };
            if !removed {
                bail!("{kind} {id} not found");
            }
            println!("deleted {kind} {id}");
        }
        Commands::Export { path } => {
            let data = nlgd_storage::export_all(store).await?;
            let json = serde_json::to_string_pretty(&data)?;
            std::fs::write(&path, json)
                .with_context(|| format!("writing backup to {}", path.display()))?;
            println!(
                "exported {} estimates, {} contracts, {} invoices to {}",
                data.estimates.len(),
                data.contracts.len(),
                data.invoices.len(),
                path.display()
            );
        }
        Commands::Import { path } => {
            let json = read_file(&path)?;
            let summary = nlgd_storage::import_all(store, &json)
                .await
                .with_context(|| format!("importing {}", path.display()))?;
            println!(
                "imported {} estimates, {} contracts, {} invoices, {} catalog items",
                summary.estimates, summary.contracts, summary.invoices, summary.catalog_items
            );
        }
        Commands::ImportEstimate { path } => {
            let json = read_file(&path)?;
            let estimate = nlgd_storage::import_estimate(store, &json)
                .await
                .with_context(|| format!("importing estimate from {}", path.display()))?;
            println!("{} {}", estimate.estimate_number, estimate.id);
        }
        Commands::Catalog {
            query,
            catalog_type,
        } => {
            let catalog_type = match catalog_type {
                Some(raw) => Some(
                    CatalogType::parse(&raw)
                        .with_context(|| format!("unknown catalog type {raw:?}"))?,
                ),
                None => None,
            };
            let defaults = builtin_catalog().context("loading built-in catalog")?;
            store.initialize_catalog(&defaults).await?;
            let items = store.all_catalog_items().await;
            for item in filter_catalog(&items, &query, catalog_type) {
                println!(
                    "{:<9} {:<40} {:>10} / {}",
                    item.catalog_type.as_str(),
                    item.name,
                    format_currency(item.default_unit_price),
                    item.default_unit
                );
            }
        }
        Commands::Sync | Commands::Migrate => bail!("remote commands do not run against the local store"),
    }
    Ok(())
}

fn parse_kind(raw: &str) -> Result<DocumentKind> {
    DocumentKind::parse(raw).with_context(|| format!("unknown document kind {raw:?}"))
}

fn read_file(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

async fn list_kind(store: &LocalStore, kind: DocumentKind) {
    match kind {
        DocumentKind::Estimate => {
            let mut all = store.list::<Estimate>().await;
            all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            for e in all {
                println!(
                    "estimate {} {:<8} {:<24} {:>12} {}",
                    e.estimate_number,
                    e.status.as_str(),
                    e.client.name,
                    format_currency(pricing::grand_total(&e)),
                    e.id
                );
            }
        }
        DocumentKind::Contract => {
            let mut all = store.list::<Contract>().await;
            all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            for c in all {
                println!(
                    "contract {} {:<24} {:>12} {}",
                    c.contract_number,
                    c.client.name,
                    format_currency(pricing::grand_total(&c)),
                    c.id
                );
            }
        }
        DocumentKind::Invoice => {
            let mut all = store.list::<Invoice>().await;
            all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            for i in all {
                println!(
                    "invoice {} {:<8} {:<24} {:>12} {}",
                    i.invoice_number,
                    i.status.as_str(),
                    i.client.name,
                    format_currency(pricing::grand_total(&i)),
                    i.id
                );
            }
        }
    }
}

fn print_totals(totals: &DocumentTotals) {
    let rows = [
        ("Plant material", totals.plant_material),
        ("Labor and services", totals.labor_and_services),
        ("Other materials", totals.other_materials),
        ("Design fee", totals.design_fee),
        ("Subtotal", totals.subtotal),
        ("Tax", totals.tax),
        ("Total", totals.grand_total),
    ];
    for (label, amount) in rows {
        println!("  {label:<20} {:>12}", format_currency(amount));
    }
}

async fn show(store: &LocalStore, id: &str) -> Result<()> {
    if let Some(e) = store.load::<Estimate>(id).await? {
        println!(
            "Estimate {} ({}) for {}",
            e.estimate_number,
            e.status.as_str(),
            e.client.name
        );
        print_totals(&pricing::totals(&e));
        return Ok(());
    }
    if let Some(c) = store.load::<Contract>(id).await? {
        println!("Contract {} for {}", c.contract_number, c.client.name);
        print_totals(&pricing::totals(&c));
        return Ok(());
    }
    if let Some(i) = store.load::<Invoice>(id).await? {
        println!(
            "Invoice {} ({}) for {}",
            i.invoice_number,
            i.status.as_str(),
            i.client.name
        );
        print_totals(&pricing::totals(&i));
        println!("  {:<20} {:>12}", "Paid", format_currency(pricing::amount_paid(&i)));
        println!(
            "  {:<20} {:>12}",
            "Remaining",
            format_currency(pricing::displayed_remaining(&i))
        );
        return Ok(());
    }
    bail!("no document with id {id}")
}
