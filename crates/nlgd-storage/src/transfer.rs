//! Whole-store backup and single-estimate import.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use nlgd_core::document::{self, EstimateDefaults};
use nlgd_core::{
    default_taxable_categories, new_id, CatalogItem, CatalogType, ClientInfo, Contract, Estimate,
    EstimateStatus, Invoice, LineItem, LineItemCategory, ListKey, PaymentSchedule,
    ProjectSection, Settings, DEFAULT_UNIT,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::{LocalStore, StorageError};

pub const EXPORT_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCatalogs {
    pub plants: Vec<CatalogItem>,
    pub services: Vec<CatalogItem>,
    pub materials: Vec<CatalogItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: u64,
    pub exported_at: DateTime<Utc>,
    pub estimates: Vec<Estimate>,
    pub settings: Settings,
    pub catalogs: ExportCatalogs,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("unsupported data version {0}; only version 1 backups can be imported")]
    UnsupportedVersion(String),
    #[error("file does not look like an NLGD backup: {0}")]
    Shape(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub estimates: usize,
    pub contracts: usize,
    pub invoices: usize,
    pub catalog_items: usize,
}

pub async fn export_all(store: &LocalStore) -> Result<ExportData, StorageError> {
    Ok(ExportData {
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        estimates: store.list().await,
        settings: store.load_settings().await?,
        catalogs: ExportCatalogs {
            plants: store.load_catalog(CatalogType::Plant).await,
            services: store.load_catalog(CatalogType::Service).await,
            materials: store.load_catalog(CatalogType::Material).await,
        },
        contracts: store.list().await,
        invoices: store.list().await,
    })
}

/// Parses and checks the whole backup before touching the store. Contracts
/// and invoices are replaced only when the backup carries them.
pub async fn import_all(store: &LocalStore, json: &str) -> Result<ImportSummary, ImportError> {
    let value: Value = serde_json::from_str(json).map_err(ImportError::Json)?;
    let Some(object) = value.as_object() else {
        return Err(ImportError::Shape("expected a JSON object".into()));
    };
    match object.get("version") {
        Some(v) if v.as_u64() == Some(EXPORT_VERSION) => {}
        Some(v) => return Err(ImportError::UnsupportedVersion(v.to_string())),
        None => return Err(ImportError::UnsupportedVersion("missing".into())),
    }
    let has_contracts = object.contains_key("contracts");
    let has_invoices = object.contains_key("invoices");
    let data: ExportData =
        serde_json::from_value(value).map_err(|err| ImportError::Shape(err.to_string()))?;

    let previous = export_all(store).await?;
    if let Err(err) = write_backup(store, &data, has_contracts, has_invoices).await {
        warn!(error = %err, "import failed midway; restoring previous state");
        if let Err(restore_err) = write_backup(store, &previous, true, true).await {
            warn!(error = %restore_err, "restoring previous state failed");
        }
        return Err(err.into());
    }

    let summary = ImportSummary {
        estimates: data.estimates.len(),
        contracts: if has_contracts { data.contracts.len() } else { 0 },
        invoices: if has_invoices { data.invoices.len() } else { 0 },
        catalog_items: data.catalogs.plants.len()
            + data.catalogs.services.len()
            + data.catalogs.materials.len(),
    };
    info!(?summary, "imported backup");
    Ok(summary)
}

async fn write_backup(
    store: &LocalStore,
    data: &ExportData,
    contracts: bool,
    invoices: bool,
) -> Result<(), StorageError> {
    store.replace_all(&data.estimates).await?;
    if contracts {
        store.replace_all(&data.contracts).await?;
    }
    if invoices {
        store.replace_all(&data.invoices).await?;
    }
    store.replace_settings(&data.settings).await?;
    store.replace_catalog(CatalogType::Plant, &data.catalogs.plants).await?;
    store.replace_catalog(CatalogType::Service, &data.catalogs.services).await?;
    store.replace_catalog(CatalogType::Material, &data.catalogs.materials).await?;
    Ok(())
}

fn decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or(Decimal::ZERO),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn text(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn loose_line_item(value: &Value, fallback: LineItemCategory) -> LineItem {
    let field = |name: &str| value.get(name);
    let unit = text(field("unit"));
    LineItem {
        id: new_id(),
        category: field("category")
            .and_then(Value::as_str)
            .and_then(LineItemCategory::parse)
            .unwrap_or(fallback),
        description: text(field("description")),
        quantity: decimal(field("quantity")),
        unit: if unit.trim().is_empty() {
            DEFAULT_UNIT.to_string()
        } else {
            unit
        },
        unit_price: decimal(field("unitPrice")),
        no_price: field("noPrice").and_then(Value::as_bool).unwrap_or(false),
        sub_items: strings(field("subItems")),
    }
}

fn loose_line_items(value: Option<&Value>, fallback: LineItemCategory) -> Vec<LineItem> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|v| loose_line_item(v, fallback)).collect())
        .unwrap_or_default()
}

fn loose_section(value: &Value) -> ProjectSection {
    let mut section = document::new_section(&text(value.get("name")));
    for key in ListKey::ALL {
        *section.list_mut(key) = loose_line_items(value.get(key.as_str()), key.default_category());
    }
    section
}

fn loose_client(value: Option<&Value>, fallback: ClientInfo) -> ClientInfo {
    let Some(Value::Object(map)) = value else {
        return fallback;
    };
    let field = |name: &str| map.get(name);
    let or_fallback = |name: &str, current: &str| match field(name).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => current.to_string(),
    };
    ClientInfo {
        name: text(field("name")),
        address: text(field("address")),
        city: text(field("city")),
        state: or_fallback("state", &fallback.state),
        zip: text(field("zip")),
        phone: text(field("phone")),
        email: text(field("email")),
        project_address: text(field("projectAddress")),
        project_address_same_as_client: field("projectAddressSameAsClient")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    }
}

fn loose_estimate(map: &Map<String, Value>, base: Estimate) -> Estimate {
    let field = |name: &str| map.get(name);
    let sections: Vec<ProjectSection> = field("projectSections")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(loose_section).collect())
        .unwrap_or_default();
    let taxable_categories = match field("taxableCategories").and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(LineItemCategory::parse)
            .collect(),
        None => default_taxable_categories(),
    };
    let payment_schedule = field("paymentSchedule")
        .cloned()
        .and_then(|v| serde_json::from_value::<PaymentSchedule>(v).ok())
        .unwrap_or_else(|| base.payment_schedule.clone());
    let text_or = |name: &str, current: &str| match field(name).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => current.to_string(),
    };

    Estimate {
        status: EstimateStatus::Draft,
        valid_days: field("validDays")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(base.valid_days),
        client: loose_client(field("client"), base.client.clone()),
        project_description: text(field("projectDescription")),
        estimated_start_date: text(field("estimatedStartDate")),
        estimated_duration: text(field("estimatedDuration")),
        project_sections: if sections.is_empty() {
            base.project_sections.clone()
        } else {
            sections
        },
        design_fee: loose_line_items(field("designFee"), LineItemCategory::Labor),
        tax_rate: decimal(field("taxRate")),
        taxable_categories,
        payment_schedule,
        terms: text_or("terms", &base.terms),
        warranty: text_or("warranty", &base.warranty),
        exclusions: text_or("exclusions", &base.exclusions),
        notes: text(field("notes")),
        ..base
    }
}

/// Imports one loosely typed estimate as a brand new draft: every id is
/// regenerated and the next estimate number is assigned.
pub async fn import_estimate(store: &LocalStore, json: &str) -> Result<Estimate, ImportError> {
    let value: Value = serde_json::from_str(json).map_err(ImportError::Json)?;
    let Some(map) = value.as_object() else {
        return Err(ImportError::Shape("expected an estimate object".into()));
    };

    let settings = store.load_settings().await?;
    let number = store.next_estimate_number().await?;
    let base = document::create_blank_estimate(&number, Some(&EstimateDefaults::from_settings(&settings)));
    let estimate = loose_estimate(map, base);

    let saved = store.save(estimate).await?;
    store.consume_estimate_number().await?;
    info!(id = %saved.id, number = %saved.estimate_number, "imported estimate");
    Ok(saved)
}
