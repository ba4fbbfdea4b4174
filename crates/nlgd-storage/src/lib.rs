//! Local document store for NLGD: one JSON file per collection.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use nlgd_core::document::{self, ContractOptions, EstimateDefaults};
use nlgd_core::numbering;
use nlgd_core::validate::{self, ValidationError};
use nlgd_core::{
    catalog_by_type, pricing, CatalogItem, CatalogType, ClientInfo, Contract, Estimate,
    EstimateStatus, Invoice, Payment, Settings,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

pub mod transfer;

pub use transfer::{export_all, import_all, import_estimate, ExportData, ImportError, ImportSummary};

pub const CRATE_NAME: &str = "nlgd-storage";

pub const ESTIMATES_KEY: &str = "nlgd_estimates";
pub const CONTRACTS_KEY: &str = "nlgd_contracts";
pub const INVOICES_KEY: &str = "nlgd_invoices";
pub const SETTINGS_KEY: &str = "nlgd_settings";
pub const PLANT_CATALOG_KEY: &str = "nlgd_plant_catalog";
pub const SERVICE_CATALOG_KEY: &str = "nlgd_service_catalog";
pub const MATERIAL_CATALOG_KEY: &str = "nlgd_material_catalog";

pub const ALL_KEYS: [&str; 7] = [
    ESTIMATES_KEY,
    CONTRACTS_KEY,
    INVOICES_KEY,
    SETTINGS_KEY,
    PLANT_CATALOG_KEY,
    SERVICE_CATALOG_KEY,
    MATERIAL_CATALOG_KEY,
];

/// Roughly what a browser grants a single origin.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

pub fn catalog_key(catalog_type: CatalogType) -> &'static str {
    match catalog_type {
        CatalogType::Plant => PLANT_CATALOG_KEY,
        CatalogType::Service => SERVICE_CATALOG_KEY,
        CatalogType::Material => MATERIAL_CATALOG_KEY,
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub quota_bytes: u64,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("NLGD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./nlgd-data")),
            quota_bytes: std::env::var("NLGD_STORAGE_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUOTA_BYTES),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is full: writing needs {needed} bytes but the quota is {quota}; export and delete old documents to free space")]
    CapacityExceeded { needed: u64, quota: u64 },
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Estimate,
    Contract,
    Invoice,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Estimate,
        DocumentKind::Contract,
        DocumentKind::Invoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Estimate => "estimate",
            DocumentKind::Contract => "contract",
            DocumentKind::Invoice => "invoice",
        }
    }

    /// Collection name shared by the local store and the remote tables.
    pub fn collection(&self) -> &'static str {
        match self {
            DocumentKind::Estimate => "estimates",
            DocumentKind::Contract => "contracts",
            DocumentKind::Invoice => "invoices",
        }
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            DocumentKind::Estimate => ESTIMATES_KEY,
            DocumentKind::Contract => CONTRACTS_KEY,
            DocumentKind::Invoice => INVOICES_KEY,
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "estimate" | "estimates" => Some(Self::Estimate),
            "contract" | "contracts" => Some(Self::Contract),
            "invoice" | "invoices" => Some(Self::Invoice),
            _ => None,
        }
    }
}

/// A local mutation the remote side should learn about.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    UpsertEstimates(Vec<Estimate>),
    UpsertContracts(Vec<Contract>),
    UpsertInvoices(Vec<Invoice>),
    UpsertSettings(Settings),
    UpsertCatalog(CatalogType, Vec<CatalogItem>),
    Delete { kind: DocumentKind, id: String },
}

impl StoreChange {
    /// Changes sharing a key supersede each other.
    pub fn sync_key(&self) -> String {
        match self {
            StoreChange::UpsertEstimates(_) => "estimates".to_string(),
            StoreChange::UpsertContracts(_) => "contracts".to_string(),
            StoreChange::UpsertInvoices(_) => "invoices".to_string(),
            StoreChange::UpsertSettings(_) => "settings".to_string(),
            StoreChange::UpsertCatalog(t, _) => format!("catalog-{}", t.as_str()),
            StoreChange::Delete { kind, id } => format!("delete-{}-{id}", kind.as_str()),
        }
    }
}

pub trait StoreHook: Send + Sync {
    fn on_change(&self, change: StoreChange);
}

#[derive(Debug, Default)]
pub struct NoopStoreHook;

impl StoreHook for NoopStoreHook {
    fn on_change(&self, _change: StoreChange) {}
}

/// A document kept in one of the three record collections.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: DocumentKind;

    fn id(&self) -> &str;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
    fn validate(&self) -> Result<(), ValidationError>;
    fn upsert_change(all: Vec<Self>) -> StoreChange;

    /// Derived fields refreshed on every save.
    fn refresh(&mut self) {}
}

impl Record for Estimate {
    const KIND: DocumentKind = DocumentKind::Estimate;

    fn id(&self) -> &str {
        &self.id
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
    fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_estimate(self)
    }
    fn upsert_change(all: Vec<Self>) -> StoreChange {
        StoreChange::UpsertEstimates(all)
    }
}

impl Record for Contract {
    const KIND: DocumentKind = DocumentKind::Contract;

    fn id(&self) -> &str {
        &self.id
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
    fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_contract(self)
    }
    fn upsert_change(all: Vec<Self>) -> StoreChange {
        StoreChange::UpsertContracts(all)
    }
}

impl Record for Invoice {
    const KIND: DocumentKind = DocumentKind::Invoice;

    fn id(&self) -> &str {
        &self.id
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
    fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_invoice(self)
    }
    fn upsert_change(all: Vec<Self>) -> StoreChange {
        StoreChange::UpsertInvoices(all)
    }
    fn refresh(&mut self) {
        self.status = pricing::invoice_status(self);
    }
}

struct StoreInner {
    root: PathBuf,
    quota_bytes: u64,
    write_lock: Mutex<()>,
    hook: RwLock<Arc<dyn StoreHook>>,
}

/// Cheap to clone; clones share the directory, the write lock and the hook.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("root", &self.inner.root)
            .field("quota_bytes", &self.inner.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                root: root.into(),
                quota_bytes,
                write_lock: Mutex::new(()),
                hook: RwLock::new(Arc::new(NoopStoreHook)),
            }),
        }
    }

    pub async fn open(config: &StoreConfig) -> anyhow::Result<Self> {
        fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;
        Ok(Self::new(&config.data_dir, config.quota_bytes))
    }

    pub fn with_hook(self, hook: Arc<dyn StoreHook>) -> Self {
        self.set_hook(hook);
        self
    }

    pub fn set_hook(&self, hook: Arc<dyn StoreHook>) {
        match self.inner.hook.write() {
            Ok(mut guard) => *guard = hook,
            Err(poisoned) => *poisoned.into_inner() = hook,
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn quota_bytes(&self) -> u64 {
        self.inner.quota_bytes
    }

    fn notify(&self, change: StoreChange) {
        let hook = match self.inner.hook.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        };
        debug!(key = %change.sync_key(), "store change");
        hook.on_change(change);
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.inner.root.join(format!("{key}.json"))
    }

    /// Missing and unreadable keys both read as `None`.
    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(key, error = %err, "unreadable key treated as empty");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "corrupt key treated as empty");
                None
            }
        }
    }

    /// Total bytes on disk if `key` were rewritten with `incoming` bytes.
    async fn projected_usage(&self, key: &str, incoming: u64) -> u64 {
        let mut total = incoming;
        for other in ALL_KEYS.iter().filter(|k| **k != key) {
            if let Ok(meta) = fs::metadata(self.path_for(other)).await {
                total = total.saturating_add(meta.len());
            }
        }
        total
    }

    pub async fn usage_bytes(&self) -> u64 {
        self.projected_usage("", 0).await
    }

    async fn write_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })?;

        let needed = self.projected_usage(key, bytes.len() as u64).await;
        if needed > self.inner.quota_bytes {
            warn!(key, needed, quota = self.inner.quota_bytes, "storage quota exceeded");
            return Err(StorageError::CapacityExceeded {
                needed,
                quota: self.inner.quota_bytes,
            });
        }

        let root = &self.inner.root;
        fs::create_dir_all(root).await.map_err(io_error(root))?;

        let final_path = self.path_for(key);
        let temp_path = root.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(io_error(&temp_path))?;
        file.write_all(&bytes).await.map_err(io_error(&temp_path))?;
        file.flush().await.map_err(io_error(&temp_path))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io {
                path: final_path,
                source: err,
            });
        }
        Ok(())
    }

    pub async fn list<T: Record>(&self) -> Vec<T> {
        self.read_key(T::KIND.storage_key()).await.unwrap_or_default()
    }

    pub async fn load<T: Record>(&self, id: &str) -> Result<Option<T>, StorageError> {
        Ok(self.list::<T>().await.into_iter().find(|r| r.id() == id))
    }

    /// Upserts by id and stamps `updated_at`. Invalid records are never written.
    pub async fn save<T: Record>(&self, mut record: T) -> Result<T, StorageError> {
        record.validate()?;
        record.refresh();
        record.set_updated_at(Utc::now());

        let span = info_span!("store_save", kind = T::KIND.as_str(), id = record.id());
        let all = async {
            let _guard = self.inner.write_lock.lock().await;
            let mut all = self.list::<T>().await;
            match all.iter().position(|r| r.id() == record.id()) {
                Some(index) => all[index] = record.clone(),
                None => all.push(record.clone()),
            }
            self.write_key(T::KIND.storage_key(), &all).await?;
            Ok::<_, StorageError>(all)
        }
        .instrument(span)
        .await?;

        self.notify(T::upsert_change(all));
        Ok(record)
    }

    /// Hard delete. Returns whether anything was removed.
    pub async fn delete<T: Record>(&self, id: &str) -> Result<bool, StorageError> {
        let removed = {
            let _guard = self.inner.write_lock.lock().await;
            let all = self.list::<T>().await;
            let before = all.len();
            let kept: Vec<T> = all.into_iter().filter(|r| r.id() != id).collect();
            if kept.len() == before {
                false
            } else {
                self.write_key(T::KIND.storage_key(), &kept).await?;
                true
            }
        };
        if removed {
            self.notify(StoreChange::Delete {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        Ok(removed)
    }

    /// Overwrites a whole collection as given. No stamping, no change event.
    pub async fn replace_all<T: Record>(&self, records: &[T]) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        self.write_key(T::KIND.storage_key(), records).await
    }

    pub async fn load_settings(&self) -> Result<Settings, StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        self.load_settings_locked().await
    }

    async fn load_settings_locked(&self) -> Result<Settings, StorageError> {
        if let Some(settings) = self.read_key::<Settings>(SETTINGS_KEY).await {
            return Ok(settings);
        }
        let defaults = Settings::default();
        self.write_key(SETTINGS_KEY, &defaults).await?;
        Ok(defaults)
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        {
            let _guard = self.inner.write_lock.lock().await;
            self.write_key(SETTINGS_KEY, settings).await?;
        }
        self.notify(StoreChange::UpsertSettings(settings.clone()));
        Ok(())
    }

    pub async fn replace_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        self.write_key(SETTINGS_KEY, settings).await
    }

    pub async fn next_estimate_number(&self) -> Result<String, StorageError> {
        let settings = self.load_settings().await?;
        Ok(numbering::generate_number(
            &settings.estimate_number_prefix,
            settings.next_estimate_number,
        ))
    }

    /// Returns the number just taken and advances the counter.
    pub async fn consume_estimate_number(&self) -> Result<String, StorageError> {
        self.consume_number(|settings| {
            let number = numbering::generate_number(
                &settings.estimate_number_prefix,
                settings.next_estimate_number,
            );
            settings.next_estimate_number = settings.next_estimate_number.saturating_add(1);
            number
        })
        .await
    }

    pub async fn next_invoice_number(&self) -> Result<String, StorageError> {
        let settings = self.load_settings().await?;
        Ok(numbering::generate_invoice_number(
            &settings.invoice_number_prefix,
            settings.next_invoice_number,
        ))
    }

    pub async fn consume_invoice_number(&self) -> Result<String, StorageError> {
        self.consume_number(|settings| {
            let number = numbering::generate_invoice_number(
                &settings.invoice_number_prefix,
                settings.next_invoice_number,
            );
            settings.next_invoice_number = settings.next_invoice_number.saturating_add(1);
            number
        })
        .await
    }

    async fn consume_number(
        &self,
        take: impl FnOnce(&mut Settings) -> String,
    ) -> Result<String, StorageError> {
        let (number, settings) = {
            let _guard = self.inner.write_lock.lock().await;
            let mut settings = self.load_settings_locked().await?;
            let number = take(&mut settings);
            self.write_key(SETTINGS_KEY, &settings).await?;
            (number, settings)
        };
        self.notify(StoreChange::UpsertSettings(settings));
        Ok(number)
    }

    pub async fn next_contract_number(&self) -> String {
        numbering::generate_contract_number(self.list::<Contract>().await.len())
    }

    /// Builds a blank estimate from the stored defaults and saves it. The
    /// number is consumed only once the save has succeeded.
    pub async fn create_estimate(&self, client: ClientInfo) -> Result<Estimate, StorageError> {
        let settings = self.load_settings().await?;
        let number = self.next_estimate_number().await?;
        let mut estimate =
            document::create_blank_estimate(&number, Some(&EstimateDefaults::from_settings(&settings)));
        if !settings.defaults.design_fee_description.trim().is_empty() {
            estimate.add_design_fee_item(
                &settings.defaults.design_fee_description,
                settings.defaults.design_fee_price,
            );
        }
        if client.state.trim().is_empty() {
            estimate.client = ClientInfo {
                state: estimate.client.state.clone(),
                ..client
            };
        } else {
            estimate.client = client;
        }
        let saved = self.save(estimate).await?;
        self.consume_estimate_number().await?;
        Ok(saved)
    }

    pub async fn duplicate_estimate(&self, id: &str) -> Result<Option<Estimate>, StorageError> {
        let Some(original) = self.load::<Estimate>(id).await? else {
            return Ok(None);
        };
        let number = self.consume_estimate_number().await?;
        let copy = document::duplicate_estimate(&original, &number);
        self.save(copy).await.map(Some)
    }

    pub async fn set_estimate_status(
        &self,
        id: &str,
        status: EstimateStatus,
    ) -> Result<Option<Estimate>, StorageError> {
        let Some(mut estimate) = self.load::<Estimate>(id).await? else {
            return Ok(None);
        };
        estimate.status = status;
        self.save(estimate).await.map(Some)
    }

    pub async fn create_contract_from(
        &self,
        estimate_id: &str,
        options: &ContractOptions,
    ) -> Result<Option<Contract>, StorageError> {
        let Some(estimate) = self.load::<Estimate>(estimate_id).await? else {
            return Ok(None);
        };
        let number = self.next_contract_number().await;
        let contract = document::derive_contract(&estimate, &number, options);
        self.save(contract).await.map(Some)
    }

    pub async fn create_invoice_from(
        &self,
        estimate_id: &str,
        invoice_date: NaiveDate,
    ) -> Result<Option<Invoice>, StorageError> {
        let Some(estimate) = self.load::<Estimate>(estimate_id).await? else {
            return Ok(None);
        };
        let settings = self.load_settings().await?;
        let number = self.next_invoice_number().await?;
        let invoice = document::derive_invoice(
            &estimate,
            &number,
            invoice_date,
            &settings.defaults.invoice_payment_instructions,
        );
        let saved = self.save(invoice).await?;
        self.consume_invoice_number().await?;
        Ok(Some(saved))
    }

    pub async fn record_payment(
        &self,
        invoice_id: &str,
        payment: Payment,
    ) -> Result<Option<Invoice>, StorageError> {
        validate::validate_payment(&payment)?;
        let Some(mut invoice) = self.load::<Invoice>(invoice_id).await? else {
            return Ok(None);
        };
        invoice.payments.push(payment);
        self.save(invoice).await.map(Some)
    }

    pub async fn load_catalog(&self, catalog_type: CatalogType) -> Vec<CatalogItem> {
        self.read_key(catalog_key(catalog_type)).await.unwrap_or_default()
    }

    pub async fn save_catalog(
        &self,
        catalog_type: CatalogType,
        items: &[CatalogItem],
    ) -> Result<(), StorageError> {
        self.replace_catalog(catalog_type, items).await?;
        self.notify(StoreChange::UpsertCatalog(catalog_type, items.to_vec()));
        Ok(())
    }

    pub async fn replace_catalog(
        &self,
        catalog_type: CatalogType,
        items: &[CatalogItem],
    ) -> Result<(), StorageError> {
        let _guard = self.inner.write_lock.lock().await;
        self.write_key(catalog_key(catalog_type), items).await
    }

    /// Seeds each catalog that is currently empty. Returns the types seeded.
    pub async fn initialize_catalog(
        &self,
        defaults: &[CatalogItem],
    ) -> Result<Vec<CatalogType>, StorageError> {
        let mut seeded = Vec::new();
        for catalog_type in CatalogType::ALL {
            if !self.load_catalog(catalog_type).await.is_empty() {
                continue;
            }
            let items = catalog_by_type(defaults, catalog_type);
            self.replace_catalog(catalog_type, &items).await?;
            seeded.push(catalog_type);
        }
        if !seeded.is_empty() {
            debug!(?seeded, "seeded empty catalogs");
        }
        Ok(seeded)
    }

    pub async fn all_catalog_items(&self) -> Vec<CatalogItem> {
        let mut items = Vec::new();
        for catalog_type in CatalogType::ALL {
            items.extend(self.load_catalog(catalog_type).await);
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlgd_core::document::create_blank_estimate;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingHook {
        keys: StdMutex<Vec<String>>,
    }

    impl StoreHook for RecordingHook {
        fn on_change(&self, change: StoreChange) {
            self.keys.lock().unwrap().push(change.sync_key());
        }
    }

    fn named_estimate(number: &str, client: &str) -> Estimate {
        let mut estimate = create_blank_estimate(number, None);
        estimate.client.name = client.to_string();
        estimate
    }

    #[test]
    fn sync_keys_coalesce_by_collection() {
        assert_eq!(StoreChange::UpsertEstimates(vec![]).sync_key(), "estimates");
        assert_eq!(
            StoreChange::UpsertCatalog(CatalogType::Material, vec![]).sync_key(),
            "catalog-material"
        );
        let delete = StoreChange::Delete {
            kind: DocumentKind::Invoice,
            id: "abc".into(),
        };
        assert_eq!(delete.sync_key(), "delete-invoice-abc");
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_files() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path(), DEFAULT_QUOTA_BYTES);
        store
            .save(named_estimate("NL-2026-001", "Rivera"))
            .await
            .expect("save");

        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir.path()).await.expect("read_dir");
        while let Some(entry) = entries.next_entry().await.expect("entry") {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["nlgd_estimates.json".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_key_reads_as_empty() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("nlgd_contracts.json"), b"{not json").expect("write");
        let store = LocalStore::new(dir.path(), DEFAULT_QUOTA_BYTES);
        assert!(store.list::<Contract>().await.is_empty());
    }

    #[tokio::test]
    async fn hook_sees_full_collection_and_deletes() {
        let dir = tempdir().expect("tempdir");
        let hook = Arc::new(RecordingHook::default());
        let store = LocalStore::new(dir.path(), DEFAULT_QUOTA_BYTES).with_hook(hook.clone());

        let saved = store
            .save(named_estimate("NL-2026-001", "Rivera"))
            .await
            .expect("save");
        assert!(store.delete::<Estimate>(&saved.id).await.expect("delete"));
        assert!(!store.delete::<Estimate>(&saved.id).await.expect("second delete"));

        let keys = hook.keys.lock().unwrap().clone();
        assert_eq!(
            keys,
            vec!["estimates".to_string(), format!("delete-estimate-{}", saved.id)]
        );
    }

    #[tokio::test]
    async fn replace_all_keeps_timestamps_and_stays_silent() {
        let dir = tempdir().expect("tempdir");
        let hook = Arc::new(RecordingHook::default());
        let store = LocalStore::new(dir.path(), DEFAULT_QUOTA_BYTES).with_hook(hook.clone());

        let mut estimate = named_estimate("NL-2026-001", "Rivera");
        let stamp = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .expect("ts")
            .with_timezone(&Utc);
        estimate.updated_at = stamp;
        store.replace_all(&[estimate.clone()]).await.expect("replace");

        let loaded = store
            .load::<Estimate>(&estimate.id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded.updated_at, stamp);
        assert!(hook.keys.lock().unwrap().is_empty());
    }
}
