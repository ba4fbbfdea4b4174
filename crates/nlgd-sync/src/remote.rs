//! Remote table contract and the in-memory implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nlgd_storage::DocumentKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("http status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("could not decode remote data: {0}")]
    Decode(String),
    #[error("remote unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

/// Remote tables. Every row belongs to exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Estimates,
    Contracts,
    Invoices,
    Settings,
    Catalogs,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Estimates,
        Collection::Contracts,
        Collection::Invoices,
        Collection::Settings,
        Collection::Catalogs,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Estimates => "estimates",
            Collection::Contracts => "contracts",
            Collection::Invoices => "invoices",
            Collection::Settings => "settings",
            Collection::Catalogs => "catalogs",
        }
    }

    /// Column that identifies a row within one owner's data.
    pub fn key_column(&self) -> &'static str {
        match self {
            Collection::Estimates | Collection::Contracts | Collection::Invoices => "id",
            Collection::Settings => "user_id",
            Collection::Catalogs => "catalog_type",
        }
    }

    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Estimate => Collection::Estimates,
            DocumentKind::Contract => Collection::Contracts,
            DocumentKind::Invoice => Collection::Invoices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    pub key: String,
    pub updated_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert or overwrite rows by key.
    async fn upsert(
        &self,
        owner: &str,
        collection: Collection,
        rows: Vec<RemoteRow>,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, owner: &str, collection: Collection, key: &str)
        -> Result<(), RemoteError>;

    async fn select_by_owner(
        &self,
        owner: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteRow>, RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Upsert {
        collection: Collection,
        keys: Vec<String>,
    },
    Delete {
        collection: Collection,
        key: String,
    },
    Select {
        collection: Collection,
    },
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<(String, Collection), BTreeMap<String, RemoteRow>>,
    calls: Vec<RemoteCall>,
    unavailable: bool,
}

/// Keeps rows in process. Every call is recorded, including failed ones.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// While set, every call fails with `RemoteError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn rows(&self, owner: &str, collection: Collection) -> Vec<RemoteRow> {
        self.state()
            .tables
            .get(&(owner.to_string(), collection))
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Writes rows directly, without recording a call.
    pub fn seed(&self, owner: &str, collection: Collection, rows: Vec<RemoteRow>) {
        let mut state = self.state();
        let table = state
            .tables
            .entry((owner.to_string(), collection))
            .or_default();
        for row in rows {
            table.insert(row.key.clone(), row);
        }
    }

    fn record(&self, call: RemoteCall) -> Result<MutexGuard<'_, MemoryState>, RemoteError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.unavailable {
            return Err(RemoteError::Unavailable("memory remote is offline".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert(
        &self,
        owner: &str,
        collection: Collection,
        rows: Vec<RemoteRow>,
    ) -> Result<(), RemoteError> {
        let keys = rows.iter().map(|row| row.key.clone()).collect();
        let mut state = self.record(RemoteCall::Upsert { collection, keys })?;
        let table = state
            .tables
            .entry((owner.to_string(), collection))
            .or_default();
        for row in rows {
            table.insert(row.key.clone(), row);
        }
        Ok(())
    }

    async fn delete(
        &self,
        owner: &str,
        collection: Collection,
        key: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.record(RemoteCall::Delete {
            collection,
            key: key.to_string(),
        })?;
        if let Some(table) = state.tables.get_mut(&(owner.to_string(), collection)) {
            table.remove(key);
        }
        Ok(())
    }

    async fn select_by_owner(
        &self,
        owner: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        let state = self.record(RemoteCall::Select { collection })?;
        Ok(state
            .tables
            .get(&(owner.to_string(), collection))
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(key: &str) -> RemoteRow {
        RemoteRow {
            key: key.to_string(),
            updated_at: Utc::now(),
            data: json!({"id": key}),
        }
    }

    #[tokio::test]
    async fn rows_are_scoped_by_owner() {
        let remote = MemoryRemote::new();
        remote
            .upsert("alice", Collection::Estimates, vec![row("e1"), row("e2")])
            .await
            .expect("upsert");
        remote
            .upsert("bob", Collection::Estimates, vec![row("e3")])
            .await
            .expect("upsert");

        let alice = remote
            .select_by_owner("alice", Collection::Estimates)
            .await
            .expect("select");
        assert_eq!(alice.len(), 2);

        remote
            .delete("bob", Collection::Estimates, "e1")
            .await
            .expect("delete");
        assert_eq!(remote.rows("alice", Collection::Estimates).len(), 2);
    }

    #[tokio::test]
    async fn offline_remote_records_then_fails() {
        let remote = MemoryRemote::new();
        remote.set_unavailable(true);
        let err = remote
            .select_by_owner("alice", Collection::Settings)
            .await
            .expect_err("offline");
        assert!(matches!(err, RemoteError::Unavailable(_)));
        assert_eq!(
            remote.calls(),
            vec![RemoteCall::Select {
                collection: Collection::Settings
            }]
        );
    }
}
