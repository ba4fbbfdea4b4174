//! PostgREST-style remote over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};

use crate::remote::{Collection, RemoteError, RemoteRow, RemoteStore};

#[derive(Debug, Clone)]
pub struct RestRemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct RestRemote {
    client: reqwest::Client,
    base_url: String,
}

fn conflict_target(collection: Collection) -> &'static str {
    match collection {
        Collection::Estimates | Collection::Contracts | Collection::Invoices => "id",
        Collection::Settings => "user_id",
        Collection::Catalogs => "user_id,catalog_type",
    }
}

fn to_wire(owner: &str, collection: Collection, row: &RemoteRow) -> Value {
    let mut body = json!({
        "user_id": owner,
        "data": row.data,
        "updated_at": row.updated_at,
    });
    if let Some(map) = body.as_object_mut() {
        match collection {
            Collection::Settings => {}
            Collection::Catalogs => {
                map.insert("catalog_type".into(), Value::String(row.key.clone()));
            }
            _ => {
                map.insert("id".into(), Value::String(row.key.clone()));
            }
        }
    }
    body
}

fn from_wire(collection: Collection, value: Value) -> Result<RemoteRow, RemoteError> {
    let key = value
        .get(collection.key_column())
        .and_then(Value::as_str)
        .ok_or_else(|| {
            RemoteError::Decode(format!(
                "{} row without {}",
                collection.table(),
                collection.key_column()
            ))
        })?
        .to_string();
    let updated_at = value
        .get("updated_at")
        .cloned()
        .map(serde_json::from_value::<DateTime<Utc>>)
        .transpose()?
        .unwrap_or_else(Utc::now);
    let data = value.get("data").cloned().unwrap_or(Value::Null);
    Ok(RemoteRow {
        key,
        updated_at,
        data,
    })
}

impl RestRemote {
    pub fn new(config: RestRemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|err| RemoteError::Unavailable(format!("invalid api key header: {err}")))?;
        headers.insert("apikey", api_key);
        let bearer = config.access_token.as_deref().unwrap_or(&config.api_key);
        let auth = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|err| RemoteError::Unavailable(format!("invalid access token header: {err}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .gzip(true)
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(RemoteError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn upsert(
        &self,
        owner: &str,
        collection: Collection,
        rows: Vec<RemoteRow>,
    ) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }
        let body: Vec<Value> = rows
            .iter()
            .map(|row| to_wire(owner, collection, row))
            .collect();
        let span = info_span!("rest_upsert", table = collection.table(), rows = body.len());
        async {
            let response = self
                .client
                .post(self.table_url(collection))
                .query(&[("on_conflict", conflict_target(collection))])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&body)
                .send()
                .await?;
            Self::check(response)?;
            debug!("upserted");
            Ok::<(), RemoteError>(())
        }
        .instrument(span)
        .await
    }

    async fn delete(
        &self,
        owner: &str,
        collection: Collection,
        key: &str,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.table_url(collection))
            .query(&[
                (collection.key_column(), format!("eq.{key}")),
                ("user_id", format!("eq.{owner}")),
            ])
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }

    async fn select_by_owner(
        &self,
        owner: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        let response = self
            .client
            .get(self.table_url(collection))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner}")),
            ])
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response)?.json().await?;
        rows.into_iter()
            .map(|value| from_wire(collection, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_rows_carry_the_right_key_column() {
        let row = RemoteRow {
            key: "plant".into(),
            updated_at: Utc::now(),
            data: json!([]),
        };
        let wire = to_wire("u1", Collection::Catalogs, &row);
        assert_eq!(wire["catalog_type"], "plant");
        assert_eq!(wire["user_id"], "u1");
        assert!(wire.get("id").is_none());

        let back = from_wire(Collection::Catalogs, wire).expect("decode");
        assert_eq!(back.key, "plant");
        assert_eq!(back.updated_at, row.updated_at);
    }

    #[test]
    fn settings_rows_are_keyed_by_owner() {
        let wire = json!({"user_id": "u1", "data": {}, "updated_at": "2026-01-01T00:00:00Z"});
        let row = from_wire(Collection::Settings, wire).expect("decode");
        assert_eq!(row.key, "u1");
        assert!(from_wire(Collection::Estimates, json!({"data": {}})).is_err());
    }
}
