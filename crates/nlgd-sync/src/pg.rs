//! Postgres remote via `sqlx`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{info, instrument};

use crate::remote::{Collection, RemoteError, RemoteRow, RemoteStore};

#[derive(Debug, Clone)]
pub struct PgRemote {
    pool: PgPool,
}

/// Settings rows are keyed by owner alone, so they take no key parameter.
fn upsert_sql(collection: Collection) -> String {
    let table = collection.table();
    match collection {
        Collection::Estimates | Collection::Contracts | Collection::Invoices => format!(
            r#"
            INSERT INTO {table} (id, user_id, data, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
               SET data = EXCLUDED.data,
                   updated_at = EXCLUDED.updated_at
             WHERE {table}.user_id = EXCLUDED.user_id
            "#
        ),
        Collection::Settings => r#"
            INSERT INTO settings (user_id, data, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
               SET data = EXCLUDED.data,
                   updated_at = EXCLUDED.updated_at
            "#
        .to_string(),
        Collection::Catalogs => r#"
            INSERT INTO catalogs (catalog_type, user_id, data, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, catalog_type) DO UPDATE
               SET data = EXCLUDED.data,
                   updated_at = EXCLUDED.updated_at
            "#
        .to_string(),
    }
}

impl PgRemote {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RemoteError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        info!("postgres remote connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), RemoteError> {
        info!("running remote migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("remote migrations completed");
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for PgRemote {
    async fn upsert(
        &self,
        owner: &str,
        collection: Collection,
        rows: Vec<RemoteRow>,
    ) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = upsert_sql(collection);
        let mut tx = self.pool.begin().await?;
        for row in &rows {
            let query = sqlx::query(&sql);
            let query = match collection {
                Collection::Settings => query,
                _ => query.bind(&row.key),
            };
            query
                .bind(owner)
                .bind(&row.data)
                .bind(row.updated_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(
        &self,
        owner: &str,
        collection: Collection,
        key: &str,
    ) -> Result<(), RemoteError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND user_id = $2",
            collection.table(),
            collection.key_column()
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn select_by_owner(
        &self,
        owner: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteRow>, RemoteError> {
        let sql = format!(
            "SELECT {} AS key, data, updated_at FROM {} WHERE user_id = $1",
            collection.key_column(),
            collection.table()
        );
        let rows = sqlx::query(&sql).bind(owner).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RemoteRow {
                key: row.try_get("key")?,
                updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
                data: row.try_get::<serde_json::Value, _>("data")?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_upserts_are_owner_guarded() {
        let sql = upsert_sql(Collection::Invoices);
        assert!(sql.contains("INSERT INTO invoices"));
        assert!(sql.contains("WHERE invoices.user_id = EXCLUDED.user_id"));
        assert!(upsert_sql(Collection::Catalogs).contains("(user_id, catalog_type)"));
    }
}
