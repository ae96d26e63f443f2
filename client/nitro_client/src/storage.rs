//! Client-side storage.
//!
//! Two stores, mirroring what a browser offers:
//!
//! | Store         | Backing          | Lifetime                       |
//! |---------------|------------------|--------------------------------|
//! | [`DurableStore`] | SQLite `kv_store` | survives restarts            |
//! | [`TabStore`]     | in-process map    | dies with the process        |
//!
//! Keys are namespaced under `nitro.` (see [`keys`]).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use nitro_core::PurchaseOverrides;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::errors::Result;

pub mod keys {
    pub const AUTH_TOKEN: &str = "nitro.auth.token";
    pub const SIGNUP_COOLDOWN_UNTIL: &str = "nitro.signup_cooldown_until";

    pub fn purchase_overrides(participant_id: &str) -> String {
        format!("nitro.purchase_overrides.{participant_id}")
    }

    pub fn dashboard_seen(participant_id: &str) -> String {
        format!("nitro.dashboard_seen.{participant_id}")
    }
}

// ─────────────────────────────────────────────────────────
// Durable store
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DurableStore {
    pool: SqlitePool,
}

impl DurableStore {
    /// Open (creating if needed) the store and run pending migrations.
    pub async fn open(store_url: &str) -> Result<Self> {
        let url = if store_url.starts_with("sqlite:") {
            store_url.to_string()
        } else {
            format!("sqlite:{store_url}")
        };
        let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

        // An in-memory database lives only as long as its connection.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Client store ready at {url}");
        Ok(Self { pool })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Read a JSON value. A corrupt entry is logged and treated as absent.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding unreadable value under {key}: {e}");
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }

    // ── Typed helpers ────────────────────────────────────

    pub async fn purchase_overrides(&self, participant_id: &str) -> Result<PurchaseOverrides> {
        Ok(self
            .get_json(&keys::purchase_overrides(participant_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_purchase_overrides(
        &self,
        participant_id: &str,
        overrides: &PurchaseOverrides,
    ) -> Result<()> {
        self.set_json(&keys::purchase_overrides(participant_id), overrides)
            .await
    }

    pub async fn signup_cooldown_until(&self) -> Result<Option<DateTime<Utc>>> {
        let secs: Option<i64> = self.get_json(keys::SIGNUP_COOLDOWN_UNTIL).await?;
        Ok(secs.and_then(|s| Utc.timestamp_opt(s, 0).single()))
    }

    pub async fn set_signup_cooldown_until(&self, until: DateTime<Utc>) -> Result<()> {
        self.set_json(keys::SIGNUP_COOLDOWN_UNTIL, &until.timestamp())
            .await
    }

    pub async fn clear_signup_cooldown(&self) -> Result<()> {
        self.remove(keys::SIGNUP_COOLDOWN_UNTIL).await
    }

    /// Returns whether the participant had seen the dashboard before, and
    /// marks it seen.
    pub async fn mark_dashboard_seen(&self, participant_id: &str) -> Result<bool> {
        let key = keys::dashboard_seen(participant_id);
        let seen = self.get(&key).await?.is_some();
        if !seen {
            self.set(&key, "true").await?;
        }
        Ok(seen)
    }
}

// ─────────────────────────────────────────────────────────
// Tab-scoped store
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TabStore {
    entries: Mutex<HashMap<String, String>>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> DurableStore {
    DurableStore::open("sqlite::memory:").await.unwrap()
}
