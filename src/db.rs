use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::models::{LegacyTestRecord, TestResult};

pub const RESULTS_KEY: &str = "campuscare-testResults";
pub const LEGACY_TESTS_KEY: &str = "campuscare-tests";
pub const PROFILE_UPDATE_KEY: &str = "campuscare-profile-update";

const UPSERT_ITEM: &str = r#"
    INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
"#;

pub const RESULTS_CAPACITY: usize = 20;
pub const LEGACY_CAPACITY: usize = 10;

/// String-keyed, JSON-valued durable storage shared by every view.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    // Raw key/value operations
    pub fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(UPSERT_ITEM, params![key, value])?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> StoreResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    /// Reads a JSON list, treating a missing or malformed value as empty.
    fn load_list<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Vec<T>> {
        let Some(raw) = self.get_item(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(key, error = %e, "ignoring malformed stored list");
                Ok(Vec::new())
            }
        }
    }

    // Result lists
    pub fn load_results(&self) -> StoreResult<Vec<TestResult>> {
        self.load_list(RESULTS_KEY)
    }

    pub fn load_legacy_tests(&self) -> StoreResult<Vec<LegacyTestRecord>> {
        self.load_list(LEGACY_TESTS_KEY)
    }

    /// Prepends `result` to the canonical list and `legacy` to the legacy
    /// list, trims both to capacity and bumps the profile-update signal, all
    /// in one transaction. Returns the updated canonical list.
    pub fn record_result(
        &mut self,
        result: &TestResult,
        legacy: &LegacyTestRecord,
    ) -> StoreResult<Vec<TestResult>> {
        let mut results = self.load_results()?;
        results.insert(0, result.clone());
        results.truncate(RESULTS_CAPACITY);

        let mut legacy_tests = self.load_legacy_tests()?;
        legacy_tests.insert(0, legacy.clone());
        legacy_tests.truncate(LEGACY_CAPACITY);

        let results_raw = serde_json::to_string(&results)?;
        let legacy_raw = serde_json::to_string(&legacy_tests)?;
        let token_raw = self.next_profile_token()?.to_string();

        let tx = self.conn.transaction()?;
        for (key, value) in [
            (RESULTS_KEY, &results_raw),
            (LEGACY_TESTS_KEY, &legacy_raw),
            (PROFILE_UPDATE_KEY, &token_raw),
        ] {
            tx.execute(UPSERT_ITEM, params![key, value])?;
        }
        tx.commit()?;

        debug!(
            canonical = results.len(),
            legacy = legacy_tests.len(),
            "result lists updated"
        );
        Ok(results)
    }

    // Cross-view signal
    /// Writes a fresh signal token. Tokens are epoch milliseconds, bumped past
    /// the previous token so back-to-back writes never repeat a value.
    pub fn touch_profile_update(&self) -> StoreResult<i64> {
        let token = self.next_profile_token()?;
        self.set_item(PROFILE_UPDATE_KEY, &token.to_string())?;
        Ok(token)
    }

    fn next_profile_token(&self) -> StoreResult<i64> {
        let previous = self.profile_update_token()?.unwrap_or(0);
        Ok(Utc::now().timestamp_millis().max(previous + 1))
    }

    pub fn profile_update_token(&self) -> StoreResult<Option<i64>> {
        Ok(self
            .get_item(PROFILE_UPDATE_KEY)?
            .and_then(|raw| raw.parse().ok()))
    }

    pub fn clear_results(&self) -> StoreResult<()> {
        self.remove_item(RESULTS_KEY)?;
        self.remove_item(LEGACY_TESTS_KEY)?;
        self.touch_profile_update()?;
        Ok(())
    }
}
