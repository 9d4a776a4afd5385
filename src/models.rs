use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ScoreRange, TestDefinition};

/// A completed assessment as stored in the canonical result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_name: String,
    pub score: u32,
    pub max_score: u32,
    pub category: String,
    pub severity_class: String,
    pub description: String,
    /// Raw answer values in question order, before any reverse scoring.
    pub responses: Vec<u32>,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(
        def: &TestDefinition,
        score: u32,
        range: &ScoreRange,
        responses: Vec<u32>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            test_name: def.test_name.clone(),
            score,
            max_score: def.max_score,
            category: range.category.clone(),
            severity_class: range.severity_class.clone(),
            description: range.description.clone(),
            responses,
            timestamp,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.max_score == 0 {
            0.0
        } else {
            (self.score as f64 / self.max_score as f64) * 100.0
        }
    }
}

/// Record shape of the older profile-page test list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTestRecord {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub score: u32,
    pub max_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LegacyTestRecord {
    pub fn from_result(def: &TestDefinition, result: &TestResult) -> Self {
        Self {
            id: result.timestamp.timestamp_millis(),
            name: def.title.clone(),
            date: result.timestamp.to_rfc3339(),
            score: result.score,
            max_score: result.max_score,
            category: Some(result.category.clone()),
        }
    }

    /// Accepts both full timestamps and the plain `YYYY-MM-DD` dates older
    /// entries were saved with.
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

/// One row of the profile page's recent-tests panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub name: String,
    pub score: u32,
    pub max_score: u32,
    pub category: Option<String>,
    pub severity_class: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
