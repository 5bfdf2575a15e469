//! Session report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::GradeResult;

/// A completed quiz session: every grading outcome plus the totals the
/// attempt store records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the session started.
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub course: String,
    /// Per-question grading results, in answer order.
    pub results: Vec<GradeResult>,
    pub total_points: u32,
    pub max_points: u32,
    /// Overall score in `0..=100`.
    pub score_percentage: f64,
    pub stars_earned: u32,
    /// Wall-clock session duration in milliseconds.
    pub duration_ms: u64,
}

impl SessionReport {
    /// Save the report as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// One-line summary for console output.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {}/{} points ({:.1}%), {} star{}",
            self.course,
            self.total_points,
            self.max_points,
            self.score_percentage,
            self.stars_earned,
            if self.stars_earned == 1 { "" } else { "s" }
        )
    }
}
