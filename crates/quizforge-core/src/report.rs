//! Export document with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Attempt, Group, Question, Test, UserAnswer};
use crate::statistics::{average_score, completion_rate, unique_users};

/// Placeholder written in place of every user id in an export.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Full contents of every collection at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub tests: Vec<Test>,
    pub questions: Vec<Question>,
    pub groups: Vec<Group>,
    pub attempts: Vec<Attempt>,
    pub answers: Vec<UserAnswer>,
}

/// Headline figures included at the top of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub tests: usize,
    pub questions: usize,
    pub groups: usize,
    pub attempts: usize,
    pub answers: usize,
    pub unique_users: usize,
    pub average_score: f64,
    pub completion_rate: f64,
}

impl ExportSummary {
    pub fn compute(snapshot: &CollectionSnapshot) -> Self {
        Self {
            tests: snapshot.tests.len(),
            questions: snapshot.questions.len(),
            groups: snapshot.groups.len(),
            attempts: snapshot.attempts.len(),
            answers: snapshot.answers.len(),
            unique_users: unique_users(&snapshot.attempts),
            average_score: average_score(&snapshot.attempts),
            completion_rate: completion_rate(&snapshot.attempts),
        }
    }
}

/// An anonymized dump of all collections plus summary statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Unique export identifier.
    pub id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub summary: ExportSummary,
    pub tests: Vec<Test>,
    pub questions: Vec<Question>,
    pub groups: Vec<Group>,
    pub attempts: Vec<Attempt>,
    pub answers: Vec<UserAnswer>,
}

impl ExportDocument {
    /// Build an export from `snapshot`.
    ///
    /// The summary is computed first, so unique-user counts reflect the
    /// real ids before they are replaced.
    pub fn build(snapshot: CollectionSnapshot, exported_at: DateTime<Utc>) -> Self {
        let summary = ExportSummary::compute(&snapshot);
        let CollectionSnapshot {
            mut tests,
            questions,
            mut groups,
            mut attempts,
            mut answers,
        } = snapshot;

        for t in &mut tests {
            t.owner_id = ANONYMOUS_USER.to_string();
        }
        for g in &mut groups {
            g.owner_id = ANONYMOUS_USER.to_string();
        }
        for a in &mut attempts {
            a.user_id = ANONYMOUS_USER.to_string();
        }
        for a in &mut answers {
            a.user_id = ANONYMOUS_USER.to_string();
        }

        Self {
            id: Uuid::new_v4(),
            exported_at,
            summary,
            tests,
            questions,
            groups,
            attempts,
            answers,
        }
    }

    /// `quizforge-export-<timestamp>.json`, named after the export time.
    pub fn default_file_name(&self) -> String {
        format!(
            "quizforge-export-{}.json",
            self.exported_at.format("%Y-%m-%dT%H%M%S")
        )
    }

    /// Save the export as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize export")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write export to {}", path.display()))?;
        Ok(())
    }

    /// Load an export from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read export from {}", path.display()))?;
        let doc: ExportDocument =
            serde_json::from_str(&content).context("failed to parse export JSON")?;
        Ok(doc)
    }
}
