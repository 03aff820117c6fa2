//! Core data model types for quizforge.
//!
//! These are the records stored in the backend collections (tests,
//! questions, groups, attempts, user answers) plus the normalized shape
//! produced by the import parser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::traits::{Collection, Record};

/// Group name applied when an imported question does not name one.
pub const DEFAULT_GROUP: &str = "General";

/// One of the four option markers of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    /// All labels in option order.
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    /// Label for a zero-based option index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Zero-based option index.
    pub fn index(self) -> usize {
        match self {
            OptionLabel::A => 0,
            OptionLabel::B => 1,
            OptionLabel::C => 2,
            OptionLabel::D => 3,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionLabel::A => write!(f, "A"),
            OptionLabel::B => write!(f, "B"),
            OptionLabel::C => write!(f, "C"),
            OptionLabel::D => write!(f, "D"),
        }
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            other => Err(format!("unknown option label: {other}")),
        }
    }
}

/// A test that users can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Inactive tests cannot be started.
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// User who created the test.
    pub owner_id: String,
}

fn default_true() -> bool {
    true
}

/// A multiple-choice question belonging to exactly one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub test_id: String,
    /// Group label, by name.
    #[serde(default = "default_group")]
    pub group: String,
    pub text: String,
    pub options: [String; 4],
    pub correct: OptionLabel,
    pub created_at: DateTime<Utc>,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

impl Question {
    /// Text of the option behind `label`.
    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }
}

/// A user-defined label organizing questions by topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted test attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub test_id: String,
    pub user_id: String,
    pub correct_count: u32,
    pub total_questions: u32,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
    /// `None` while the attempt is in progress.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// The answer a user gave to one question within an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub user_id: String,
    pub selected: OptionLabel,
    pub is_correct: bool,
    pub time_spent_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// A signed-in user as reported by the auth hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A question as produced by the import parser, before it belongs to a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedQuestion {
    pub text: String,
    pub options: [String; 4],
    /// Zero-based index of the correct option.
    pub correct_index: usize,
    pub group: String,
}

impl ImportedQuestion {
    /// Correct option as a label, `None` when the index is past `D`.
    pub fn correct_label(&self) -> Option<OptionLabel> {
        OptionLabel::from_index(self.correct_index)
    }
}

impl Record for Test {
    const COLLECTION: Collection = Collection::Tests;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for Question {
    const COLLECTION: Collection = Collection::Questions;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for Group {
    const COLLECTION: Collection = Collection::Groups;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for Attempt {
    const COLLECTION: Collection = Collection::Attempts;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for UserAnswer {
    const COLLECTION: Collection = Collection::Answers;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
