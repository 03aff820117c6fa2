//! Question import parser.
//!
//! Converts JSON, CSV and plain-text payloads into normalized
//! `ImportedQuestion` records. JSON is all-or-nothing: one bad element
//! rejects the file. CSV rows and text blocks that do not parse are dropped
//! and counted instead.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::model::{ImportedQuestion, OptionLabel, DEFAULT_GROUP};

/// Supported import payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Json,
    Csv,
    Text,
}

impl ImportFormat {
    /// Pick the format from a file's extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::Json => write!(f, "json"),
            ImportFormat::Csv => write!(f, "csv"),
            ImportFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for ImportFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ImportFormat::Json),
            "csv" => Ok(ImportFormat::Csv),
            "txt" | "text" => Ok(ImportFormat::Text),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parsed records plus the number of CSV rows / text blocks that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub questions: Vec<ImportedQuestion>,
    pub skipped: usize,
}

/// Intermediate JSON structure for one imported question.
#[derive(Debug, Deserialize)]
struct JsonQuestion {
    question: String,
    answers: Vec<String>,
    #[serde(default, rename = "correctAnswer")]
    correct_answer: Option<usize>,
    #[serde(default)]
    group: Option<String>,
}

/// Parse `content` in the given format.
pub fn parse_import(content: &str, format: ImportFormat) -> Result<ImportOutcome, ImportError> {
    let outcome = match format {
        ImportFormat::Json => parse_json(content)?,
        ImportFormat::Csv => parse_csv(content),
        ImportFormat::Text => parse_text(content),
    };
    tracing::debug!(
        %format,
        parsed = outcome.questions.len(),
        skipped = outcome.skipped,
        "import parsed"
    );
    Ok(outcome)
}

/// Read a file and parse it according to its extension.
pub fn load_import_file(path: &Path) -> Result<ImportOutcome, ImportError> {
    let format = ImportFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_import(&content, format)
}

/// Parse a JSON array of questions. Any invalid element aborts the parse.
pub fn parse_json(content: &str) -> Result<ImportOutcome, ImportError> {
    let parsed: Vec<JsonQuestion> = serde_json::from_str(content)?;

    let questions = parsed
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            let options: [String; 4] =
                q.answers
                    .try_into()
                    .map_err(|answers: Vec<String>| ImportError::InvalidRecord {
                        index,
                        reason: format!("expected 4 answers, found {}", answers.len()),
                    })?;

            let correct_index = q.correct_answer.unwrap_or(0);
            if correct_index > 3 {
                return Err(ImportError::InvalidRecord {
                    index,
                    reason: format!("correctAnswer out of range: {correct_index}"),
                });
            }

            Ok(ImportedQuestion {
                text: q.question,
                options,
                correct_index,
                group: group_or_default(q.group.as_deref()),
            })
        })
        .collect::<Result<Vec<_>, ImportError>>()?;

    Ok(ImportOutcome {
        questions,
        skipped: 0,
    })
}

/// Parse comma-separated rows: `question,a,b,c,d,correct[,group]`.
///
/// A first line mentioning "question" is treated as a header. Rows with
/// fewer than 6 fields or an unrecognized correct marker are skipped.
pub fn parse_csv(content: &str) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    for (line_no, line) in content.lines().enumerate() {
        if line_no == 0 && line.to_lowercase().contains("question") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(strip_quotes).collect();
        if fields.len() < 6 {
            tracing::warn!(line = line_no + 1, "skipping CSV row with {} fields", fields.len());
            outcome.skipped += 1;
            continue;
        }

        let Some(correct_index) = parse_correct_marker(fields[5]) else {
            tracing::warn!(line = line_no + 1, "skipping CSV row with bad correct marker");
            outcome.skipped += 1;
            continue;
        };

        outcome.questions.push(ImportedQuestion {
            text: fields[0].to_string(),
            options: [
                fields[1].to_string(),
                fields[2].to_string(),
                fields[3].to_string(),
                fields[4].to_string(),
            ],
            correct_index,
            group: group_or_default(fields.get(6).copied()),
        });
    }

    outcome
}

/// Parse blank-line separated blocks:
///
/// ```text
/// What is 2 + 2?
/// A) 3
/// B) 4
/// C) 5
/// D) 6
/// Correct: 1
/// Group: Math
/// ```
///
/// Blocks with fewer than five content lines are skipped.
pub fn parse_text(content: &str) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    for block in split_blocks(content) {
        match parse_text_block(&block) {
            Some(q) => outcome.questions.push(q),
            None => {
                tracing::warn!("skipping text block starting with {:?}", block.first());
                outcome.skipped += 1;
            }
        }
    }

    outcome
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn parse_text_block(lines: &[&str]) -> Option<ImportedQuestion> {
    let mut correct_index = 0;
    let mut group = None;
    let mut content = Vec::new();

    for line in lines {
        let lower = line.to_lowercase();
        if lower.contains("correct:") {
            if let Some(digit) = line.chars().find_map(|c| c.to_digit(10)) {
                correct_index = digit as usize;
            }
        } else if lower.contains("group:") {
            group = line.split_once(':').map(|(_, rest)| rest.trim());
        } else {
            content.push(*line);
        }
    }

    if content.len() < 5 || correct_index > 3 {
        return None;
    }

    Some(ImportedQuestion {
        text: content[0].to_string(),
        options: [
            strip_option_prefix(content[1]).to_string(),
            strip_option_prefix(content[2]).to_string(),
            strip_option_prefix(content[3]).to_string(),
            strip_option_prefix(content[4]).to_string(),
        ],
        correct_index,
        group: group_or_default(group),
    })
}

/// Trim a CSV field and drop one pair of surrounding quotes.
fn strip_quotes(field: &str) -> &str {
    let field = field.trim();
    let field = field.strip_prefix('"').unwrap_or(field);
    field.strip_suffix('"').unwrap_or(field)
}

/// Drop a leading `A)` / `b.` / `C:` option marker.
fn strip_option_prefix(line: &str) -> &str {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(')' | '.' | ':')) if matches!(letter, 'A'..='D' | 'a'..='d') => {
            line[2..].trim_start()
        }
        _ => line,
    }
}

/// Accept an option letter (A-D) or a zero-based digit (0-3).
fn parse_correct_marker(field: &str) -> Option<usize> {
    if let Ok(label) = field.parse::<OptionLabel>() {
        return Some(label.index());
    }
    field.parse::<usize>().ok().filter(|i| *i <= 3)
}

fn group_or_default(group: Option<&str>) -> String {
    match group.map(str::trim) {
        Some(g) if !g.is_empty() => g.to_string(),
        _ => DEFAULT_GROUP.to_string(),
    }
}

/// A warning from import validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// Index of the offending record.
    pub index: usize,
    /// Warning message.
    pub message: String,
}

/// Check parsed records for common authoring mistakes.
pub fn validate_import(questions: &[ImportedQuestion]) -> Vec<ImportWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for (index, q) in questions.iter().enumerate() {
        if !seen.insert(q.text.trim().to_lowercase()) {
            warnings.push(ImportWarning {
                index,
                message: format!("duplicate question: {}", q.text),
            });
        }
    }

    for (index, q) in questions.iter().enumerate() {
        if q.text.trim().is_empty() {
            warnings.push(ImportWarning {
                index,
                message: "question text is empty".into(),
            });
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            warnings.push(ImportWarning {
                index,
                message: "one or more options are empty".into(),
            });
        }
        let distinct: HashSet<&str> = q.options.iter().map(|o| o.trim()).collect();
        if distinct.len() < q.options.len() {
            warnings.push(ImportWarning {
                index,
                message: "options are not distinct".into(),
            });
        }
    }

    warnings
}
