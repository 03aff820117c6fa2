//! Backend trait definitions.
//!
//! The backend is a document-collection store reached through generic
//! list/create/update/delete calls. These async traits are implemented by
//! the `quizforge-store` crate (in-memory, JSON file and REST backends).

use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Attempt, Group, Question, Test, UserAnswer};

// ---------------------------------------------------------------------------
// Collections and records
// ---------------------------------------------------------------------------

/// The backend collections consumed by quizforge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tests,
    Questions,
    Groups,
    Attempts,
    Answers,
}

impl Collection {
    /// Name of the collection on the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Tests => "tests",
            Collection::Questions => "questions",
            Collection::Groups => "groups",
            Collection::Attempts => "test_attempts",
            Collection::Answers => "user_answers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record stored in one backend collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in.
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

// ---------------------------------------------------------------------------
// List queries
// ---------------------------------------------------------------------------

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// An equality filter on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Filter/order/limit options accepted by `Repository::list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    /// All filters must match.
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Field and direction to order by.
    #[serde(default)]
    pub order: Option<(String, Direction)>,
    /// Maximum number of records returned.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListQuery {
    /// A query that returns the whole collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Order by `field`.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `record` satisfies every filter.
    pub fn matches(&self, record: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| record.get(&f.field) == Some(&f.value))
    }

    /// Apply filters, ordering and limit to an in-memory list of records.
    ///
    /// Used by backends that keep collections in memory. Records that fail
    /// to serialize are dropped.
    pub fn apply<T: Record>(&self, records: &[T]) -> Vec<T> {
        let mut selected: Vec<(Value, T)> = records
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok().map(|v| (v, r.clone())))
            .filter(|(v, _)| self.matches(v))
            .collect();

        if let Some((field, direction)) = &self.order {
            // Stable sort keeps insertion order among equal keys
            selected.sort_by(|(a, _), (b, _)| {
                let ord = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        let iter = selected.into_iter().map(|(_, r)| r);
        match self.limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }
}

/// Total order over optional JSON scalars: missing/null first, then bools,
/// numbers, strings. Two strings that both parse as RFC 3339 timestamps
/// compare as instants, since the fraction digits vary in width.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Repository / Backend traits
// ---------------------------------------------------------------------------

/// Generic CRUD access to one backend collection.
///
/// Implementations return `StoreError` wrapped in `anyhow::Error`.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// List records matching the query.
    async fn list(&self, query: &ListQuery) -> anyhow::Result<Vec<T>>;

    /// Fetch a single record by id, `None` if it does not exist.
    async fn get(&self, id: &str) -> anyhow::Result<Option<T>>;

    /// Insert a record. An empty id is replaced by a generated one.
    async fn create(&self, record: T) -> anyhow::Result<T>;

    /// Replace the record with the given id.
    async fn update(&self, id: &str, record: T) -> anyhow::Result<T>;

    /// Delete the record with the given id.
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

/// The external backend: one repository per collection.
pub trait Backend: Send + Sync {
    /// Human-readable backend name (e.g. "memory").
    fn name(&self) -> &str;

    fn tests(&self) -> &dyn Repository<Test>;

    fn questions(&self) -> &dyn Repository<Question>;

    fn groups(&self) -> &dyn Repository<Group>;

    fn attempts(&self) -> &dyn Repository<Attempt>;

    fn answers(&self) -> &dyn Repository<UserAnswer>;
}
