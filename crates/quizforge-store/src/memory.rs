//! In-memory backend for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use quizforge_core::error::StoreError;
use quizforge_core::model::{Attempt, Group, Question, Test, UserAnswer};
use quizforge_core::traits::{Backend, ListQuery, Record, Repository};

/// One collection held in a `Vec`, in insertion order.
pub struct MemoryCollection<T> {
    records: Mutex<Vec<T>>,
    list_calls: AtomicU32,
    write_calls: AtomicU32,
    offline: Arc<AtomicBool>,
    /// Reject writes to this collection only.
    read_only: AtomicBool,
}

impl<T: Record> MemoryCollection<T> {
    fn new(offline: Arc<AtomicBool>) -> Self {
        Self::with_records(Vec::new(), offline)
    }

    pub(crate) fn with_records(records: Vec<T>, offline: Arc<AtomicBool>) -> Self {
        Self {
            records: Mutex::new(records),
            list_calls: AtomicU32::new(0),
            write_calls: AtomicU32::new(0),
            offline,
            read_only: AtomicBool::new(false),
        }
    }

    /// Number of `list` calls made so far.
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Number of `create`/`update`/`delete` calls made so far.
    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::Relaxed)
    }

    /// Copy of every stored record.
    pub fn records(&self) -> Vec<T> {
        self.lock().clone()
    }

    /// Replace the stored records without counting a write.
    pub fn replace_all(&self, records: Vec<T>) {
        *self.lock() = records;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make writes to this collection fail with `StoreError::Offline`
    /// while reads keep working.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        self.check_online()?;
        if self.read_only.load(Ordering::Relaxed) {
            Err(StoreError::Offline)
        } else {
            Ok(())
        }
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) {
            Err(StoreError::Offline)
        } else {
            Ok(())
        }
    }

    fn not_found(id: &str) -> StoreError {
        StoreError::NotFound {
            collection: T::COLLECTION.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn list_now(&self, query: &ListQuery) -> Result<Vec<T>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        Ok(query.apply(&self.lock()))
    }

    pub(crate) fn get_now(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.check_online()?;
        Ok(self.lock().iter().find(|r| r.id() == id).cloned())
    }

    pub(crate) fn create_now(&self, mut record: T) -> Result<T, StoreError> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        self.check_writable()?;
        if record.id().is_empty() {
            record.set_id(Uuid::new_v4().to_string());
        }

        let mut records = self.lock();
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::Http {
                status: 409,
                message: format!("duplicate key {} in {}", record.id(), T::COLLECTION),
            });
        }
        records.push(record.clone());
        Ok(record)
    }

    pub(crate) fn update_now(&self, id: &str, mut record: T) -> Result<T, StoreError> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        self.check_writable()?;
        record.set_id(id.to_string());

        let mut records = self.lock();
        let slot = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        *slot = record.clone();
        Ok(record)
    }

    pub(crate) fn delete_now(&self, id: &str) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        self.check_writable()?;

        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryCollection<T> {
    async fn list(&self, query: &ListQuery) -> anyhow::Result<Vec<T>> {
        Ok(self.list_now(query)?)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<T>> {
        Ok(self.get_now(id)?)
    }

    async fn create(&self, record: T) -> anyhow::Result<T> {
        Ok(self.create_now(record)?)
    }

    async fn update(&self, id: &str, record: T) -> anyhow::Result<T> {
        Ok(self.update_now(id, record)?)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        Ok(self.delete_now(id)?)
    }
}

/// A backend that keeps every collection in memory.
///
/// Counts calls per collection and can be switched offline so tests can
/// exercise backend failures without a network.
pub struct InMemoryBackend {
    pub tests: MemoryCollection<Test>,
    pub questions: MemoryCollection<Question>,
    pub groups: MemoryCollection<Group>,
    pub attempts: MemoryCollection<Attempt>,
    pub answers: MemoryCollection<UserAnswer>,
    offline: Arc<AtomicBool>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let offline = Arc::new(AtomicBool::new(false));
        Self {
            tests: MemoryCollection::new(Arc::clone(&offline)),
            questions: MemoryCollection::new(Arc::clone(&offline)),
            groups: MemoryCollection::new(Arc::clone(&offline)),
            attempts: MemoryCollection::new(Arc::clone(&offline)),
            answers: MemoryCollection::new(Arc::clone(&offline)),
            offline,
        }
    }

    /// Make every subsequent call fail with `StoreError::Offline`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn tests(&self) -> &dyn Repository<Test> {
        &self.tests
    }

    fn questions(&self) -> &dyn Repository<Question> {
        &self.questions
    }

    fn groups(&self) -> &dyn Repository<Group> {
        &self.groups
    }

    fn attempts(&self) -> &dyn Repository<Attempt> {
        &self.attempts
    }

    fn answers(&self) -> &dyn Repository<UserAnswer> {
        &self.answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quizforge_core::traits::Direction;

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            owner_id: "u1".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_generates_missing_id() {
        let backend = InMemoryBackend::new();
        let created = backend.groups().create(group("", "Math")).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(
            backend.groups().get(&created.id).await.unwrap(),
            Some(created)
        );
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let backend = InMemoryBackend::new();
        backend.groups().create(group("g1", "Math")).await.unwrap();
        let err = backend.groups().create(group("g1", "Other")).await.unwrap_err();
        assert!(err.to_string().contains("409"));
    }

    #[tokio::test]
    async fn list_applies_query() {
        let backend = InMemoryBackend::new();
        for (id, name) in [("g1", "Math"), ("g2", "Art"), ("g3", "Science")] {
            backend.groups().create(group(id, name)).await.unwrap();
        }
        let listed = backend
            .groups()
            .list(&ListQuery::all().order_by("name", Direction::Asc).limit(2))
            .await
            .unwrap();
        let names: Vec<&str> = listed.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Art", "Math"]);
        assert_eq!(backend.groups.list_calls(), 1);
        assert_eq!(backend.groups.write_calls(), 3);
    }

    #[tokio::test]
    async fn update_and_delete_missing_record() {
        let backend = InMemoryBackend::new();
        let err = backend
            .groups()
            .update("nope", group("nope", "x"))
            .await
            .unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().unwrap();
        assert!(store_err.is_not_found());

        let err = backend.groups().delete("nope").await.unwrap_err();
        assert!(err.downcast_ref::<StoreError>().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn update_replaces_record() {
        let backend = InMemoryBackend::new();
        backend.groups().create(group("g1", "Math")).await.unwrap();
        let updated = backend
            .groups()
            .update("g1", group("ignored", "Maths"))
            .await
            .unwrap();
        assert_eq!(updated.id, "g1");
        assert_eq!(backend.groups.records()[0].name, "Maths");
    }

    #[tokio::test]
    async fn offline_backend_fails_every_call() {
        let backend = InMemoryBackend::new();
        backend.set_offline(true);
        let err = backend.tests().list(&ListQuery::all()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Offline)
        ));
        assert!(backend.groups().create(group("g1", "Math")).await.is_err());
        assert_eq!(backend.tests.list_calls(), 1);

        backend.set_offline(false);
        assert!(backend.tests().list(&ListQuery::all()).await.unwrap().is_empty());
    }
}
