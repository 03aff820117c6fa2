//! JSON file backend.
//!
//! Collections live in memory and the whole set is written back to a
//! single JSON snapshot after every write. A write whose snapshot cannot
//! be saved is rolled back in memory.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quizforge_core::error::StoreError;
use quizforge_core::model::{Attempt, Group, Question, Test, UserAnswer};
use quizforge_core::report::CollectionSnapshot;
use quizforge_core::traits::{Backend, ListQuery, Record, Repository};

use crate::memory::MemoryCollection;

struct Shared {
    path: PathBuf,
    tests: MemoryCollection<Test>,
    questions: MemoryCollection<Question>,
    groups: MemoryCollection<Group>,
    attempts: MemoryCollection<Attempt>,
    answers: MemoryCollection<UserAnswer>,
    /// Held for the whole apply-then-flush of a write.
    write_lock: Mutex<()>,
}

impl Shared {
    fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            tests: self.tests.records(),
            questions: self.questions.records(),
            groups: self.groups.records(),
            attempts: self.attempts.records(),
            answers: self.answers.records(),
        }
    }

    /// Write the snapshot file. Callers hold `write_lock`.
    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "data file written");
        Ok(())
    }
}

/// A collection of a `JsonFileBackend`.
pub struct FileCollection<T> {
    shared: Arc<Shared>,
    select: fn(&Shared) -> &MemoryCollection<T>,
}

impl<T: Record> FileCollection<T> {
    fn inner(&self) -> &MemoryCollection<T> {
        (self.select)(&self.shared)
    }

    /// Apply `op` and flush. If the flush fails the collection is restored
    /// to its records from before `op`.
    fn write<R>(
        &self,
        op: impl FnOnce(&MemoryCollection<T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.shared.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let collection = self.inner();
        let before = collection.records();
        let out = op(collection)?;
        if let Err(e) = self.shared.flush() {
            tracing::warn!(path = %self.shared.path.display(), error = %e, "flush failed, write rolled back");
            collection.replace_all(before);
            return Err(e);
        }
        Ok(out)
    }
}

#[async_trait]
impl<T: Record> Repository<T> for FileCollection<T> {
    async fn list(&self, query: &ListQuery) -> anyhow::Result<Vec<T>> {
        Ok(self.inner().list_now(query)?)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<T>> {
        Ok(self.inner().get_now(id)?)
    }

    async fn create(&self, record: T) -> anyhow::Result<T> {
        Ok(self.write(|c| c.create_now(record))?)
    }

    async fn update(&self, id: &str, record: T) -> anyhow::Result<T> {
        Ok(self.write(|c| c.update_now(id, record))?)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        Ok(self.write(|c| c.delete_now(id))?)
    }
}

/// Backend persisted to a local JSON file.
pub struct JsonFileBackend {
    shared: Arc<Shared>,
    tests: FileCollection<Test>,
    questions: FileCollection<Question>,
    groups: FileCollection<Group>,
    attempts: FileCollection<Attempt>,
    answers: FileCollection<UserAnswer>,
}

impl JsonFileBackend {
    /// Open the data file at `path`. A missing file starts out empty and is
    /// created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str::<CollectionSnapshot>(&content)?
        } else {
            CollectionSnapshot::default()
        };
        tracing::debug!(
            path = %path.display(),
            tests = snapshot.tests.len(),
            questions = snapshot.questions.len(),
            attempts = snapshot.attempts.len(),
            "data file loaded"
        );

        let offline = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(Shared {
            path,
            tests: MemoryCollection::with_records(snapshot.tests, Arc::clone(&offline)),
            questions: MemoryCollection::with_records(snapshot.questions, Arc::clone(&offline)),
            groups: MemoryCollection::with_records(snapshot.groups, Arc::clone(&offline)),
            attempts: MemoryCollection::with_records(snapshot.attempts, Arc::clone(&offline)),
            answers: MemoryCollection::with_records(snapshot.answers, offline),
            write_lock: Mutex::new(()),
        });

        Ok(Self {
            tests: FileCollection {
                shared: Arc::clone(&shared),
                select: |s| &s.tests,
            },
            questions: FileCollection {
                shared: Arc::clone(&shared),
                select: |s| &s.questions,
            },
            groups: FileCollection {
                shared: Arc::clone(&shared),
                select: |s| &s.groups,
            },
            attempts: FileCollection {
                shared: Arc::clone(&shared),
                select: |s| &s.attempts,
            },
            answers: FileCollection {
                shared: Arc::clone(&shared),
                select: |s| &s.answers,
            },
            shared,
        })
    }

    /// Location of the data file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }
}

impl Backend for JsonFileBackend {
    fn name(&self) -> &str {
        "file"
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
    use quizforge_core::model::OptionLabel;

    fn test_record(title: &str) -> Test {
        Test {
            id: String::new(),
            title: title.into(),
            description: String::new(),
            is_active: true,
            created_at: Utc::now(),
            owner_id: "u1".into(),
        }
    }

    #[tokio::test]
    async fn missing_file_starts_empty_and_is_created_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let backend = JsonFileBackend::open(&path).unwrap();
        assert!(backend.tests().list(&ListQuery::all()).await.unwrap().is_empty());
        assert!(!path.exists());

        backend.tests().create(test_record("Algebra")).await.unwrap();
        assert!(path.exists());
        assert_eq!(backend.path(), path.as_path());
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let test_id = {
            let backend = JsonFileBackend::open(&path).unwrap();
            let test = backend.tests().create(test_record("Algebra")).await.unwrap();
            backend
                .questions()
                .create(Question {
                    id: String::new(),
                    test_id: test.id.clone(),
                    group: "Math".into(),
                    text: "1 + 1?".into(),
                    options: ["1".into(), "2".into(), "3".into(), "4".into()],
                    correct: OptionLabel::B,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            let doomed = backend.tests().create(test_record("Doomed")).await.unwrap();
            backend.tests().delete(&doomed.id).await.unwrap();
            test.id
        };

        let reopened = JsonFileBackend::open(&path).unwrap();
        let tests = reopened.tests().list(&ListQuery::all()).await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].id, test_id);
        let questions = reopened
            .questions()
            .list(&ListQuery::all().eq("test_id", test_id.as_str()))
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct, OptionLabel::B);
    }

    #[tokio::test]
    async fn failed_write_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let backend = JsonFileBackend::open(&path).unwrap();
        let err = backend.tests().delete("missing").await.unwrap_err();
        assert!(err.downcast_ref::<StoreError>().unwrap().is_not_found());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "not json").unwrap();
        let err = JsonFileBackend::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn failed_flush_rolls_back_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a regular file").unwrap();
        let backend = JsonFileBackend::open(blocker.join("data.json")).unwrap();

        let err = backend.tests().create(test_record("Algebra")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Io(_))));
        assert!(backend.tests().list(&ListQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_flush_keeps_previous_records() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let backend = JsonFileBackend::open(data_dir.join("data.json")).unwrap();
        let kept = backend.tests().create(test_record("Kept")).await.unwrap();

        // Swap the data directory for a file so the next flush fails
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, "blocker").unwrap();

        let mut renamed = kept.clone();
        renamed.title = "Renamed".into();
        assert!(backend.tests().update(&kept.id, renamed).await.is_err());
        assert!(backend.tests().delete(&kept.id).await.is_err());

        let tests = backend.tests().list(&ListQuery::all()).await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].title, "Kept");
    }
}
