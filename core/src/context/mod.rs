//! Shared record passed between phases.
//!
//! Phases in the same wave may touch the record concurrently. Each handler
//! gets a [`ContextView`] carrying the set of fields it declared as writable;
//! writes outside that set are refused, and the executor checks at build time
//! that no two phases able to share a wave declare the same field.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::error::ContextError;

/// Set of shared-context field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet(BTreeSet<&'static str>);

impl FieldSet {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn of(fields: &[&'static str]) -> Self {
        fields.iter().copied().collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    /// First field present in both sets.
    pub fn overlap(&self, other: &FieldSet) -> Option<&'static str> {
        self.0.intersection(&other.0).next().copied()
    }
}

impl FromIterator<&'static str> for FieldSet {
    fn from_iter<I: IntoIterator<Item = &'static str>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for FieldSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<none>");
        }
        let fields: Vec<&str> = self.iter().collect();
        f.write_str(&fields.join(", "))
    }
}

/// Record shared by every phase of one run.
#[derive(Debug, Default)]
pub struct SharedRecord<R> {
    inner: Arc<RwLock<R>>,
}

impl<R> Clone for SharedRecord<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Send + Sync> SharedRecord<R> {
    pub fn new(record: R) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    /// View that may write exactly `writes`.
    pub fn view(&self, writes: FieldSet) -> ContextView<R> {
        ContextView {
            record: self.clone(),
            writes,
        }
    }

    /// Read-only view.
    pub fn reader(&self) -> ContextView<R> {
        self.view(FieldSet::empty())
    }

    pub async fn snapshot(&self) -> R
    where
        R: Clone,
    {
        self.inner.read().await.clone()
    }
}

/// A handler's window onto the shared record.
#[derive(Debug)]
pub struct ContextView<R> {
    record: SharedRecord<R>,
    writes: FieldSet,
}

impl<R> Clone for ContextView<R> {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<R: Send + Sync> ContextView<R> {
    pub fn writes(&self) -> &FieldSet {
        &self.writes
    }

    pub fn can_write(&self, field: &str) -> bool {
        self.writes.contains(field)
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, R> {
        self.record.inner.read().await
    }

    /// Run `f` against the record under the write lock.
    ///
    /// The lock is held for the whole closure, so a read-modify-write of the
    /// named field is atomic with respect to other phases.
    pub async fn write<T>(
        &self,
        field: &'static str,
        f: impl FnOnce(&mut R) -> T,
    ) -> Result<T, ContextError> {
        if !self.writes.contains(field) {
            return Err(ContextError::WriteNotPermitted {
                field: field.to_string(),
                allowed: self.writes.to_string(),
            });
        }
        let mut guard = self.record.inner.write().await;
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Draft {
        images: Vec<String>,
        voice: Vec<String>,
    }

    #[tokio::test]
    async fn test_write_within_capability() {
        let record = SharedRecord::new(Draft::default());
        let view = record.view(FieldSet::of(&["images"]));

        view.write("images", |d| d.images.push("a.png".into()))
            .await
            .unwrap();

        assert_eq!(record.snapshot().await.images, vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_write_outside_capability_is_refused() {
        let record = SharedRecord::new(Draft::default());
        let view = record.view(FieldSet::of(&["images"]));

        let err = view
            .write("voice", |d| d.voice.push("intro.mp3".into()))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ContextError::WriteNotPermitted {
                field: "voice".into(),
                allowed: "images".into(),
            }
        );
        assert!(record.snapshot().await.voice.is_empty());
    }

    #[tokio::test]
    async fn test_reader_sees_sibling_writes() {
        let record = SharedRecord::new(Draft::default());
        let writer = record.view(FieldSet::of(&["voice"]));
        let reader = record.reader();

        writer
            .write("voice", |d| d.voice.push("outro.mp3".into()))
            .await
            .unwrap();

        assert_eq!(reader.read().await.voice.len(), 1);
        assert!(!reader.can_write("voice"));
    }

    #[test]
    fn test_field_set_overlap() {
        let a = FieldSet::of(&["images", "status"]);
        let b = FieldSet::of(&["voice", "status"]);
        let c = FieldSet::of(&["voice"]);

        assert_eq!(a.overlap(&b), Some("status"));
        assert_eq!(a.overlap(&c), None);
        assert_eq!(FieldSet::empty().to_string(), "<none>");
    }
}
