//! In-process store used by the test suite.

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        RwLock,
    },
};

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentStore, Filter, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Makes every subsequent call fail as if the database went away.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        self.check()?;
        let mut collections = self.collections.write().expect("memory store lock poisoned");
        collections.entry(collection.to_string()).or_default().push(doc);
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().expect("memory store lock poisoned");
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().expect("memory store lock poisoned");
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.equals.iter().all(|(field, value)| doc.get(field) == Some(value)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &filter.newest_first_by {
            found.sort_by(|a, b| compare(b.get(field), a.get(field)));
        }
        if let Some(limit) = filter.limit {
            found.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(found)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        upsert: bool,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let mut collections = self.collections.write().expect("memory store lock poisoned");
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| id_of(d) == Some(id)) {
            Some(existing) => {
                *existing = doc;
                Ok(true)
            }
            None if upsert => {
                docs.push(doc);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.check()?;
        let mut collections = self.collections.write().expect("memory store lock poisoned");
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| id_of(d) != Some(id));
        Ok(docs.len() != before)
    }
}
