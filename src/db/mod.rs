//! Document store access.
//!
//! Handlers never talk to MongoDB directly: they go through a
//! [`DocumentStore`] trait object held in application state, usually wrapped
//! in a typed [`Repository`].

use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

#[cfg(test)]
pub mod memory;
mod mongo;

pub use mongo::MongoStore;

/// A stored document: a JSON object whose `id` field is the primary key.
pub type Document = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("could not encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document is not an object")]
    NotAnObject,

    #[error("database unavailable: {0}")]
    Unavailable(String),
}

/// Equality filter with optional newest-first ordering and a limit.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub equals: Vec<(String, Value)>,
    pub newest_first_by: Option<String>,
    pub limit: Option<i64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals.push((field.to_string(), value.into()));
        self
    }

    pub fn newest_first(mut self, field: &str) -> Self {
        self.newest_first_by = Some(field.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Replaces the document with the given id. Returns whether a document
    /// was matched (or created, when `upsert` is set).
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        upsert: bool,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// A document type living in its own collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub async fn insert(&self, record: &T) -> Result<(), StoreError> {
        self.store.insert(T::COLLECTION, to_document(record)?).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn replace(&self, record: &T) -> Result<bool, StoreError> {
        self.store
            .replace(T::COLLECTION, record.id(), to_document(record)?, false)
            .await
    }

    pub async fn upsert(&self, record: &T) -> Result<(), StoreError> {
        self.store
            .replace(T::COLLECTION, record.id(), to_document(record)?, true)
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }
}

fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

pub async fn connect(config: &Config) -> Result<MongoStore, StoreError> {
    MongoStore::connect(&config.mongodb_uri).await
}
