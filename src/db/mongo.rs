use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document as BsonDocument},
    options::ClientOptions,
    Client, Collection, Database,
};
use serde_json::Value;
use tracing::{debug, info};

use super::{Document, DocumentStore, Filter, StoreError};

const DEFAULT_DATABASE: &str = "planb";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// MongoDB-backed store. The driver pools connections internally, so one
/// instance is shared by every request.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("planb-api".into());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let name = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.into());
        let client = Client::with_options(options)?;
        let store = Self {
            db: client.database(&name),
        };

        // The driver connects lazily; ping so an unreachable server fails startup.
        store
            .ping()
            .await
            .map_err(|e| StoreError::Unavailable(format!("ping to database {name:?} failed: {e}")))?;

        info!(database = %name, "connected to MongoDB");
        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.db.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        self.collection(collection).insert_one(to_bson(doc)?).await?;
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(doc! { "_id": id })
            .await?
            .map(from_bson)
            .transpose()
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let mut query = BsonDocument::new();
        for (field, value) in &filter.equals {
            query.insert(storage_field(field), bson::to_bson(value)?);
        }
        debug!(collection, %query, "find");

        let coll = self.collection(collection);
        let mut find = coll.find(query);
        if let Some(field) = &filter.newest_first_by {
            let mut sort = BsonDocument::new();
            sort.insert(storage_field(field), -1);
            find = find.sort(sort);
        }
        if let Some(limit) = filter.limit {
            find = find.limit(limit);
        }

        let docs: Vec<BsonDocument> = find.await?.try_collect().await?;
        docs.into_iter().map(from_bson).collect()
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        upsert: bool,
    ) -> Result<bool, StoreError> {
        let result = self
            .collection(collection)
            .replace_one(doc! { "_id": id }, to_bson(doc)?)
            .upsert(upsert)
            .await?;
        Ok(result.matched_count > 0 || result.upserted_id.is_some())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = self.collection(collection).delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

fn storage_field(field: &str) -> &str {
    if field == "id" {
        "_id"
    } else {
        field
    }
}

fn to_bson(mut doc: Document) -> Result<BsonDocument, StoreError> {
    if let Some(id) = doc.remove("id") {
        doc.insert("_id".into(), id);
    }
    Ok(bson::to_document(&doc)?)
}

fn from_bson(doc: BsonDocument) -> Result<Document, StoreError> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(mut map) => {
            if let Some(id) = map.remove("_id") {
                map.insert("id".into(), id);
            }
            Ok(map)
        }
        _ => Err(StoreError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_is_stored_as_underscore_id() {
        let Value::Object(doc) = json!({ "id": "p1", "symbol": "AAPL", "shares": "10" }) else {
            unreachable!()
        };
        let stored = to_bson(doc).unwrap();
        assert_eq!(stored.get_str("_id").unwrap(), "p1");
        assert!(stored.get("id").is_none());

        let restored = from_bson(stored).unwrap();
        assert_eq!(restored.get("id"), Some(&json!("p1")));
        assert_eq!(restored.get("symbol"), Some(&json!("AAPL")));
        assert!(restored.get("_id").is_none());
    }

    #[test]
    fn numbers_survive_the_bson_trip() {
        let Value::Object(doc) = json!({ "id": "m1", "confidence": 4, "ratio": 0.5 }) else {
            unreachable!()
        };
        let restored = from_bson(to_bson(doc).unwrap()).unwrap();
        assert_eq!(restored.get("confidence").and_then(Value::as_i64), Some(4));
        assert_eq!(restored.get("ratio").and_then(Value::as_f64), Some(0.5));
    }
}
