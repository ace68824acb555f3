use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::store::{Collection, DocumentStore, StoreError};
use crate::filter::FilterData;

/// Typed view of one collection; converts documents through serde.
pub struct Repository<T> {
    collection: Collection,
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection,
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(collection: Collection, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            collection,
            store,
            _phantom: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn insert(&self, record: &T) -> Result<T, StoreError> {
        let stored = self.store.insert(self.collection, serde_json::to_value(record)?).await?;
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_id(self.collection, id)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, StoreError> {
        self.store
            .find(self.collection, filter_data)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn select_one(&self, where_clause: Value) -> Result<Option<T>, StoreError> {
        self.store
            .find_one(self.collection, where_clause)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        self.select_any(FilterData::matching(json!({ "id": { "$in": ids } })))
            .await
    }

    pub async fn count(&self, where_clause: Value) -> Result<u64, StoreError> {
        self.store.count(self.collection, where_clause).await
    }

    /// Applies a JSON object patch and returns the updated record
    pub async fn update(&self, id: Uuid, patch: Value) -> Result<Option<T>, StoreError> {
        let patch = into_object(patch)?;
        self.store
            .update(self.collection, id, patch)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    pub async fn update_many(&self, where_clause: Value, patch: Value) -> Result<u64, StoreError> {
        let patch = into_object(patch)?;
        self.store.update_many(self.collection, where_clause, patch).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(self.collection, id).await
    }
}

fn into_object(patch: Value) -> Result<Map<String, Value>, StoreError> {
    match patch {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidDocument("patch must be an object".to_string())),
    }
}
