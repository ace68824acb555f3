use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{document_id, strip_id, validate_counter_field, Collection, DocumentStore, StoreError};
use crate::filter::{Filter, FilterData};

/// Process-local store. Documents live in insertion order per collection and
/// every mutation runs under the write lock, which makes single-document
/// read-check-write sequences atomic.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        collection: Collection,
        documents: &[Value],
        candidate: &Value,
        candidate_id: Uuid,
    ) -> Result<(), StoreError> {
        for field in collection.unique_fields() {
            let value = match candidate.get(*field) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let taken = documents.iter().any(|existing| {
                existing.get(*field) == Some(value)
                    && document_id(existing).map_or(true, |id| id != candidate_id)
            });
            if taken {
                return Err(StoreError::Duplicate {
                    collection,
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    fn position(documents: &[Value], id: Uuid) -> Option<usize> {
        let id = id.to_string();
        documents
            .iter()
            .position(|d| d.get("id").and_then(Value::as_str) == Some(id.as_str()))
    }

    fn merge(target: &mut Value, patch: &Map<String, Value>) {
        if let Value::Object(obj) = target {
            for (key, value) in patch {
                obj.insert(key.clone(), value.clone());
            }
        }
    }

    fn add_to_counter(document: &mut Value, field: &str, delta: i64) {
        let current = document.get(field).and_then(Value::as_i64).unwrap_or(0);
        if let Value::Object(obj) = document {
            obj.insert(field.to_string(), Value::from(current + delta));
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, collection: Collection, document: Value) -> Result<Value, StoreError> {
        if !document.is_object() {
            return Err(StoreError::InvalidDocument("document must be an object".to_string()));
        }
        let id = document_id(&document)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        if Self::position(documents, id).is_some() {
            return Err(StoreError::Duplicate {
                collection,
                field: "id".to_string(),
            });
        }
        Self::check_unique(collection, documents, &document, id)?;
        documents.push(document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| Self::position(docs, id).map(|i| docs[i].clone())))
    }

    async fn find(&self, collection: Collection, filter: FilterData) -> Result<Vec<Value>, StoreError> {
        let filter = Filter::from_data(collection.as_str(), filter)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| filter.apply(docs))
            .unwrap_or_default())
    }

    async fn count(&self, collection: Collection, where_clause: Value) -> Result<u64, StoreError> {
        let filter = Filter::from_data(collection.as_str(), FilterData::matching(where_clause))?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let patch = strip_id(patch);
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        let index = match Self::position(documents, id) {
            Some(index) => index,
            None => return Ok(None),
        };

        let mut updated = documents[index].clone();
        Self::merge(&mut updated, &patch);
        Self::check_unique(collection, documents, &updated, id)?;
        documents[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn update_many(
        &self,
        collection: Collection,
        where_clause: Value,
        patch: Map<String, Value>,
    ) -> Result<u64, StoreError> {
        let filter = Filter::from_data(collection.as_str(), FilterData::matching(where_clause))?;
        let patch = strip_id(patch);
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();

        let mut changed = 0;
        for document in documents.iter_mut().filter(|d| filter.matches(d)) {
            Self::merge(document, &patch);
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        match Self::position(documents, id) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn decrement_if_available(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        amount: i64,
    ) -> Result<Option<Value>, StoreError> {
        validate_counter_field(field)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        let Some(index) = Self::position(documents, id) else {
            return Ok(None);
        };

        let document = &mut documents[index];
        let available = document.get(field).and_then(Value::as_i64).unwrap_or(0);
        if available < amount {
            return Ok(None);
        }
        Self::add_to_counter(document, field, -amount);
        Ok(Some(document.clone()))
    }

    async fn increment(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        amount: i64,
    ) -> Result<Option<Value>, StoreError> {
        validate_counter_field(field)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        let Some(index) = Self::position(documents, id) else {
            return Ok(None);
        };

        let document = &mut documents[index];
        Self::add_to_counter(document, field, amount);
        Ok(Some(document.clone()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let _ = self.collections.read().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn doc(fields: Value) -> Value {
        let mut value = json!({ "id": Uuid::new_v4().to_string() });
        if let (Value::Object(target), Value::Object(extra)) = (&mut value, fields) {
            target.extend(extra);
        }
        value
    }

    fn id_of(value: &Value) -> Uuid {
        Uuid::parse_str(value["id"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn insert_enforces_unique_fields() {
        let store = MemoryStore::new();
        store.insert(Collection::Shops, doc(json!({ "shopName": "acme" }))).await.unwrap();
        let err = store
            .insert(Collection::Shops, doc(json!({ "shopName": "acme" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field, .. } if field == "shopName"));

        // Non-unique collections accept repeated values
        store.insert(Collection::Products, doc(json!({ "name": "a" }))).await.unwrap();
        store.insert(Collection::Products, doc(json!({ "name": "a" }))).await.unwrap();
        assert_eq!(store.count(Collection::Products, json!({ "name": "a" })).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_id() {
        let store = MemoryStore::new();
        let inserted = store
            .insert(Collection::Categories, doc(json!({ "name": "Shoes", "sortOrder": 1 })))
            .await
            .unwrap();
        let id = id_of(&inserted);

        let mut patch = Map::new();
        patch.insert("name".into(), json!("Boots"));
        patch.insert("id".into(), json!(Uuid::new_v4().to_string()));
        let updated = store.update(Collection::Categories, id, patch).await.unwrap().unwrap();

        assert_eq!(updated["name"], "Boots");
        assert_eq!(updated["sortOrder"], 1);
        assert_eq!(id_of(&updated), id);
        assert!(store.update(Collection::Categories, Uuid::new_v4(), Map::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_cannot_steal_a_unique_value() {
        let store = MemoryStore::new();
        store.insert(Collection::Users, doc(json!({ "email": "a@x.io" }))).await.unwrap();
        let second = store.insert(Collection::Users, doc(json!({ "email": "b@x.io" }))).await.unwrap();

        let mut patch = Map::new();
        patch.insert("email".into(), json!("a@x.io"));
        let result = store.update(Collection::Users, id_of(&second), patch).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn conditional_decrement_never_goes_negative() {
        let store = MemoryStore::new();
        let product = store.insert(Collection::Products, doc(json!({ "stock": 3 }))).await.unwrap();
        let id = id_of(&product);

        let after = store
            .decrement_if_available(Collection::Products, id, "stock", 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after["stock"], 1);
        assert!(store
            .decrement_if_available(Collection::Products, id, "stock", 2)
            .await
            .unwrap()
            .is_none());

        let restored = store.increment(Collection::Products, id, "stock", 2).await.unwrap().unwrap();
        assert_eq!(restored["stock"], 3);
    }

    #[tokio::test]
    async fn concurrent_decrements_admit_exactly_the_available_quantity() {
        let store = Arc::new(MemoryStore::new());
        let product = store.insert(Collection::Products, doc(json!({ "stock": 5 }))).await.unwrap();
        let id = id_of(&product);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .decrement_if_available(Collection::Products, id, "stock", 1)
                        .await
                        .unwrap()
                        .is_some()
                })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
        let left = store.find_by_id(Collection::Products, id).await.unwrap().unwrap();
        assert_eq!(left["stock"], 0);
    }

    #[tokio::test]
    async fn update_many_and_find_with_filters() {
        let store = MemoryStore::new();
        for (user, read) in [("u1", false), ("u1", false), ("u2", false)] {
            store
                .insert(Collection::Notifications, doc(json!({ "user": user, "isRead": read })))
                .await
                .unwrap();
        }

        let mut patch = Map::new();
        patch.insert("isRead".into(), json!(true));
        let changed = store
            .update_many(Collection::Notifications, json!({ "user": "u1", "isRead": false }), patch)
            .await
            .unwrap();
        assert_eq!(changed, 2);

        let unread = store
            .find(Collection::Notifications, FilterData::matching(json!({ "isRead": false })))
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0]["user"], "u2");
    }

    #[tokio::test]
    async fn delete_and_invalid_documents() {
        let store = MemoryStore::new();
        let d = store.insert(Collection::Orders, doc(json!({ "orderNumber": "ORD-1" }))).await.unwrap();
        assert!(store.delete(Collection::Orders, id_of(&d)).await.unwrap());
        assert!(!store.delete(Collection::Orders, id_of(&d)).await.unwrap());

        let missing_id = store.insert(Collection::Orders, json!({ "orderNumber": "x" })).await;
        assert!(matches!(missing_id, Err(StoreError::InvalidDocument(_))));
        let bad_field = store.increment(Collection::Orders, id_of(&d), "a.b", 1).await;
        assert!(matches!(bad_field, Err(StoreError::InvalidField(_))));
    }
}
