use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{FilterData, FilterError};

/// Named document collections. Each maps to one table in PostgreSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Shops,
    Products,
    Orders,
    Categories,
    Notifications,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Shops,
        Collection::Products,
        Collection::Orders,
        Collection::Categories,
        Collection::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Shops => "shops",
            Collection::Products => "products",
            Collection::Orders => "orders",
            Collection::Categories => "categories",
            Collection::Notifications => "notifications",
        }
    }

    /// Top-level fields with a unique index
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["email"],
            Collection::Shops => &["shopName"],
            Collection::Orders => &["orderNumber"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate value for {collection}.{field}")]
    Duplicate { collection: Collection, field: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistent JSON document collections.
///
/// Every document is a JSON object carrying a UUID `id`. Single-document
/// writes are atomic; `decrement_if_available` is the conditional update used
/// to reserve stock without overselling.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Inserts `document`, enforcing the collection's unique fields
    async fn insert(&self, collection: Collection, document: Value) -> Result<Value, StoreError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError>;

    async fn find(&self, collection: Collection, filter: FilterData) -> Result<Vec<Value>, StoreError>;

    async fn find_one(&self, collection: Collection, where_clause: Value) -> Result<Option<Value>, StoreError> {
        let mut found = self
            .find(collection, FilterData::matching(where_clause).page(1, 0))
            .await?;
        Ok(found.pop())
    }

    async fn count(&self, collection: Collection, where_clause: Value) -> Result<u64, StoreError>;

    /// Shallow-merges `patch` into the document. `id` in the patch is ignored.
    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    async fn update_many(
        &self,
        collection: Collection,
        where_clause: Value,
        patch: Map<String, Value>,
    ) -> Result<u64, StoreError>;

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError>;

    /// Atomically subtracts `amount` from the integer `field` only when the
    /// current value is at least `amount`. Returns the updated document, or
    /// `None` when the document is missing or the value is too small.
    async fn decrement_if_available(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        amount: i64,
    ) -> Result<Option<Value>, StoreError>;

    /// Atomically adds `amount` to the integer `field`
    async fn increment(
        &self,
        collection: Collection,
        id: Uuid,
        field: &str,
        amount: i64,
    ) -> Result<Option<Value>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Counter fields must be plain top-level names
pub(crate) fn validate_counter_field(field: &str) -> Result<(), StoreError> {
    if !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::InvalidField(field.to_string()))
    }
}

/// Reads the `id` of a document about to be stored
pub(crate) fn document_id(document: &Value) -> Result<Uuid, StoreError> {
    let raw = document
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidDocument("document must carry a string id".to_string()))?;
    Uuid::parse_str(raw).map_err(|_| StoreError::InvalidDocument(format!("invalid id: {}", raw)))
}

pub(crate) fn strip_id(mut patch: Map<String, Value>) -> Map<String, Value> {
    patch.remove("id");
    patch
}
