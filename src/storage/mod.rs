//! Document store abstraction and its backends.

pub mod memory;
pub mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

use crate::domain::query::{BookFilter, FindOptions, IndexSpec, Pipeline};
use crate::error::Result;
use async_trait::async_trait;
use bson::{Bson, Document};

/// Outcome of an update-one call. Both counts are 0 when nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Operations the book service needs from a single collection.
///
/// Inputs arrive already validated by the typed query layer; backends only
/// render or evaluate them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn collection_name(&self) -> &str;

    async fn ping(&self) -> Result<()>;

    /// Inserts documents in order, returning their `_id`s in the same order.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>>;

    async fn find(&self, options: &FindOptions) -> Result<Vec<Document>>;

    async fn count(&self, filter: &BookFilter) -> Result<u64>;

    /// Applies `$set: set` to the first document matching `filter`.
    async fn update_one(&self, filter: &BookFilter, set: Document) -> Result<UpdateOutcome>;

    /// Removes the first matching document; returns how many were removed (0 or 1).
    async fn delete_one(&self, filter: &BookFilter) -> Result<u64>;

    async fn delete_many(&self, filter: &BookFilter) -> Result<u64>;

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>>;

    /// Creates `index` unless an index with the same name exists; returns its name.
    async fn create_index(&self, index: &IndexSpec) -> Result<String>;

    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Store-native execution statistics for a find with `filter`.
    async fn explain(&self, filter: &BookFilter) -> Result<Document>;
}
