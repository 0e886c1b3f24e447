//! MongoDB-backed document store.

use super::{DocumentStore, UpdateOutcome};
use crate::domain::query::{BookFilter, FindOptions, IndexSpec, Pipeline};
use crate::error::Result;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

/// Server error code for a collection that does not exist yet.
const NAMESPACE_NOT_FOUND: i32 = 26;

/// A store bound to one collection of a MongoDB database.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(database: Database, collection_name: &str) -> Self {
        let collection = database.collection::<Document>(collection_name);
        Self { database, collection }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let result = self.collection.insert_many(documents).await?;
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(idx, _)| *idx);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn find(&self, options: &FindOptions) -> Result<Vec<Document>> {
        let mut find = self.collection.find(options.filter.to_document());
        if let Some(projection) = &options.projection {
            find = find.projection(projection.to_document());
        }
        if let Some(sort) = options.sort_document() {
            find = find.sort(sort);
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = find.await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn count(&self, filter: &BookFilter) -> Result<u64> {
        Ok(self.collection.count_documents(filter.to_document()).await?)
    }

    async fn update_one(&self, filter: &BookFilter, set: Document) -> Result<UpdateOutcome> {
        let result = self
            .collection
            .update_one(filter.to_document(), doc! { "$set": set })
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: &BookFilter) -> Result<u64> {
        let result = self.collection.delete_one(filter.to_document()).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: &BookFilter) -> Result<u64> {
        let result = self.collection.delete_many(filter.to_document()).await?;
        Ok(result.deleted_count)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>> {
        let cursor = self.collection.aggregate(pipeline.to_documents()).await?;
        let rows: Vec<Document> = cursor.try_collect().await?;
        Ok(rows)
    }

    async fn create_index(&self, index: &IndexSpec) -> Result<String> {
        let model = IndexModel::builder()
            .keys(index.to_document())
            .options(IndexOptions::builder().name(index.name()).build())
            .build();
        let result = self.collection.create_index(model).await?;
        Ok(result.index_name)
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        match self.collection.list_index_names().await {
            Ok(names) => Ok(names),
            Err(e) if matches!(*e.kind, ErrorKind::Command(ref c) if c.code == NAMESPACE_NOT_FOUND) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn explain(&self, filter: &BookFilter) -> Result<Document> {
        let find = doc! {
            "find": self.collection.name(),
            "filter": filter.to_document(),
        };
        let command = doc! { "explain": find, "verbosity": "executionStats" };
        Ok(self.database.run_command(command).await?)
    }
}
