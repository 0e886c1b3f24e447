//! In-process document store.
//!
//! Evaluates the same typed filters, find options and pipelines the MongoDB
//! backend renders, so the service can be exercised without a server.

mod compare;
mod eval;

use super::{DocumentStore, UpdateOutcome};
use crate::domain::query::{BookFilter, FindOptions, IndexSpec, Pipeline, SortDirection};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

pub struct InMemoryStore {
    collection: String,
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            state: RwLock::new(State::default()),
        }
    }

    fn project(doc: &Document, options: &FindOptions) -> Document {
        let Some(projection) = &options.projection else {
            return doc.clone();
        };
        let mut out = Document::new();
        if let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
        for field in projection.fields() {
            if let Some(value) = doc.get(field.as_str()) {
                out.insert(field.as_str(), value.clone());
            }
        }
        out
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<Vec<Bson>> {
        let mut state = self.state.write().await;
        let mut prepared = Vec::with_capacity(documents.len());
        let mut ids = Vec::with_capacity(documents.len());
        for mut doc in documents {
            let id = match doc.get("_id") {
                Some(id) => id.clone(),
                None => {
                    let id = Bson::ObjectId(ObjectId::new());
                    doc.insert("_id", id.clone());
                    id
                }
            };
            let taken = state.documents.iter().chain(prepared.iter()).any(|d: &Document| {
                d.get("_id").map(|existing| compare::same_value(existing, &id)).unwrap_or(false)
            });
            if taken {
                return Err(StoreError::Validation(format!("duplicate _id {}", id)));
            }
            ids.push(id);
            prepared.push(doc);
        }
        state.documents.extend(prepared);
        Ok(ids)
    }

    async fn find(&self, options: &FindOptions) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut hits: Vec<&Document> = state
            .documents
            .iter()
            .filter(|d| compare::matches(d, &options.filter))
            .collect();
        if !options.sort.is_empty() {
            hits.sort_by(|a, b| {
                options
                    .sort
                    .iter()
                    .map(|s| {
                        let ord = compare::compare_field(a, b, s.field.as_str());
                        match s.direction {
                            SortDirection::Ascending => ord,
                            SortDirection::Descending => ord.reverse(),
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| Self::project(d, options))
            .collect())
    }

    async fn count(&self, filter: &BookFilter) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.documents.iter().filter(|d| compare::matches(d, filter)).count() as u64)
    }

    async fn update_one(&self, filter: &BookFilter, set: Document) -> Result<UpdateOutcome> {
        let mut state = self.state.write().await;
        let Some(doc) = state.documents.iter_mut().find(|d| compare::matches(d, filter)) else {
            return Ok(UpdateOutcome::default());
        };
        let mut changed = false;
        for (key, value) in set {
            let unchanged = doc.get(&key).map(|old| old == &value).unwrap_or(false);
            if !unchanged {
                doc.insert(key, value);
                changed = true;
            }
        }
        Ok(UpdateOutcome { matched: 1, modified: u64::from(changed) })
    }

    async fn delete_one(&self, filter: &BookFilter) -> Result<u64> {
        let mut state = self.state.write().await;
        match state.documents.iter().position(|d| compare::matches(d, filter)) {
            Some(idx) => {
                state.documents.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: &BookFilter) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.documents.len();
        state.documents.retain(|d| !compare::matches(d, filter));
        Ok((before - state.documents.len()) as u64)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>> {
        let docs = self.state.read().await.documents.clone();
        eval::run(pipeline.stages(), docs)
    }

    async fn create_index(&self, index: &IndexSpec) -> Result<String> {
        let mut state = self.state.write().await;
        let name = index.name();
        if !state.indexes.iter().any(|existing| existing.name() == name) {
            tracing::debug!(collection = %self.collection, index = %name, "index created");
            state.indexes.push(index.clone());
        }
        Ok(name)
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let mut names = vec!["_id_".to_string()];
        names.extend(state.indexes.iter().map(IndexSpec::name));
        Ok(names)
    }

    async fn explain(&self, filter: &BookFilter) -> Result<Document> {
        let started = Instant::now();
        let state = self.state.read().await;
        let returned = state.documents.iter().filter(|d| compare::matches(d, filter)).count() as i64;
        let total = state.documents.len() as i64;
        let index = state.indexes.iter().find(|idx| idx.serves(filter));
        let namespace = format!("memory.{}", self.collection);

        let (winning_plan, keys_examined, docs_examined) = match index {
            Some(idx) => (
                doc! {
                    "stage": "FETCH",
                    "inputStage": {
                        "stage": "IXSCAN",
                        "keyPattern": idx.to_document(),
                        "indexName": idx.name(),
                    },
                },
                returned,
                returned,
            ),
            None => (doc! { "stage": "COLLSCAN", "direction": "forward" }, 0, total),
        };
        let elapsed_ms = started.elapsed().as_millis() as i64;

        Ok(doc! {
            "queryPlanner": {
                "namespace": namespace,
                "parsedQuery": filter.to_document(),
                "winningPlan": winning_plan,
            },
            "executionStats": {
                "executionSuccess": true,
                "nReturned": returned,
                "executionTimeMillis": elapsed_ms,
                "totalKeysExamined": keys_examined,
                "totalDocsExamined": docs_examined,
            },
            "ok": 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::BookField;

    #[tokio::test]
    async fn assigns_ids_and_rejects_duplicates() {
        let store = InMemoryStore::new("books");
        let ids = store
            .insert_many(vec![doc! { "title": "A" }, doc! { "title": "B" }])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let dup = doc! { "_id": ids[0].clone(), "title": "C" };
        let err = store.insert_many(vec![dup]).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.count(&BookFilter::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn setting_the_same_value_matches_without_modifying() {
        let store = InMemoryStore::new("books");
        store.insert_many(vec![doc! { "title": "A", "price": 15.0 }]).await.unwrap();
        let filter = BookFilter::all().eq(BookField::Title, "A").unwrap();
        let outcome = store.update_one(&filter, doc! { "price": 15.0 }).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[tokio::test]
    async fn explain_reports_index_use() {
        let store = InMemoryStore::new("books");
        store.insert_many(vec![doc! { "title": "A" }]).await.unwrap();
        let by_title = BookFilter::all().eq(BookField::Title, "A").unwrap();

        let plan = store.explain(&by_title).await.unwrap();
        let stage = plan
            .get_document("queryPlanner")
            .and_then(|q| q.get_document("winningPlan"))
            .and_then(|w| w.get_str("stage"))
            .unwrap();
        assert_eq!(stage, "COLLSCAN");

        store
            .create_index(&IndexSpec::single(BookField::Title, SortDirection::Ascending))
            .await
            .unwrap();
        let plan = store.explain(&by_title).await.unwrap();
        let input = plan
            .get_document("queryPlanner")
            .and_then(|q| q.get_document("winningPlan"))
            .and_then(|w| w.get_document("inputStage"))
            .unwrap();
        assert_eq!(input.get_str("stage").unwrap(), "IXSCAN");
        assert_eq!(input.get_str("indexName").unwrap(), "title_1");
    }
}
