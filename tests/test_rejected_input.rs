//! Malformed input must be rejected before any store call is made.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use book_catalog::domain::query::{FindOptions, IndexSpec, Pipeline};
use book_catalog::{
    Book, BookField, BookFilter, BookService, DocumentStore, InMemoryStore, Page, Projection,
    StoreError, UpdateOutcome,
};
use bson::{Bson, Document};

/// Counts every call that reaches the wrapped store.
struct CountingStore {
    inner: InMemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self { inner: InMemoryStore::new("books"), calls: AtomicUsize::new(0) }
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    fn collection_name(&self) -> &str {
        self.inner.collection_name()
    }

    async fn ping(&self) -> book_catalog::Result<()> {
        self.hit();
        self.inner.ping().await
    }

    async fn insert_many(&self, documents: Vec<Document>) -> book_catalog::Result<Vec<Bson>> {
        self.hit();
        self.inner.insert_many(documents).await
    }

    async fn find(&self, options: &FindOptions) -> book_catalog::Result<Vec<Document>> {
        self.hit();
        self.inner.find(options).await
    }

    async fn count(&self, filter: &BookFilter) -> book_catalog::Result<u64> {
        self.hit();
        self.inner.count(filter).await
    }

    async fn update_one(
        &self,
        filter: &BookFilter,
        set: Document,
    ) -> book_catalog::Result<UpdateOutcome> {
        self.hit();
        self.inner.update_one(filter, set).await
    }

    async fn delete_one(&self, filter: &BookFilter) -> book_catalog::Result<u64> {
        self.hit();
        self.inner.delete_one(filter).await
    }

    async fn delete_many(&self, filter: &BookFilter) -> book_catalog::Result<u64> {
        self.hit();
        self.inner.delete_many(filter).await
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> book_catalog::Result<Vec<Document>> {
        self.hit();
        self.inner.aggregate(pipeline).await
    }

    async fn create_index(&self, index: &IndexSpec) -> book_catalog::Result<String> {
        self.hit();
        self.inner.create_index(index).await
    }

    async fn list_indexes(&self) -> book_catalog::Result<Vec<String>> {
        self.hit();
        self.inner.list_indexes().await
    }

    async fn explain(&self, filter: &BookFilter) -> book_catalog::Result<Document> {
        self.hit();
        self.inner.explain(filter).await
    }
}

fn is_invalid_query<T>(result: book_catalog::Result<T>) -> bool {
    matches!(result, Err(StoreError::InvalidQuery(_)))
}

#[test]
fn query_construction_rejects_bad_shapes() {
    assert!(is_invalid_query("isbn".parse::<BookField>()));
    assert!(is_invalid_query(BookFilter::all().eq(BookField::PublishedYear, "1951")));
    assert!(is_invalid_query(BookFilter::all().eq(BookField::Title, 42)));
    assert!(is_invalid_query(BookFilter::all().gt(BookField::InStock, true)));
    assert!(is_invalid_query(BookFilter::all().lt(BookField::Price, f64::NAN)));
    assert!(is_invalid_query(
        BookFilter::all()
            .gt(BookField::Price, 5.0)
            .and_then(|f| f.gt(BookField::Price, 6.0))
    ));
    assert!(is_invalid_query(Page::new(0, 5)));
    assert!(is_invalid_query(Page::new(1, 0)));
    assert!(is_invalid_query(Projection::parse("")));
    assert!(is_invalid_query(Projection::parse("title isbn")));
    assert!(is_invalid_query(Projection::new(Vec::new())));
}

#[tokio::test]
async fn service_rejections_never_reach_the_store() {
    let store = Arc::new(CountingStore::new());
    let service = BookService::new(store.clone());
    let by_title = BookFilter::all().eq(BookField::Title, "The Alchemist").unwrap();

    assert!(is_invalid_query(
        service.update_one_by_filter(&by_title, BookField::Price, "fifteen").await
    ));
    assert!(is_invalid_query(
        service.update_one_by_filter(&by_title, BookField::InStock, 1).await
    ));
    assert!(is_invalid_query(
        service.update_one_by_filter(&BookFilter::all(), BookField::Price, 15).await
    ));
    assert!(is_invalid_query(service.delete_one_by_filter(&BookFilter::all()).await));
    assert!(is_invalid_query(
        service.average_by(BookField::Genre, BookField::Author).await
    ));
    assert!(is_invalid_query(service.count_by_decade(BookField::Price).await));
    assert!(is_invalid_query(service.find_by_field(BookField::Pages, "many").await));

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn books_without_a_title_fail_validation() {
    let store = Arc::new(CountingStore::new());
    let service = BookService::new(store.clone());

    let untitled = Book { author: Some("Anonymous".to_string()), ..Book::default() };
    let result = service.insert_books(&[untitled]).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let negative = Book::new("Refund", "Accountant").price(-3.0);
    let result = service.insert_books(&[negative]).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn rejection_errors_are_not_fatal() {
    let err = BookFilter::all()
        .eq(BookField::PublishedYear, "1951")
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(StoreError::Connection("refused".to_string()).is_fatal());
}
