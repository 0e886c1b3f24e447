//! The book service.
//!
//! This module sits between callers and the document store. It is
//! responsible for:
//! 1.  Validating books before they are written.
//! 2.  Turning typed queries into store calls and decoding the documents
//!     that come back into [`Book`]s and report rows.
//! 3.  Building the catalog's aggregation pipelines.
//!
//! The store is injected, so the same service runs against MongoDB or the
//! in-memory store.

use crate::domain::model::{
    AuthorBookCount, Book, BookModel, DecadeCount, DocumentModel, GenreAveragePrice, GroupAverage,
    GroupCount,
};
use crate::domain::query::{
    Accumulator, BookField, BookFilter, Comparison, Expr, FieldKind, FieldValue, FindOptions,
    IndexSpec, Page, Pipeline, ProjectField, Projection, SortDirection, SortSpec,
};
use crate::error::{Result, StoreError};
use crate::storage::{DocumentStore, UpdateOutcome};
use bson::{Bson, Document};
use std::sync::Arc;

/// Output field of the count accumulator in every counting pipeline.
const TOTAL_BOOKS: &str = "totalBooks";

pub struct BookService {
    store: Arc<dyn DocumentStore>,
    model: BookModel,
}

impl BookService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, model: BookModel }
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    fn decode_books(documents: Vec<Document>) -> Result<Vec<Book>> {
        documents
            .into_iter()
            .map(|d| bson::from_document::<Book>(d).map_err(StoreError::from))
            .collect()
    }

    async fn find_books(&self, options: &FindOptions) -> Result<Vec<Book>> {
        let documents = self.store.find(options).await?;
        Self::decode_books(documents)
    }

    fn require_numeric(field: BookField) -> Result<()> {
        match field.kind() {
            FieldKind::Integer | FieldKind::Number => Ok(()),
            _ => Err(StoreError::invalid_query(format!(
                "'{}' is not a numeric field",
                field
            ))),
        }
    }

    fn require_targeted(filter: &BookFilter, operation: &str) -> Result<()> {
        if filter.is_empty() {
            return Err(StoreError::invalid_query(format!(
                "{} needs a non-empty filter",
                operation
            )));
        }
        Ok(())
    }

    // --- Writes ---

    /// Validates every book, then inserts them all. Nothing is written if any
    /// book is invalid.
    pub async fn insert_books(&self, books: &[Book]) -> Result<Vec<Bson>> {
        let mut documents = Vec::with_capacity(books.len());
        for book in books {
            let document = bson::to_document(book)?;
            self.model.validate_create_payload(&document).map_err(|e| {
                StoreError::Validation(format!(
                    "{}: {}",
                    book.title.as_deref().unwrap_or("<untitled>"),
                    e
                ))
            })?;
            documents.push(document);
        }
        let ids = self.store.insert_many(documents).await?;
        tracing::debug!(inserted = ids.len(), "books inserted");
        Ok(ids)
    }

    /// Sets `field` to `value` on the first book matching `filter`.
    ///
    /// Matching nothing is not an error: both counts are 0.
    pub async fn update_one_by_filter(
        &self,
        filter: &BookFilter,
        field: BookField,
        value: impl Into<FieldValue>,
    ) -> Result<UpdateOutcome> {
        Self::require_targeted(filter, "update")?;
        let value = value.into();
        field.check(&value)?;
        let mut set = Document::new();
        set.insert(field.as_str(), value.to_bson_for(field));
        let outcome = self.store.update_one(filter, set).await?;
        tracing::debug!(
            matched = outcome.matched,
            modified = outcome.modified,
            field = field.as_str(),
            "update one"
        );
        Ok(outcome)
    }

    /// Deletes the first book matching `filter`; returns 0 when none matched.
    pub async fn delete_one_by_filter(&self, filter: &BookFilter) -> Result<u64> {
        Self::require_targeted(filter, "delete")?;
        let deleted = self.store.delete_one(filter).await?;
        tracing::debug!(deleted, "delete one");
        Ok(deleted)
    }

    /// Removes every book. Used by `seed --reset`.
    pub async fn delete_all(&self) -> Result<u64> {
        self.store.delete_many(&BookFilter::all()).await
    }

    // --- Reads ---

    pub async fn list_all(&self) -> Result<Vec<Book>> {
        self.find_books(&FindOptions::default()).await
    }

    pub async fn find_by_field(
        &self,
        field: BookField,
        value: impl Into<FieldValue>,
    ) -> Result<Vec<Book>> {
        let filter = BookFilter::all().eq(field, value)?;
        self.find_books(&FindOptions::filtered(filter)).await
    }

    pub async fn find_by_comparison(
        &self,
        field: BookField,
        op: Comparison,
        threshold: impl Into<FieldValue>,
    ) -> Result<Vec<Book>> {
        let filter = BookFilter::all().with(field, op, threshold)?;
        self.find_books(&FindOptions::filtered(filter)).await
    }

    pub async fn find_matching(&self, filter: BookFilter) -> Result<Vec<Book>> {
        self.find_books(&FindOptions::filtered(filter)).await
    }

    pub async fn count_matching(&self, filter: &BookFilter) -> Result<u64> {
        self.store.count(filter).await
    }

    /// Books matching `filter` with only the projected fields (and `_id`) populated.
    pub async fn find_projected(
        &self,
        filter: BookFilter,
        projection: Projection,
    ) -> Result<Vec<Book>> {
        self.find_books(&FindOptions::filtered(filter).projected(projection))
            .await
    }

    pub async fn find_sorted(&self, field: BookField, direction: SortDirection) -> Result<Vec<Book>> {
        let options = FindOptions::default().sorted(SortSpec { field, direction });
        self.find_books(&options).await
    }

    /// One page of all books in ascending `field` order.
    pub async fn find_page(&self, field: BookField, page: Page) -> Result<Vec<Book>> {
        let options = FindOptions::default()
            .sorted(SortSpec::ascending(field))
            .paged(page);
        self.find_books(&options).await
    }

    // --- Aggregations ---

    fn average_output(averaged: BookField) -> String {
        let camel: String = averaged
            .as_str()
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect();
        format!("average{}", camel)
    }

    fn average_pipeline(
        filter: &BookFilter,
        group: BookField,
        averaged: BookField,
    ) -> Result<(Pipeline, String)> {
        Self::require_numeric(averaged)?;
        let output = Self::average_output(averaged);
        let mut pipeline = Pipeline::new();
        if !filter.is_empty() {
            pipeline = pipeline.matching(filter.clone());
        }
        let pipeline = pipeline.group(
            Expr::book(group),
            vec![(output.as_str(), Accumulator::Avg(Expr::book(averaged)))],
        )?;
        Ok((pipeline, output))
    }

    /// One row per distinct `group` value with the average of `averaged`.
    pub async fn average_by(&self, group: BookField, averaged: BookField) -> Result<Vec<GroupAverage>> {
        self.average_by_matching(&BookFilter::all(), group, averaged).await
    }

    /// Same as [`average_by`](Self::average_by) over the books matching `filter` only.
    pub async fn average_by_matching(
        &self,
        filter: &BookFilter,
        group: BookField,
        averaged: BookField,
    ) -> Result<Vec<GroupAverage>> {
        let (pipeline, output) = Self::average_pipeline(filter, group, averaged)?;
        let rows = self.store.aggregate(&pipeline).await?;
        Ok(rows.iter().map(|r| GroupAverage::from_row(r, &output)).collect())
    }

    pub async fn average_price_by_genre(&self) -> Result<Vec<GenreAveragePrice>> {
        let (pipeline, _) = Self::average_pipeline(&BookFilter::all(), BookField::Genre, BookField::Price)?;
        let rows = self.store.aggregate(&pipeline).await?;
        rows.into_iter()
            .map(|r| bson::from_document::<GenreAveragePrice>(r).map_err(StoreError::from))
            .collect()
    }

    fn top_count_pipeline(group: BookField) -> Result<Pipeline> {
        Pipeline::new()
            .group(Expr::book(group), vec![(TOTAL_BOOKS, Accumulator::count())])?
            .sort(vec![(TOTAL_BOOKS, SortDirection::Descending)])?
            .limit(1)?
            .project(
                false,
                vec![
                    (group.as_str(), ProjectField::Computed(Expr::path("_id"))),
                    (TOTAL_BOOKS, ProjectField::Include),
                ],
            )
    }

    /// The `group` value shared by the most books. Ties resolve arbitrarily;
    /// an empty collection yields `None`.
    pub async fn top_by_count(&self, group: BookField) -> Result<Option<GroupCount>> {
        let pipeline = Self::top_count_pipeline(group)?;
        let rows = self.store.aggregate(&pipeline).await?;
        Ok(rows.first().map(|r| GroupCount::from_row(r, group.as_str())))
    }

    pub async fn top_author(&self) -> Result<Option<AuthorBookCount>> {
        let pipeline = Self::top_count_pipeline(BookField::Author)?;
        let mut rows = self.store.aggregate(&pipeline).await?;
        match rows.pop() {
            Some(row) => Ok(Some(bson::from_document(row)?)),
            None => Ok(None),
        }
    }

    /// Book counts per decade of `year_field`, ascending by decade.
    pub async fn count_by_decade(&self, year_field: BookField) -> Result<Vec<DecadeCount>> {
        if year_field.kind() != FieldKind::Integer {
            return Err(StoreError::invalid_query(format!(
                "'{}' is not an integer field",
                year_field
            )));
        }
        let decade = Expr::Multiply(vec![
            Expr::Floor(Box::new(Expr::Divide(
                Box::new(Expr::book(year_field)),
                Box::new(Expr::int(10)),
            ))),
            Expr::int(10),
        ]);
        let pipeline = Pipeline::new()
            .add_fields(vec![("decade", decade)])?
            .group(Expr::path("decade"), vec![(TOTAL_BOOKS, Accumulator::count())])?
            .sort(vec![("_id", SortDirection::Ascending)])?
            .project(
                false,
                vec![
                    ("decade", ProjectField::Computed(Expr::path("_id"))),
                    (TOTAL_BOOKS, ProjectField::Include),
                ],
            )?;
        let rows = self.store.aggregate(&pipeline).await?;
        rows.into_iter()
            .map(|r| bson::from_document::<DecadeCount>(r).map_err(StoreError::from))
            .collect()
    }

    // --- Indexes and diagnostics ---

    /// Creates `index`; creating an existing index again is a no-op.
    pub async fn create_index(&self, index: &IndexSpec) -> Result<String> {
        let name = self.store.create_index(index).await?;
        tracing::info!(collection = self.store.collection_name(), index = %name, "index ensured");
        Ok(name)
    }

    /// Creates every index the book model declares.
    pub async fn ensure_indexes(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for index in self.model.indexes() {
            names.push(self.create_index(&index).await?);
        }
        Ok(names)
    }

    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        self.store.list_indexes().await
    }

    /// Store-native execution statistics for a find with `filter`.
    pub async fn explain(&self, filter: &BookFilter) -> Result<Document> {
        self.store.explain(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn service() -> BookService {
        BookService::new(Arc::new(InMemoryStore::new("books")))
    }

    #[test]
    fn average_output_is_camel_case() {
        assert_eq!(BookService::average_output(BookField::Price), "averagePrice");
        assert_eq!(
            BookService::average_output(BookField::PublishedYear),
            "averagePublishedYear"
        );
    }

    #[tokio::test]
    async fn rejects_untargeted_writes() {
        let svc = service();
        let err = svc
            .update_one_by_filter(&BookFilter::all(), BookField::Price, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
        let err = svc.delete_one_by_filter(&BookFilter::all()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn filtered_average_renders_a_leading_match() {
        let in_stock = BookFilter::all().eq(BookField::InStock, true).unwrap();
        let (pipeline, output) =
            BookService::average_pipeline(&in_stock, BookField::Genre, BookField::Price).unwrap();
        assert_eq!(output, "averagePrice");
        assert_eq!(
            pipeline.to_documents()[0],
            bson::doc! { "$match": { "in_stock": true } }
        );

        let (unfiltered, _) =
            BookService::average_pipeline(&BookFilter::all(), BookField::Genre, BookField::Price)
                .unwrap();
        assert_eq!(unfiltered.stages().len(), 1);
    }

    #[tokio::test]
    async fn rejects_non_numeric_averages() {
        let err = service()
            .average_by(BookField::Genre, BookField::Title)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn invalid_book_blocks_the_whole_batch() {
        let svc = service();
        let books = vec![
            Book::new("Valid", "Someone"),
            Book { title: None, ..Book::default() },
        ];
        let err = svc.insert_books(&books).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(svc.list_all().await.unwrap().is_empty());
    }
}
