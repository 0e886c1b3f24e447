//! Document model definitions.

use crate::domain::query::IndexSpec;
use bson::Document;

pub mod book;
pub mod catalog;
pub(crate) mod lenient;
pub mod reports;

pub use book::{Book, BookModel};
pub use reports::{
    AuthorBookCount, DecadeCount, GenreAveragePrice, GroupAverage, GroupCount, PlanSummary,
};

/// Contract for a model bound to a collection.
///
/// Each implementation provides:
/// - the collection name
/// - the indexes the collection should carry
/// - optional insert-time validation
pub trait DocumentModel: Send + Sync {
    /// Returns the name of the collection holding this model's documents.
    fn collection_name(&self) -> &str;

    /// Indexes declared for the collection. Creating them is idempotent.
    fn indexes(&self) -> Vec<IndexSpec> {
        Vec::new()
    }

    /// Validates a document before it is inserted.
    /// Returns Ok(()) if valid, Err(String) with error message if invalid.
    ///
    /// Default implementation does no validation.
    fn validate_create_payload(&self, _payload: &Document) -> Result<(), String> {
        Ok(())
    }
}
