pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;

// Convenience re-exports (keeps call-sites clean)
pub use app::book_service::BookService;
pub use domain::model::{Book, BookModel, DocumentModel};
pub use domain::query::{BookField, BookFilter, Comparison, FieldValue, Page, Projection, SortDirection};
pub use error::{Result, StoreError};
pub use infra::connection::Connection;
pub use storage::{DocumentStore, InMemoryStore, MongoStore, UpdateOutcome};
