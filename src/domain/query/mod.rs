//! Typed query surface: every filter, option, pipeline and index is checked
//! here before a store sees it.

pub mod field;
pub mod filter;
pub mod index;
pub mod options;
pub mod pipeline;

pub use field::{BookField, FieldKind, FieldValue};
pub use filter::{BookFilter, Comparison, Predicate};
pub use index::IndexSpec;
pub use options::{FindOptions, Page, Projection, SortDirection, SortSpec};
pub use pipeline::{Accumulator, Expr, Pipeline, ProjectField, Stage};
