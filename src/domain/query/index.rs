use super::field::BookField;
use super::filter::BookFilter;
use super::options::SortDirection;
use crate::error::{Result, StoreError};
use bson::Document;

/// A (possibly compound) index over book fields. Never unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    keys: Vec<(BookField, SortDirection)>,
}

impl IndexSpec {
    pub fn new(keys: Vec<(BookField, SortDirection)>) -> Result<Self> {
        if keys.is_empty() {
            return Err(StoreError::invalid_query("an index needs at least one key"));
        }
        for (i, (field, _)) in keys.iter().enumerate() {
            if keys[..i].iter().any(|(f, _)| f == field) {
                return Err(StoreError::invalid_query(format!(
                    "field '{}' appears twice in index keys",
                    field
                )));
            }
        }
        Ok(Self { keys })
    }

    pub fn single(field: BookField, direction: SortDirection) -> Self {
        Self { keys: vec![(field, direction)] }
    }

    /// Appends a key; an already-present field only has its direction replaced.
    pub fn then(mut self, field: BookField, direction: SortDirection) -> Self {
        match self.keys.iter_mut().find(|(f, _)| *f == field) {
            Some(key) => key.1 = direction,
            None => self.keys.push((field, direction)),
        }
        self
    }

    pub fn keys(&self) -> &[(BookField, SortDirection)] {
        &self.keys
    }

    pub fn leading_field(&self) -> BookField {
        self.keys[0].0
    }

    /// MongoDB's default index name, e.g. `author_1_published_year_-1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(f, d)| format!("{}_{}", f.as_str(), d.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (f, d) in &self.keys {
            doc.insert(f.as_str(), d.as_i32());
        }
        doc
    }

    /// Whether a planner could use this index for `filter` (its leading key is constrained).
    pub fn serves(&self, filter: &BookFilter) -> bool {
        filter.constrains(self.leading_field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn compound_index_name_and_keys() {
        let idx = IndexSpec::new(vec![
            (BookField::Author, SortDirection::Ascending),
            (BookField::PublishedYear, SortDirection::Descending),
        ])
        .unwrap();
        assert_eq!(idx.name(), "author_1_published_year_-1");
        assert_eq!(idx.to_document(), doc! { "author": 1, "published_year": -1 });
        assert_eq!(idx.keys()[1], (BookField::PublishedYear, SortDirection::Descending));
    }

    #[test]
    fn rejects_empty_or_repeated_keys() {
        assert!(IndexSpec::new(vec![]).is_err());
        assert!(IndexSpec::new(vec![
            (BookField::Title, SortDirection::Ascending),
            (BookField::Title, SortDirection::Descending),
        ])
        .is_err());
    }

    #[test]
    fn serves_filters_on_the_leading_key_only() {
        let idx = IndexSpec::single(BookField::Title, SortDirection::Ascending);
        let by_title = BookFilter::all().eq(BookField::Title, "1984").unwrap();
        let by_genre = BookFilter::all().eq(BookField::Genre, "Fiction").unwrap();
        assert!(idx.serves(&by_title));
        assert!(!idx.serves(&by_genre));
    }
}
