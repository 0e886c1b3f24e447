use super::field::BookField;
use super::filter::BookFilter;
use crate::error::{Result, StoreError};
use bson::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// MongoDB's numeric form (`1` / `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: BookField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: BookField) -> Self {
        Self { field, direction: SortDirection::Ascending }
    }

    pub fn descending(field: BookField) -> Self {
        Self { field, direction: SortDirection::Descending }
    }
}

/// Field allow-list for a find. `_id` is always returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<BookField>,
}

impl Projection {
    pub fn new(fields: impl IntoIterator<Item = BookField>) -> Result<Self> {
        let mut out: Vec<BookField> = Vec::new();
        for f in fields {
            if !out.contains(&f) {
                out.push(f);
            }
        }
        if out.is_empty() {
            return Err(StoreError::invalid_query("projection must name at least one field"));
        }
        Ok(Self { fields: out })
    }

    /// Parses a space-separated field list such as `"title author price"`.
    pub fn parse(list: &str) -> Result<Self> {
        let fields = list
            .split_whitespace()
            .map(str::parse::<BookField>)
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[BookField] {
        &self.fields
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for f in &self.fields {
            doc.insert(f.as_str(), 1);
        }
        doc
    }
}

/// One page of a sorted listing; pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u64,
    size: u64,
}

impl Page {
    pub fn new(number: u64, size: u64) -> Result<Self> {
        if number == 0 {
            return Err(StoreError::invalid_query("page numbers start at 1"));
        }
        if size == 0 {
            return Err(StoreError::invalid_query("page size must be at least 1"));
        }
        if size > i64::MAX as u64 || (number - 1).checked_mul(size).is_none() {
            return Err(StoreError::invalid_query("page offset overflows"));
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn skip(&self) -> u64 {
        (self.number - 1) * self.size
    }
}

/// Everything a find needs besides the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filter: BookFilter,
    pub projection: Option<Projection>,
    pub sort: Vec<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn filtered(filter: BookFilter) -> Self {
        Self { filter, ..Self::default() }
    }

    pub fn projected(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sorted(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn paged(mut self, page: Page) -> Self {
        self.skip = Some(page.skip());
        self.limit = Some(page.size());
        self
    }

    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }
        let mut doc = Document::new();
        for s in &self.sort {
            doc.insert(s.field.as_str(), s.direction.as_i32());
        }
        Some(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn page_two_of_five_skips_five() {
        let page = Page::new(2, 5).unwrap();
        assert_eq!(page.number(), 2);
        assert_eq!(page.skip(), 5);
        assert_eq!(page.size(), 5);
        assert!(Page::new(0, 5).is_err());
        assert!(Page::new(1, 0).is_err());
    }

    #[test]
    fn parses_space_separated_projection() {
        let p = Projection::parse("title author price").unwrap();
        assert_eq!(p.to_document(), doc! { "title": 1, "author": 1, "price": 1 });
        assert!(Projection::parse("   ").is_err());
        assert!(Projection::parse("title isbn").is_err());
    }

    #[test]
    fn sort_document_keeps_key_order() {
        let opts = FindOptions::default()
            .sorted(SortSpec::ascending(BookField::Author))
            .sorted(SortSpec::descending(BookField::PublishedYear));
        assert_eq!(
            opts.sort_document().unwrap(),
            doc! { "author": 1, "published_year": -1 }
        );
        assert!(FindOptions::default().sort_document().is_none());
    }
}
