use crate::error::{Result, StoreError};
use bson::Bson;
use std::fmt;
use std::str::FromStr;

/// The fields of a book document that queries may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookField {
    Title,
    Author,
    Genre,
    PublishedYear,
    Price,
    InStock,
    Pages,
    Publisher,
}

/// Value kind a field holds in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Boolean,
}

impl BookField {
    pub const ALL: [BookField; 8] = [
        BookField::Title,
        BookField::Author,
        BookField::Genre,
        BookField::PublishedYear,
        BookField::Price,
        BookField::InStock,
        BookField::Pages,
        BookField::Publisher,
    ];

    /// Name of the field inside stored documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Genre => "genre",
            BookField::PublishedYear => "published_year",
            BookField::Price => "price",
            BookField::InStock => "in_stock",
            BookField::Pages => "pages",
            BookField::Publisher => "publisher",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            BookField::Title | BookField::Author | BookField::Genre | BookField::Publisher => {
                FieldKind::Text
            }
            BookField::PublishedYear | BookField::Pages => FieldKind::Integer,
            BookField::Price => FieldKind::Number,
            BookField::InStock => FieldKind::Boolean,
        }
    }

    /// `$<name>` reference used inside aggregation expressions.
    pub fn path(&self) -> String {
        format!("${}", self.as_str())
    }

    /// Checks that `value` can be stored in (or compared against) this field.
    pub fn check(&self, value: &FieldValue) -> Result<()> {
        let ok = match (self.kind(), value) {
            (FieldKind::Text, FieldValue::Text(_)) => true,
            (FieldKind::Integer, FieldValue::Integer(_)) => true,
            (FieldKind::Number, FieldValue::Integer(_)) => true,
            (FieldKind::Number, FieldValue::Number(n)) => n.is_finite(),
            (FieldKind::Boolean, FieldValue::Boolean(_)) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(StoreError::invalid_query(format!(
                "value {} is not valid for field '{}' ({:?})",
                value,
                self.as_str(),
                self.kind()
            )))
        }
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        BookField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| StoreError::invalid_query(format!("unknown book field '{}'", s)))
    }
}

/// A typed value used in filters and updates.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn to_bson(&self) -> Bson {
        match self {
            FieldValue::Text(s) => Bson::String(s.clone()),
            FieldValue::Integer(i) => match i32::try_from(*i) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(*i),
            },
            FieldValue::Number(n) => Bson::Double(*n),
            FieldValue::Boolean(b) => Bson::Boolean(*b),
        }
    }

    /// Value as it should be written into `field`.
    ///
    /// Number fields are always written as doubles so they read back as `f64`.
    pub fn to_bson_for(&self, field: BookField) -> Bson {
        match (field.kind(), self) {
            (FieldKind::Number, FieldValue::Integer(i)) => Bson::Double(*i as f64),
            _ => self.to_bson(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{:?}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_field_names() {
        assert_eq!("published_year".parse::<BookField>().unwrap(), BookField::PublishedYear);
        assert_eq!("in_stock".parse::<BookField>().unwrap(), BookField::InStock);
        assert!(matches!(
            "year".parse::<BookField>(),
            Err(StoreError::InvalidQuery(_))
        ));
    }

    #[test]
    fn rejects_values_of_the_wrong_kind() {
        assert!(BookField::Genre.check(&"Fiction".into()).is_ok());
        assert!(BookField::Genre.check(&FieldValue::Integer(3)).is_err());
        assert!(BookField::PublishedYear.check(&FieldValue::Number(1951.5)).is_err());
        assert!(BookField::Price.check(&FieldValue::Integer(15)).is_ok());
        assert!(BookField::Price.check(&FieldValue::Number(f64::NAN)).is_err());
        assert!(BookField::InStock.check(&"yes".into()).is_err());
    }

    #[test]
    fn integer_prices_are_written_as_doubles() {
        assert_eq!(FieldValue::Integer(15).to_bson_for(BookField::Price), Bson::Double(15.0));
        assert_eq!(FieldValue::Integer(1951).to_bson_for(BookField::PublishedYear), Bson::Int32(1951));
        assert_eq!(FieldValue::Integer(1 << 40).to_bson(), Bson::Int64(1 << 40));
    }
}
