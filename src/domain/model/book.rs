use super::{lenient, DocumentModel};
use crate::domain::query::{BookField, IndexSpec, SortDirection};
use bson::oid::ObjectId;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A book document. Every field is optional because the collection accepts
/// partial documents and projections return only some of them. A field
/// holding a value of the wrong type reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub genre: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_i32",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_year: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub in_stock: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_i32",
        skip_serializing_if = "Option::is_none"
    )]
    pub pages: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub publisher: Option<String>,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            ..Self::default()
        }
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn published(mut self, year: i32) -> Self {
        self.published_year = Some(year);
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    pub fn pages(mut self, pages: i32) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Same record ignoring the store-assigned id.
    pub fn same_record(&self, other: &Book) -> bool {
        Book { id: None, ..self.clone() } == Book { id: None, ..other.clone() }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.title.as_deref().unwrap_or("?"))?;
        if let Some(author) = &self.author {
            write!(f, " by {}", author)?;
        }
        if let Some(year) = self.published_year {
            write!(f, " ({})", year)?;
        }
        if let Some(genre) = &self.genre {
            write!(f, " [{}]", genre)?;
        }
        if let Some(price) = self.price {
            write!(f, " ${:.2}", price)?;
        }
        match self.in_stock {
            Some(true) => write!(f, " in stock")?,
            Some(false) => write!(f, " out of stock")?,
            None => {}
        }
        if let Some(pages) = self.pages {
            write!(f, ", {} pages", pages)?;
        }
        if let Some(publisher) = &self.publisher {
            write!(f, ", {}", publisher)?;
        }
        Ok(())
    }
}

/// Binding of [`Book`] to the `books` collection.
pub struct BookModel;

impl BookModel {
    fn check_text(payload: &Document, field: BookField) -> Result<(), String> {
        match payload.get(field.as_str()) {
            None | Some(Bson::Null) | Some(Bson::String(_)) => Ok(()),
            Some(other) => Err(format!("{} must be text, found {}", field, other)),
        }
    }

    fn check_non_negative_integer(payload: &Document, field: BookField) -> Result<(), String> {
        match payload.get(field.as_str()) {
            None | Some(Bson::Null) => Ok(()),
            Some(value) => match lenient::integral(value) {
                Some(v) if v >= 0 => Ok(()),
                Some(v) => Err(format!("{} cannot be negative (got {})", field, v)),
                None => Err(format!("{} must be an integer, found {}", field, value)),
            },
        }
    }
}

impl DocumentModel for BookModel {
    fn collection_name(&self) -> &str {
        "books"
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::single(BookField::Title, SortDirection::Ascending),
            IndexSpec::single(BookField::Author, SortDirection::Ascending)
                .then(BookField::PublishedYear, SortDirection::Descending),
        ]
    }

    fn validate_create_payload(&self, payload: &Document) -> Result<(), String> {
        match payload.get(BookField::Title.as_str()) {
            Some(Bson::String(title)) if !title.trim().is_empty() => {}
            Some(Bson::String(_)) => return Err("Book title cannot be blank".to_string()),
            _ => return Err("Book must have a title field".to_string()),
        }
        for field in [BookField::Author, BookField::Genre, BookField::Publisher] {
            Self::check_text(payload, field)?;
        }
        Self::check_non_negative_integer(payload, BookField::PublishedYear)?;
        Self::check_non_negative_integer(payload, BookField::Pages)?;
        match payload.get(BookField::Price.as_str()) {
            None | Some(Bson::Null) => {}
            Some(Bson::Double(p)) if !p.is_finite() => {
                return Err("price must be a finite number".to_string())
            }
            Some(Bson::Double(p)) if *p < 0.0 => {
                return Err(format!("price cannot be negative (got {})", p))
            }
            Some(Bson::Double(_)) => {}
            Some(value) => match lenient::integral(value) {
                Some(p) if p < 0 => return Err(format!("price cannot be negative (got {})", p)),
                Some(_) => {}
                None => return Err(format!("price must be a number, found {}", value)),
            },
        }
        match payload.get(BookField::InStock.as_str()) {
            None | Some(Bson::Null) | Some(Bson::Boolean(_)) => Ok(()),
            Some(other) => Err(format!("in_stock must be a boolean, found {}", other)),
        }
    }
}
