//! Typed aggregation pipelines.
//!
//! Only the stages and operators the catalog's reports need are modelled.
//! Pipelines render to MongoDB stage documents and are evaluated directly
//! by the in-memory store.

use super::field::BookField;
use super::filter::BookFilter;
use super::options::SortDirection;
use crate::error::{Result, StoreError};
use bson::{doc, Bson, Document};

/// An aggregation expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field path without the leading `$` (may name a computed field or `_id`).
    Field(String),
    Literal(Bson),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Floor(Box<Expr>),
}

impl Expr {
    pub fn book(field: BookField) -> Self {
        Expr::Field(field.as_str().to_string())
    }

    pub fn path(name: &str) -> Self {
        Expr::Field(name.to_string())
    }

    pub fn int(value: i32) -> Self {
        Expr::Literal(Bson::Int32(value))
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Expr::Field(name) => Bson::String(format!("${}", name)),
            Expr::Literal(value) => value.clone(),
            Expr::Multiply(factors) => {
                let factors: Vec<Bson> = factors.iter().map(Expr::to_bson).collect();
                Bson::Document(doc! { "$multiply": factors })
            }
            Expr::Divide(num, den) => Bson::Document(doc! {
                "$divide": [num.to_bson(), den.to_bson()]
            }),
            Expr::Floor(inner) => Bson::Document(doc! { "$floor": inner.to_bson() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Avg(Expr),
    Sum(Expr),
}

impl Accumulator {
    /// `{$sum: 1}`: counts the documents in each group.
    pub fn count() -> Self {
        Accumulator::Sum(Expr::int(1))
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Accumulator::Avg(e) => Bson::Document(doc! { "$avg": e.to_bson() }),
            Accumulator::Sum(e) => Bson::Document(doc! { "$sum": e.to_bson() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    Include,
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(BookFilter),
    AddFields(Vec<(String, Expr)>),
    Group {
        key: Expr,
        accumulators: Vec<(String, Accumulator)>,
    },
    Sort(Vec<(String, SortDirection)>),
    Limit(u64),
    Project {
        include_id: bool,
        fields: Vec<(String, ProjectField)>,
    },
}

impl Stage {
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Match(filter) => doc! { "$match": filter.to_document() },
            Stage::AddFields(fields) => {
                let mut body = Document::new();
                for (name, expr) in fields {
                    body.insert(name.clone(), expr.to_bson());
                }
                doc! { "$addFields": body }
            }
            Stage::Group { key, accumulators } => {
                let mut body = doc! { "_id": key.to_bson() };
                for (name, acc) in accumulators {
                    body.insert(name.clone(), acc.to_bson());
                }
                doc! { "$group": body }
            }
            Stage::Sort(keys) => {
                let mut body = Document::new();
                for (name, dir) in keys {
                    body.insert(name.clone(), dir.as_i32());
                }
                doc! { "$sort": body }
            }
            Stage::Limit(n) => {
                let n = *n as i64;
                doc! { "$limit": n }
            }
            Stage::Project { include_id, fields } => {
                let mut body = Document::new();
                if !include_id {
                    body.insert("_id", 0);
                }
                for (name, field) in fields {
                    match field {
                        ProjectField::Include => body.insert(name.clone(), 1),
                        ProjectField::Computed(expr) => body.insert(name.clone(), expr.to_bson()),
                    };
                }
                doc! { "$project": body }
            }
        }
    }
}

fn check_output_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('$') || name.contains('.') {
        return Err(StoreError::invalid_query(format!(
            "'{}' is not a valid output field name",
            name
        )));
    }
    Ok(())
}

/// An ordered list of stages, validated as it is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, filter: BookFilter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn add_fields(mut self, fields: Vec<(&str, Expr)>) -> Result<Self> {
        for (name, _) in &fields {
            check_output_name(name)?;
        }
        self.stages.push(Stage::AddFields(
            fields.into_iter().map(|(n, e)| (n.to_string(), e)).collect(),
        ));
        Ok(self)
    }

    pub fn group(mut self, key: Expr, accumulators: Vec<(&str, Accumulator)>) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::new();
        for (name, _) in &accumulators {
            check_output_name(name)?;
            if *name == "_id" || seen.contains(name) {
                return Err(StoreError::invalid_query(format!(
                    "duplicate group output '{}'",
                    name
                )));
            }
            seen.push(*name);
        }
        self.stages.push(Stage::Group {
            key,
            accumulators: accumulators
                .into_iter()
                .map(|(n, a)| (n.to_string(), a))
                .collect(),
        });
        Ok(self)
    }

    pub fn sort(mut self, keys: Vec<(&str, SortDirection)>) -> Result<Self> {
        if keys.is_empty() {
            return Err(StoreError::invalid_query("$sort needs at least one key"));
        }
        self.stages.push(Stage::Sort(
            keys.into_iter().map(|(n, d)| (n.to_string(), d)).collect(),
        ));
        Ok(self)
    }

    pub fn limit(mut self, n: u64) -> Result<Self> {
        if n == 0 || n > i64::MAX as u64 {
            return Err(StoreError::invalid_query("$limit must be a positive integer"));
        }
        self.stages.push(Stage::Limit(n));
        Ok(self)
    }

    pub fn project(mut self, include_id: bool, fields: Vec<(&str, ProjectField)>) -> Result<Self> {
        for (name, _) in &fields {
            check_output_name(name)?;
        }
        self.stages.push(Stage::Project {
            include_id,
            fields: fields.into_iter().map(|(n, f)| (n.to_string(), f)).collect(),
        });
        Ok(self)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}
