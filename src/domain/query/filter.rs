use super::field::{BookField, FieldKind, FieldValue};
use crate::error::{Result, StoreError};
use bson::{Bson, Document};

/// Comparison operator of a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::Eq => "$eq",
            Comparison::Ne => "$ne",
            Comparison::Gt => "$gt",
            Comparison::Gte => "$gte",
            Comparison::Lt => "$lt",
            Comparison::Lte => "$lte",
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparison::Eq | Comparison::Ne)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: BookField,
    pub op: Comparison,
    pub value: FieldValue,
}

/// A conjunction of field predicates. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    predicates: Vec<Predicate>,
}

impl BookFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds `field <op> value`, rejecting it when the value does not fit the
    /// field or the same field/operator pair is already constrained.
    pub fn with(
        mut self,
        field: BookField,
        op: Comparison,
        value: impl Into<FieldValue>,
    ) -> Result<Self> {
        let value = value.into();
        field.check(&value)?;
        if op.is_ordering() && field.kind() == FieldKind::Boolean {
            return Err(StoreError::invalid_query(format!(
                "'{}' cannot be used with {}",
                field,
                op.operator()
            )));
        }
        if self
            .predicates
            .iter()
            .any(|p| p.field == field && p.op == op)
        {
            return Err(StoreError::invalid_query(format!(
                "duplicate {} predicate on '{}'",
                op.operator(),
                field
            )));
        }
        self.predicates.push(Predicate { field, op, value });
        Ok(self)
    }

    pub fn eq(self, field: BookField, value: impl Into<FieldValue>) -> Result<Self> {
        self.with(field, Comparison::Eq, value)
    }

    pub fn ne(self, field: BookField, value: impl Into<FieldValue>) -> Result<Self> {
        self.with(field, Comparison::Ne, value)
    }

    pub fn gt(self, field: BookField, value: impl Into<FieldValue>) -> Result<Self> {
        self.with(field, Comparison::Gt, value)
    }

    pub fn gte(self, field: BookField, value: impl Into<FieldValue>) -> Result<Self> {
        self.with(field, Comparison::Gte, value)
    }

    pub fn lt(self, field: BookField, value: impl Into<FieldValue>) -> Result<Self> {
        self.with(field, Comparison::Lt, value)
    }

    pub fn lte(self, field: BookField, value: impl Into<FieldValue>) -> Result<Self> {
        self.with(field, Comparison::Lte, value)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// True when any predicate constrains `field`.
    pub fn constrains(&self, field: BookField) -> bool {
        self.predicates.iter().any(|p| p.field == field)
    }

    /// Renders the filter as a MongoDB query document.
    ///
    /// A field with a single equality predicate uses the short `{field: value}`
    /// form; everything else uses operator documents.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for p in &self.predicates {
            let key = p.field.as_str();
            let single_eq = p.op == Comparison::Eq
                && self.predicates.iter().filter(|o| o.field == p.field).count() == 1;
            if single_eq {
                doc.insert(key, p.value.to_bson());
                continue;
            }
            let mut ops = match doc.get(key) {
                Some(Bson::Document(existing)) => existing.clone(),
                _ => Document::new(),
            };
            ops.insert(p.op.operator(), p.value.to_bson());
            doc.insert(key, ops);
        }
        doc
    }
}
