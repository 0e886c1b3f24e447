//! Aggregation pipeline evaluation for the in-memory store.

use super::compare::{compare_field, matches, numeric, same_value};
use crate::domain::query::{Accumulator, Expr, ProjectField, SortDirection, Stage};
use crate::error::{Result, StoreError};
use bson::{Bson, Document};

/// Evaluates `expr` against `doc`. `None` means the referenced field is missing.
fn eval(expr: &Expr, doc: &Document) -> Result<Option<Bson>> {
    match expr {
        Expr::Field(name) => Ok(doc.get(name).cloned()),
        Expr::Literal(value) => Ok(Some(value.clone())),
        Expr::Multiply(factors) => {
            let mut all_int = true;
            let mut int_product: i64 = 1;
            let mut float_product: f64 = 1.0;
            for factor in factors {
                let value = match eval(factor, doc)? {
                    None | Some(Bson::Null) => return Ok(Some(Bson::Null)),
                    Some(v) => v,
                };
                let n = numeric(&value).ok_or_else(|| {
                    StoreError::invalid_query(format!("$multiply only supports numeric types, not {}", value))
                })?;
                match value {
                    Bson::Int32(i) if all_int => {
                        all_int = match int_product.checked_mul(i as i64) {
                            Some(p) => {
                                int_product = p;
                                true
                            }
                            None => false,
                        };
                    }
                    Bson::Int64(i) if all_int => {
                        all_int = match int_product.checked_mul(i) {
                            Some(p) => {
                                int_product = p;
                                true
                            }
                            None => false,
                        };
                    }
                    _ => all_int = false,
                }
                float_product *= n;
            }
            if all_int {
                Ok(Some(match i32::try_from(int_product) {
                    Ok(small) => Bson::Int32(small),
                    Err(_) => Bson::Int64(int_product),
                }))
            } else {
                Ok(Some(Bson::Double(float_product)))
            }
        }
        Expr::Divide(num, den) => {
            let (num, den) = match (eval(num, doc)?, eval(den, doc)?) {
                (Some(n), Some(d)) if n != Bson::Null && d != Bson::Null => (n, d),
                _ => return Ok(Some(Bson::Null)),
            };
            match (numeric(&num), numeric(&den)) {
                (Some(_), Some(d)) if d == 0.0 => Err(StoreError::invalid_query("can't $divide by zero")),
                (Some(n), Some(d)) => Ok(Some(Bson::Double(n / d))),
                _ => Err(StoreError::invalid_query(format!(
                    "$divide only supports numeric types, not {} and {}",
                    num, den
                ))),
            }
        }
        Expr::Floor(inner) => match eval(inner, doc)? {
            None | Some(Bson::Null) => Ok(Some(Bson::Null)),
            Some(Bson::Double(d)) => Ok(Some(Bson::Double(d.floor()))),
            Some(v @ (Bson::Int32(_) | Bson::Int64(_))) => Ok(Some(v)),
            Some(other) => Err(StoreError::invalid_query(format!(
                "$floor only supports numeric types, not {}",
                other
            ))),
        },
    }
}

enum AccState {
    Avg { total: f64, count: u64 },
    Sum { int_total: i64, float_total: f64, saw_double: bool },
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Avg(_) => AccState::Avg { total: 0.0, count: 0 },
            Accumulator::Sum(_) => AccState::Sum { int_total: 0, float_total: 0.0, saw_double: false },
        }
    }

    // Non-numeric inputs are ignored, as MongoDB does.
    fn push(&mut self, value: Option<Bson>) {
        let Some(value) = value else { return };
        match self {
            AccState::Avg { total, count } => {
                if let Some(n) = numeric(&value) {
                    *total += n;
                    *count += 1;
                }
            }
            AccState::Sum { int_total, float_total, saw_double } => match value {
                Bson::Int32(i) => {
                    *int_total = int_total.saturating_add(i as i64);
                    *float_total += i as f64;
                }
                Bson::Int64(i) => {
                    *int_total = int_total.saturating_add(i);
                    *float_total += i as f64;
                }
                Bson::Double(d) => {
                    *saw_double = true;
                    *float_total += d;
                }
                _ => {}
            },
        }
    }

    fn finish(self) -> Bson {
        match self {
            AccState::Avg { count: 0, .. } => Bson::Null,
            AccState::Avg { total, count } => Bson::Double(total / count as f64),
            AccState::Sum { float_total, saw_double: true, .. } => Bson::Double(float_total),
            AccState::Sum { int_total, .. } => match i32::try_from(int_total) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(int_total),
            },
        }
    }
}

fn group(
    docs: Vec<Document>,
    key: &Expr,
    accumulators: &[(String, Accumulator)],
) -> Result<Vec<Document>> {
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();
    for doc in &docs {
        let k = eval(key, doc)?.unwrap_or(Bson::Null);
        let idx = match groups.iter().position(|(existing, _)| same_value(existing, &k)) {
            Some(i) => i,
            None => {
                groups.push((k, accumulators.iter().map(|(_, a)| AccState::new(a)).collect()));
                groups.len() - 1
            }
        };
        for ((_, acc), state) in accumulators.iter().zip(groups[idx].1.iter_mut()) {
            let input = match acc {
                Accumulator::Avg(e) | Accumulator::Sum(e) => eval(e, doc)?,
            };
            state.push(input);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(k, states)| {
            let mut out = Document::new();
            out.insert("_id", k);
            for ((name, _), state) in accumulators.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect())
}

fn project(doc: &Document, include_id: bool, fields: &[(String, ProjectField)]) -> Result<Document> {
    let mut out = Document::new();
    if include_id {
        if let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for (name, field) in fields {
        let value = match field {
            ProjectField::Include => doc.get(name).cloned(),
            ProjectField::Computed(expr) => eval(expr, doc)?,
        };
        if let Some(value) = value {
            out.insert(name.clone(), value);
        }
    }
    Ok(out)
}

/// Runs `stages` over `docs` in order.
pub(crate) fn run(stages: &[Stage], mut docs: Vec<Document>) -> Result<Vec<Document>> {
    for stage in stages {
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| matches(d, filter)).collect(),
            Stage::AddFields(fields) => {
                let mut out = Vec::with_capacity(docs.len());
                for mut doc in docs {
                    for (name, expr) in fields {
                        if let Some(value) = eval(expr, &doc)? {
                            doc.insert(name.clone(), value);
                        }
                    }
                    out.push(doc);
                }
                out
            }
            Stage::Group { key, accumulators } => group(docs, key, accumulators)?,
            Stage::Sort(keys) => {
                docs.sort_by(|a, b| {
                    keys.iter()
                        .map(|(name, dir)| {
                            let ord = compare_field(a, b, name);
                            match dir {
                                SortDirection::Ascending => ord,
                                SortDirection::Descending => ord.reverse(),
                            }
                        })
                        .find(|ord| ord.is_ne())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(usize::try_from(*n).unwrap_or(usize::MAX));
                docs
            }
            Stage::Project { include_id, fields } => docs
                .iter()
                .map(|d| project(d, *include_id, fields))
                .collect::<Result<Vec<_>>>()?,
        };
    }
    Ok(docs)
}
