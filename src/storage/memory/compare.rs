//! BSON ordering and filter matching for the in-memory store.
//!
//! Values compare within MongoDB's type brackets: null < numbers < strings <
//! documents < arrays < object ids < booleans < everything else. Numbers
//! compare by value regardless of their BSON width.

use crate::domain::query::{BookFilter, Comparison, Predicate};
use bson::{Bson, Document};
use std::cmp::Ordering;

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        _ => 7,
    }
}

pub(crate) fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

/// Total order over BSON values, used for sorting and range predicates.
pub(crate) fn compare(a: &Bson, b: &Bson) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Document(x), Bson::Document(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

pub(crate) fn same_value(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b) && compare(a, b) == Ordering::Equal
}

/// Orders two documents by a field; a missing field sorts as null.
pub(crate) fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    let null = Bson::Null;
    compare(a.get(field).unwrap_or(&null), b.get(field).unwrap_or(&null))
}

/// Ordering of `actual` against `target`, if both sit in the same type bracket.
fn bracketed(actual: Option<&Bson>, target: &Bson) -> Option<Ordering> {
    let actual = actual?;
    (type_rank(actual) == type_rank(target)).then(|| compare(actual, target))
}

fn matches_predicate(doc: &Document, predicate: &Predicate) -> bool {
    let target = predicate.value.to_bson();
    let actual = doc.get(predicate.field.as_str());
    let ord = bracketed(actual, &target);
    match predicate.op {
        Comparison::Eq => ord == Some(Ordering::Equal),
        Comparison::Ne => ord != Some(Ordering::Equal),
        Comparison::Gt => ord == Some(Ordering::Greater),
        Comparison::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        Comparison::Lt => ord == Some(Ordering::Less),
        Comparison::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
    }
}

pub(crate) fn matches(doc: &Document, filter: &BookFilter) -> bool {
    filter.predicates().iter().all(|p| matches_predicate(doc, p))
}
