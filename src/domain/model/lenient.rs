//! Serde helpers for documents written by other clients.
//!
//! The collection enforces no schema, so a field may hold an integer stored
//! as a double, or a value of the wrong type altogether. Integral doubles are
//! accepted; mistyped values read as `None` and are logged instead of failing
//! the whole read.

use bson::Bson;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

pub(crate) fn integral(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(*i as i64),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) if d.is_finite() && d.fract() == 0.0 => Some(*d as i64),
        _ => None,
    }
}

fn mistyped<T>(expected: &str, value: &Bson) -> Option<T> {
    tracing::warn!(expected, found = %value, "ignoring mistyped book field");
    None
}

fn present<'de, D>(deserializer: D) -> Result<Option<Bson>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Bson>::deserialize(deserializer)? {
        None | Some(Bson::Null) => Ok(None),
        Some(value) => Ok(Some(value)),
    }
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(present(deserializer)?.and_then(|value| {
        match integral(&value).and_then(|v| i32::try_from(v).ok()) {
            Some(v) => Some(v),
            None => mistyped("32-bit integer", &value),
        }
    }))
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(present(deserializer)?.and_then(|value| match value {
        Bson::Double(d) => Some(d),
        Bson::Int32(i) => Some(i as f64),
        Bson::Int64(i) => Some(i as f64),
        other => mistyped("number", &other),
    }))
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(present(deserializer)?.and_then(|value| match value {
        Bson::Boolean(b) => Some(b),
        other => mistyped("boolean", &other),
    }))
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(present(deserializer)?.and_then(|value| match value {
        Bson::String(s) => Some(s),
        other => mistyped("string", &other),
    }))
}

/// Counts produced by `$sum` pipelines; these are always numeric.
pub fn i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Bson::deserialize(deserializer)?;
    integral(&value).ok_or_else(|| D::Error::custom(format!("expected an integer, found {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "opt_i32")]
        year: Option<i32>,
        #[serde(default, deserialize_with = "opt_f64")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "opt_bool")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "opt_string")]
        name: Option<String>,
    }

    #[test]
    fn mistyped_values_read_as_none() {
        let row: Row = bson::from_document(doc! {
            "year": "1965", "price": "cheap", "flag": 1, "name": 42
        })
        .unwrap();
        assert_eq!(row.year, None);
        assert_eq!(row.price, None);
        assert_eq!(row.flag, None);
        assert_eq!(row.name, None);
    }

    #[test]
    fn well_typed_values_survive() {
        let row: Row = bson::from_document(doc! {
            "year": 1965.0, "price": 12, "flag": true, "name": "Dune"
        })
        .unwrap();
        assert_eq!(row.year, Some(1965));
        assert_eq!(row.price, Some(12.0));
        assert_eq!(row.flag, Some(true));
        assert_eq!(row.name.as_deref(), Some("Dune"));

        let empty: Row = bson::from_document(doc! { "year": null }).unwrap();
        assert_eq!(empty.year, None);
    }

    #[test]
    fn year_out_of_range_reads_as_none() {
        let row: Row = bson::from_document(doc! { "year": 10_000_000_000_i64 }).unwrap();
        assert_eq!(row.year, None);
    }
}
