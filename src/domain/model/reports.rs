//! Row types produced by the catalog's aggregation pipelines and explain.

use super::lenient;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// `$group` by genre with `$avg` over price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreAveragePrice {
    #[serde(rename = "_id", default, deserialize_with = "lenient::opt_string")]
    pub genre: Option<String>,
    #[serde(rename = "averagePrice", default, deserialize_with = "lenient::opt_f64")]
    pub average_price: Option<f64>,
}

/// Author together with the number of books they have in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorBookCount {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub author: Option<String>,
    #[serde(rename = "totalBooks", deserialize_with = "lenient::i64")]
    pub total_books: i64,
}

/// Number of books published in a decade (`1990` covers 1990..=1999).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecadeCount {
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub decade: Option<i32>,
    #[serde(rename = "totalBooks", deserialize_with = "lenient::i64")]
    pub total_books: i64,
}

/// Average of a numeric field for one group key. `average` is `None` when no
/// document in the group held a number.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAverage {
    pub key: Bson,
    pub average: Option<f64>,
}

impl GroupAverage {
    pub(crate) fn from_row(row: &Document, output: &str) -> Self {
        let average = match row.get(output) {
            Some(Bson::Double(d)) => Some(*d),
            Some(other) => lenient::integral(other).map(|v| v as f64),
            None => None,
        };
        Self {
            key: row.get("_id").cloned().unwrap_or(Bson::Null),
            average,
        }
    }
}

/// Number of documents sharing one group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCount {
    pub key: Bson,
    pub total_books: i64,
}

impl GroupCount {
    pub(crate) fn from_row(row: &Document, key: &str) -> Self {
        Self {
            key: row.get(key).cloned().unwrap_or(Bson::Null),
            total_books: row.get("totalBooks").and_then(lenient::integral).unwrap_or(0),
        }
    }
}

/// The parts of an `executionStats` explain document worth printing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanSummary {
    /// Leaf access stage, e.g. `IXSCAN` or `COLLSCAN`.
    pub stage: Option<String>,
    pub index_name: Option<String>,
    pub returned: i64,
    pub docs_examined: i64,
    pub keys_examined: i64,
    pub execution_time_ms: i64,
}

impl PlanSummary {
    pub fn from_explain(explain: &Document) -> Self {
        let mut summary = PlanSummary::default();
        if let Ok(planner) = explain.get_document("queryPlanner") {
            if let Ok(plan) = planner.get_document("winningPlan") {
                // Newer servers nest the classic plan under `queryPlan`.
                let plan = plan.get_document("queryPlan").unwrap_or(plan);
                let leaf = Self::leaf_stage(plan);
                summary.stage = leaf.get_str("stage").ok().map(str::to_string);
                summary.index_name = leaf.get_str("indexName").ok().map(str::to_string);
            }
        }
        if let Ok(stats) = explain.get_document("executionStats") {
            let number = |key: &str| stats.get(key).and_then(lenient::integral).unwrap_or(0);
            summary.returned = number("nReturned");
            summary.docs_examined = number("totalDocsExamined");
            summary.keys_examined = number("totalKeysExamined");
            summary.execution_time_ms = number("executionTimeMillis");
        }
        summary
    }

    fn leaf_stage(mut plan: &Document) -> &Document {
        loop {
            match plan.get_document("inputStage") {
                Ok(inner) => plan = inner,
                Err(_) => match plan.get_array("inputStages").ok().and_then(|a| a.first()) {
                    Some(Bson::Document(inner)) => plan = inner,
                    _ => return plan,
                },
            }
        }
    }

    pub fn uses_index(&self) -> bool {
        self.stage.as_deref() == Some("IXSCAN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn decade_rows_accept_double_buckets() {
        let row: DecadeCount = bson::from_document(doc! { "decade": 1990.0, "totalBooks": 2 }).unwrap();
        assert_eq!(row, DecadeCount { decade: Some(1990), total_books: 2 });

        let missing_year: DecadeCount =
            bson::from_document(doc! { "decade": null, "totalBooks": 1 }).unwrap();
        assert_eq!(missing_year.decade, None);
    }

    #[test]
    fn plan_summary_finds_the_leaf_stage() {
        let explain = doc! {
            "queryPlanner": {
                "winningPlan": {
                    "stage": "FETCH",
                    "inputStage": { "stage": "IXSCAN", "indexName": "author_1_published_year_-1" }
                }
            },
            "executionStats": {
                "nReturned": 1,
                "executionTimeMillis": 0,
                "totalKeysExamined": 1,
                "totalDocsExamined": 1
            }
        };
        let summary = PlanSummary::from_explain(&explain);
        assert!(summary.uses_index());
        assert_eq!(summary.index_name.as_deref(), Some("author_1_published_year_-1"));
        assert_eq!(summary.returned, 1);
        assert_eq!(summary.docs_examined, 1);
    }

    #[test]
    fn plan_summary_tolerates_sparse_documents() {
        let summary = PlanSummary::from_explain(&doc! { "ok": 1.0 });
        assert_eq!(summary, PlanSummary::default());
        assert!(!summary.uses_index());
    }
}
