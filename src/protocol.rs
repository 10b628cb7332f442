//! Wire structs for every backend collaborator (serde ready).
//! Keep this small and stable so the client and backend can evolve independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

//
// Scoring requests
//

/// Body of a practice (anonymous) scoring call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PracticeScoreRequest {
    pub system_prompt: String,
    pub dataset_type: String,
    pub show_details: bool,
    pub turn: u8,
    /// Only the immediately preceding turn's output, never the full history.
    pub previous_outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

/// Body of a named test submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestScoreRequest {
    pub name: String,
    pub system_prompt: String,
    pub dataset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_outputs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

//
// Scoring responses
//

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ScoreResponse {
    #[serde(default)]
    pub examples: Vec<ExampleResult>,
    #[serde(default)]
    pub metrics: Option<Metrics>,
}

impl ScoreResponse {
    /// Output of the first example, if it exists and is non-empty.
    pub fn first_output(&self) -> Option<&str> {
        self.examples
            .first()
            .and_then(|ex| ex.output())
    }

    pub fn has_metrics(&self) -> bool {
        self.metrics.as_ref().map(|m| !m.is_empty()).unwrap_or(false)
    }
}

/// Category-specific metric fields, kept as an open map.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Metrics(pub Map<String, Value>);

impl Metrics {
    /// Numeric value of a metric. Numeric strings are accepted, like `parseFloat`.
    pub fn num(&self, key: &str) -> Option<f64> {
        value_as_f64(self.0.get(key)?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One scored example. Known fields are typed; the rest stays in `extra`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ExampleResult {
    #[serde(default)]
    pub raw_prediction: Option<String>,
    #[serde(default)]
    pub model_output: Option<String>,
    #[serde(default)]
    pub processed_prediction: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub expected: Option<Value>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub reference_solution: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub scores: Option<Metrics>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExampleResult {
    /// Non-empty model output for this example.
    pub fn output(&self) -> Option<&str> {
        self.raw_prediction
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// Top-level numeric field not covered by the typed ones (e.g. `final_score`).
    pub fn num(&self, key: &str) -> Option<f64> {
        value_as_f64(self.extra.get(key)?)
    }

    pub fn score(&self, key: &str) -> Option<f64> {
        self.scores.as_ref().and_then(|s| s.num(key))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ComplexExamplesResponse {
    #[serde(default)]
    pub examples: Vec<ComplexExample>,
}

/// Task shown above a complex-transformation session.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ComplexExample {
    #[serde(default)]
    pub task_description: String,
    #[serde(default)]
    pub display_reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

//
// Dataset catalog
//

/// Catalog entry per dataset key, as served by the dataset configuration provider.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DatasetInfo {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub scoring: String,
    #[serde(default)]
    pub example: Option<DatasetExample>,
    #[serde(default)]
    pub practice_mode_info: Option<Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DatasetExample {
    Translations {
        input: String,
        translations: BTreeMap<String, String>,
    },
    Plain {
        input: String,
        output: String,
    },
}

pub type DatasetCatalog = BTreeMap<String, DatasetInfo>;

//
// Leaderboard
//

/// One leaderboard row. The schema depends on the category, so the record is an open map;
/// `name`, `score` and `timestamp` are always present in well-formed data.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct LeaderboardEntry(pub Map<String, Value>);

impl LeaderboardEntry {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn name(&self) -> &str {
        self.0.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn score(&self) -> Option<f64> {
        self.get("score").and_then(value_as_f64)
    }
}

pub fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn practice_request_omits_absent_language() {
        let req = PracticeScoreRequest {
            system_prompt: "sort these".into(),
            dataset_type: "word_sorting".into(),
            show_details: true,
            turn: 1,
            previous_outputs: vec![],
            target_language: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["previous_outputs"], json!([]));
        assert!(v.get("target_language").is_none());
    }

    #[test]
    fn score_response_tolerates_missing_sections() {
        let r: ScoreResponse = serde_json::from_value(json!({})).unwrap();
        assert!(r.examples.is_empty());
        assert!(r.first_output().is_none());
        assert!(!r.has_metrics());

        let r: ScoreResponse = serde_json::from_value(json!({
            "examples": [{"raw_prediction": "", "is_correct": false}],
            "metrics": {}
        }))
        .unwrap();
        assert!(r.first_output().is_none());
        assert!(!r.has_metrics());
    }

    #[test]
    fn example_extra_fields_are_reachable() {
        let ex: ExampleResult = serde_json::from_value(json!({
            "raw_prediction": "hola",
            "final_score": 81.25,
            "scores": {"similarity": "77.5"}
        }))
        .unwrap();
        assert_eq!(ex.output(), Some("hola"));
        assert_eq!(ex.num("final_score"), Some(81.25));
        assert_eq!(ex.score("similarity"), Some(77.5));
    }

    #[test]
    fn dataset_example_variants_are_distinguished() {
        let plain: DatasetExample =
            serde_json::from_value(json!({"input": "b a", "output": "a b"})).unwrap();
        assert!(matches!(plain, DatasetExample::Plain { .. }));
        let tr: DatasetExample = serde_json::from_value(
            json!({"input": "Hello", "translations": {"pt": "Olá", "es": "Hola"}}),
        )
        .unwrap();
        match tr {
            DatasetExample::Translations { translations, .. } => {
                assert_eq!(translations.get("pt").map(String::as_str), Some("Olá"))
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn leaderboard_entry_treats_null_as_missing() {
        let e: LeaderboardEntry =
            serde_json::from_value(json!({"name": "ana", "score": 88.0, "accuracy": null})).unwrap();
        assert_eq!(e.name(), "ana");
        assert_eq!(e.score(), Some(88.0));
        assert!(e.get("accuracy").is_none());
    }
}
