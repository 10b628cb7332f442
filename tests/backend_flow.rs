//! End-to-end runs of the real HTTP client against an in-process mock backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use promptlab::leaderboard::LeaderboardBody;
use promptlab::protocol::PracticeScoreRequest;
use promptlab::{
  ApiError, ClientConfig, DatasetKind, HttpBackend, LeaderboardError, ScoringApi, SessionError, TurnOutcome,
  Workbench,
};

#[derive(Clone, Default)]
struct Recorded {
  practice: Arc<Mutex<Vec<Value>>>,
  test: Arc<Mutex<Vec<Value>>>,
}

async fn datasets() -> Json<Value> {
  Json(json!({
    "word_sorting": {
      "description": "Sort the words alphabetically",
      "instructions": ["Write a system prompt"],
      "scoring": "Word accuracy",
      "example": {"input": "pear apple", "output": "apple pear"}
    },
    "complex_transformation": {
      "description": "Three-turn transformation",
      "instructions": [],
      "scoring": "Final output only"
    }
  }))
}

fn complex_turn(body: &Value) -> Value {
  let turn = body["turn"].as_u64().unwrap_or(0);
  let output = match turn {
    1 => "X1",
    2 => "X2",
    _ => "Y",
  };
  let mut resp = json!({"examples": [{"raw_prediction": output}]});
  if turn == 3 {
    resp["metrics"] = json!({
      "final_score": 75.0,
      "rule_accuracy": 80.0,
      "completeness": 70.0,
      "format_score": 90.0,
      "efficiency": 60.0
    });
    resp["examples"][0]["task_description"] = json!("Transform the list");
    resp["examples"][0]["reference_solution"] = json!("Y*");
  }
  resp
}

async fn pretest(State(rec): State<Recorded>, Json(body): Json<Value>) -> Response {
  rec.practice.lock().unwrap().push(body.clone());
  match body["dataset_type"].as_str() {
    Some("word_sorting") => Json(json!({
      "examples": [{
        "raw_prediction": "apple pear",
        "processed_prediction": "apple pear",
        "input": "pear apple",
        "expected": "apple pear",
        "is_correct": true,
        "final_score": 100
      }],
      "metrics": {
        "combined_score": 92,
        "accuracy": 100,
        "word_accuracy": 95,
        "word_order_distance": 1.5,
        "efficiency_modifier": 0.8,
        "prompt_length": 31
      }
    }))
    .into_response(),
    Some("complex_transformation") => Json(complex_turn(&body)).into_response(),
    // The backend reports missing credentials with a 200 and an error body.
    _ => Json(json!({"error": "GROQ_API_KEY not found"})).into_response(),
  }
}

async fn test_prompt(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
  rec.test.lock().unwrap().push(body.clone());
  Json(json!({
    "examples": [{"raw_prediction": "apple pear", "is_correct": true}],
    "metrics": {"combined_score": 88, "accuracy": 90, "word_accuracy": 85, "word_order_distance": 2, "efficiency_modifier": 1}
  }))
}

async fn complex_practice() -> Json<Value> {
  Json(json!({"examples": [{"task_description": "Transform the list", "display_reference": "Y*"}]}))
}

async fn leaderboard(Path(category): Path<String>) -> Response {
  match category.as_str() {
    "word_sorting" => Json(json!([
      {"name": "ana", "score": 71.25, "prompt_length": 120, "accuracy": 80, "word_accuracy": 83.456, "efficiency": null, "timestamp": "2024-03-02T15:07:00"},
      {"name": "bo", "score": 88.5, "prompt_length": 80, "accuracy": 90, "word_accuracy": 91, "efficiency": 77, "timestamp": "2024-03-01T09:30:00"}
    ]))
    .into_response(),
    "text_summarization" => Json(Value::Null).into_response(),
    "translation_task" => Json(json!([])).into_response(),
    _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "database unavailable"}))).into_response(),
  }
}

async fn spawn_backend() -> (SocketAddr, Recorded) {
  let rec = Recorded::default();
  let app = Router::new()
    .route("/config/datasets.json", get(datasets))
    .route("/api/pretest", post(pretest))
    .route("/api/test_prompt", post(test_prompt))
    .route("/api/complex_practice", get(complex_practice))
    .route("/api/complex_test", get(complex_practice))
    .route("/api/leaderboard/:category", get(leaderboard))
    .with_state(rec.clone());

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  (addr, rec)
}

async fn workbench() -> (Workbench, Recorded, Arc<HttpBackend>) {
  let (addr, rec) = spawn_backend().await;
  let mut cfg = ClientConfig::default();
  cfg.base_url = format!("http://{addr}");
  cfg.session.test_reset_delay_ms = 0;
  let backend = Arc::new(HttpBackend::new(cfg.clone()).unwrap());
  let mut wb = Workbench::with_backend(&cfg, backend.clone());
  wb.load_catalog().await.unwrap();
  (wb, rec, backend)
}

#[tokio::test]
async fn word_sorting_practice_scores_and_resets() {
  let (mut wb, rec, _) = workbench().await;
  let sel = wb.select_dataset(Some(DatasetKind::WordSorting)).await;
  assert_eq!(sel.instructions.unwrap().description, "Sort the words alphabetically");

  let outcome = wb.practice().submit("Sort the words alphabetically.").await.unwrap();
  let TurnOutcome::Finalized(report) = outcome else { panic!("single-turn submit should finalize") };
  let panel = report.results.panel.as_ref().unwrap();
  assert_eq!(panel.value("Combined Score"), Some("92%"));
  assert_eq!(panel.value("Word Order Distance"), Some("1.50"));
  assert_eq!(panel.value("Prompt Efficiency"), Some("80%"));
  assert_eq!(panel.value("Prompt Length"), Some("31 chars"));
  assert_eq!(report.results.examples.len(), 1);

  let sent = rec.practice.lock().unwrap()[0].clone();
  assert_eq!(sent["dataset_type"], "word_sorting");
  assert_eq!(sent["show_details"], true);
  assert_eq!(sent["turn"], 1);
  assert_eq!(sent["previous_outputs"], json!([]));
  assert!(sent.get("target_language").is_none());

  // Practice resets right away.
  let view = wb.practice().view().await;
  assert_eq!(view.turn, 1);
  assert!(!view.finalized);
}

#[tokio::test]
async fn complex_transformation_runs_three_turns() {
  let (mut wb, rec, _) = workbench().await;
  let sel = wb.select_dataset(Some(DatasetKind::ComplexTransformation)).await;
  assert_eq!(sel.practice_example.unwrap().task_description, "Transform the list");

  let practice = wb.practice();
  let first = practice.submit("step one").await.unwrap();
  assert_eq!(first, TurnOutcome::Advanced { completed_turn: 1, next_turn: 2, output: "X1".into() });
  assert_eq!(
    practice.view().await.placeholder,
    "Enter your prompt for turn 2. Previous output will be used as context."
  );
  practice.submit("step two").await.unwrap();
  let last = practice.submit("step 3").await.unwrap();

  let TurnOutcome::Finalized(report) = last else { panic!("third turn should finalize") };
  assert_eq!(report.outputs, vec!["X1", "X2", "Y"]);
  assert_eq!(report.total_prompt_length, "step one".len() + "step two".len() + "step 3".len());
  assert!(report.input_hidden);
  let panel = report.results.panel.as_ref().unwrap();
  assert_eq!(panel.value("Final Score"), Some("75.0%"));
  assert_eq!(panel.value("Prompt Length"), Some("22 chars"));

  let sent = rec.practice.lock().unwrap().clone();
  assert_eq!(sent.len(), 3);
  assert_eq!(sent[0]["previous_outputs"], json!([]));
  assert_eq!(sent[1]["previous_outputs"], json!(["X1"]));
  assert_eq!(sent[2]["previous_outputs"], json!(["X2"]));
  assert_eq!(sent[2]["turn"], 3);
}

#[tokio::test]
async fn test_mode_sends_name_and_requires_it() {
  let (mut wb, rec, _) = workbench().await;
  wb.select_dataset(Some(DatasetKind::WordSorting)).await;

  let err = wb.test().submit("Sort them").await.unwrap_err();
  assert!(matches!(err, SessionError::Validation(ref m) if m == "Please enter your name"));
  assert!(rec.test.lock().unwrap().is_empty());

  wb.set_name("  ana  ").await;
  let outcome = wb.test().submit("Sort them").await.unwrap();
  assert!(matches!(outcome, TurnOutcome::Finalized(_)));

  let sent = rec.test.lock().unwrap()[0].clone();
  assert_eq!(sent["name"], "ana");
  assert!(sent.get("turn").is_none());
  assert!(sent.get("previous_outputs").is_none());
}

#[tokio::test]
async fn error_body_on_success_status_is_a_failure() {
  let (mut wb, _, backend) = workbench().await;
  wb.select_dataset(Some(DatasetKind::CausalJudgement)).await;

  let err = wb.practice().submit("Judge causality").await.unwrap_err();
  match err {
    SessionError::Transport(ApiError::Backend(msg)) => assert_eq!(msg, "GROQ_API_KEY not found"),
    other => panic!("unexpected error: {other:?}"),
  }
  assert_eq!(wb.practice().view().await.turn, 1);

  let req = PracticeScoreRequest {
    system_prompt: "Judge causality".into(),
    dataset_type: "causal_judgement".into(),
    show_details: true,
    turn: 1,
    previous_outputs: vec![],
    target_language: None,
  };
  assert!(matches!(backend.score_practice(&req).await, Err(ApiError::Backend(_))));
}

#[tokio::test]
async fn leaderboard_table_empty_and_error() {
  let (mut wb, _, _) = workbench().await;
  let board = wb.leaderboard_mut();

  let view = board.select_category("word_sorting").await.unwrap();
  let LeaderboardBody::Table(table) = view.body else { panic!("expected a table") };
  assert_eq!(table.rows[0][0].text, "bo");
  assert_eq!(table.rows[1][4].text, "83.5%");
  assert_eq!(table.rows[1][5].text, "-");
  assert_eq!(table.rows[1][6].text, "Mar 2, 2024, 03:07 PM");
  assert_eq!(table.stats.total_entries, 2);

  let view = board.select_category("text_summarization").await.unwrap();
  assert_eq!(view.title, "Text Summarization Leaderboard");
  assert_eq!(view.body, LeaderboardBody::Empty);

  let view = board.select_category("translation_task").await.unwrap();
  assert_eq!(view.body, LeaderboardBody::Empty);

  let err = board.select_category("causal_judgement").await.unwrap_err();
  match err {
    LeaderboardError::Transport(ApiError::Status { status, message }) => {
      assert_eq!(status.as_u16(), 500);
      assert_eq!(message, "database unavailable");
    }
    other => panic!("unexpected error: {other:?}"),
  }
  assert!(matches!(board.view().body, LeaderboardBody::Error(_)));
}
