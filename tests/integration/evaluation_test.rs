//! Self-Evaluation Integration Tests
//!
//! The optional review pass after consolidation: revisions keep the draft,
//! reviewer failures leave the consolidated results in place unless the
//! provider rejects the credentials or the model.

use recap_analyzer::models::EvaluationStatus;
use recap_analyzer::{AppError, ProgressReporter};
use recap_llm::LlmError;
use tokio_util::sync::CancellationToken;

use crate::support::{orchestrator, short_request, test_config, Script, ScriptedProvider};

const REVISION: &str = r#"{
  "qualityScore": 0.55,
  "issues": ["Summary names the wrong day"],
  "revisedResults": {
    "summary": "The team agreed to ship the beta on Tuesday.",
    "sections": [
      {"id": "overview", "content": "- Beta launch reviewed\n- Staffing discussed", "evidence": ["00:05"]},
      {"id": "risks", "content": "- Support coverage is thin"}
    ],
    "agendaItems": [{"id": "a1", "title": "Beta launch plan", "timestamp": "00:00"}],
    "decisions": [{"id": "d1", "description": "Ship the beta launch on Tuesday", "agendaItemId": "a1"}]
  }
}"#;

#[tokio::test]
async fn test_evaluation_without_changes_keeps_results() {
    let provider = ScriptedProvider::new();
    let request = short_request().with_evaluation(true);

    let analysis = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.metadata.evaluation_status, EvaluationStatus::Completed);
    assert!(analysis.draft_results.is_none());
    let report = analysis.evaluation.as_ref().unwrap();
    assert!((report.quality_score - 0.9).abs() < 1e-9);
    assert!(!report.revised);

    // the review is a call but not a plan phase
    assert_eq!(analysis.metadata.total_phases, 1);
    assert_eq!(analysis.metadata.model_calls, 2);
    assert_eq!(analysis.metadata.phases.last().unwrap().id, "evaluation");
}

#[tokio::test]
async fn test_evaluation_revision_replaces_results_and_keeps_draft() {
    let provider = ScriptedProvider::new();
    provider.script("Quality review", Script::Respond(REVISION.into()));
    let request = short_request().with_evaluation(true);

    let analysis = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.metadata.evaluation_status, EvaluationStatus::Revised);
    let draft = analysis.draft_results.as_ref().unwrap();
    assert_ne!(draft, &analysis.results);
    assert_eq!(
        draft.summary.as_deref(),
        Some("The team agreed to ship the beta next week.")
    );
    assert_eq!(
        analysis.results.summary.as_deref(),
        Some("The team agreed to ship the beta on Tuesday.")
    );

    // revisions are merged and linked like any other output
    let decision = &analysis.results.decisions[0];
    assert_eq!(decision.agenda_item_id.as_deref(), Some("a1"));
    let report = analysis.evaluation.as_ref().unwrap();
    assert!(report.revised);
    assert_eq!(report.issues.len(), 1);
}

#[tokio::test]
async fn test_evaluation_prompt_carries_draft_and_template() {
    let provider = ScriptedProvider::new();
    let request = short_request().with_evaluation(true);

    orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    let review = provider
        .calls()
        .into_iter()
        .find(|c| c.title == "Quality review")
        .unwrap();
    assert!(review.prompt.contains("`overview` (Overview)"));
    assert!(review.prompt.contains("Ship the beta launch next week"));
    assert!(!review.prompt.contains("support staffing and the release notes"));
}

#[tokio::test]
async fn test_evaluation_failure_keeps_consolidated_results() {
    let provider = ScriptedProvider::new();
    provider.script(
        "Quality review",
        Script::Fail(LlmError::ContentFiltered {
            message: "blocked".into(),
        }),
    );
    let request = short_request().with_evaluation(true);

    let analysis = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.metadata.evaluation_status, EvaluationStatus::Failed);
    assert!(analysis
        .metadata
        .evaluation_error
        .as_deref()
        .unwrap()
        .contains("blocked"));
    assert!(analysis.evaluation.is_none());
    assert!(analysis.draft_results.is_none());
    assert_eq!(analysis.results.decisions.len(), 1);
    // a failed review does not make the analysis partial
    assert!(!analysis.metadata.is_partial);
}

#[tokio::test]
async fn test_evaluation_follows_config_default() {
    let provider = ScriptedProvider::new();
    let mut config = test_config();
    config.run_evaluation_by_default = true;

    let analysis = orchestrator(&provider, config.clone())
        .analyze(&short_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(analysis.metadata.evaluation_status, EvaluationStatus::Completed);

    let provider = ScriptedProvider::new();
    let analysis = orchestrator(&provider, config)
        .analyze(
            &short_request().with_evaluation(false),
            &ProgressReporter::silent(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        analysis.metadata.evaluation_status,
        EvaluationStatus::NotRequested
    );
    assert_eq!(provider.calls_for("Quality review"), 0);
}

#[tokio::test]
async fn test_cancel_during_evaluation_returns_consolidated_results() {
    let provider = ScriptedProvider::new();
    provider.script("Quality review", Script::Hang);
    let request = short_request().with_evaluation(true);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &cancel)
        .await
        .unwrap_err();

    match err {
        AppError::Cancelled(partial) => {
            assert!(partial.results.is_some());
            assert_eq!(partial.completed_phases(), 1);
        }
        other => panic!("expected Cancelled, got {:?}", other),
    }
}

#[tokio::test]
async fn test_evaluation_auth_failure_aborts_analysis() {
    let provider = ScriptedProvider::new();
    provider.script(
        "Quality review",
        Script::Fail(LlmError::AuthenticationFailed {
            message: "key revoked".into(),
        }),
    );
    let request = short_request().with_evaluation(true);

    let err = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        AppError::Configuration(message) => assert!(message.contains("key revoked")),
        other => panic!("expected Configuration, got {:?}", other),
    }
    assert_eq!(provider.calls_for("Quality review"), 1);
}
