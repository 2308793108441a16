//! Orchestrator Integration Tests
//!
//! End-to-end runs against a scripted provider: strategy selection and call
//! counts, deployment routing, retries, partial failure and consolidation
//! failure.

use recap_analyzer::models::{ExecutionStrategy, PhaseState};
use recap_analyzer::{AnalysisStrategy, AppError, ProgressReporter};
use recap_llm::{LlmError, ModelErrorKind};
use tokio_util::sync::CancellationToken;

use crate::support::{
    long_request, medium_request, orchestrator, short_request, test_config, transcript, Script,
    ScriptedProvider,
};

fn server_error() -> LlmError {
    LlmError::ServerError {
        message: "upstream overloaded".into(),
        status: Some(502),
    }
}

fn invalid_request() -> LlmError {
    LlmError::InvalidRequest {
        message: "unsupported parameter".into(),
    }
}

// ============================================================================
// Strategy selection and call counts
// ============================================================================

#[tokio::test]
async fn test_auto_short_transcript_runs_basic_with_one_call() {
    let provider = ScriptedProvider::new();
    let analysis = orchestrator(&provider, test_config())
        .analyze(&short_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.analysis_strategy, ExecutionStrategy::Basic);
    assert!(analysis.metadata.was_auto_selected);
    assert_eq!(analysis.metadata.total_phases, 1);
    assert_eq!(analysis.metadata.model_calls, 1);
    assert_eq!(provider.calls_for("Complete analysis"), 1);
    assert!(!analysis.metadata.is_partial);
}

#[tokio::test]
async fn test_auto_medium_transcript_runs_hybrid_with_three_calls() {
    let provider = ScriptedProvider::new();
    let analysis = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.analysis_strategy, ExecutionStrategy::Hybrid);
    assert_eq!(analysis.metadata.model_calls, 3);
    assert_eq!(provider.calls_for("Section extraction"), 1);
    assert_eq!(provider.calls_for("Entity extraction"), 1);
    assert_eq!(provider.calls_for("Consolidation"), 1);

    // consolidation is last and sees both extraction results
    let calls = provider.calls();
    let last = calls.last().unwrap();
    assert_eq!(last.title, "Consolidation");
    assert!(last.prompt.contains("## Partial results"));
    assert!(last.prompt.contains("Section extraction"));
    assert!(last.prompt.contains("Entity extraction"));
}

#[tokio::test]
async fn test_auto_long_transcript_runs_advanced_cascade() {
    let provider = ScriptedProvider::new();
    let analysis = orchestrator(&provider, test_config())
        .analyze(&long_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.analysis_strategy, ExecutionStrategy::Advanced);
    assert_eq!(analysis.metadata.total_phases, 9);
    assert_eq!(analysis.metadata.model_calls, 9);
    assert_eq!(analysis.metadata.deployment.deployment_id, "standard");

    // passes run in order and each later pass carries the digest
    let calls = provider.calls();
    for (k, call) in calls.iter().take(8).enumerate() {
        assert_eq!(call.title, format!("Cascade pass {}/8", k + 1));
        assert_eq!(call.prompt.contains("## Earlier passes"), k > 0);
    }
    assert_eq!(calls[8].title, "Consolidation");
}

#[tokio::test]
async fn test_nine_pass_cascade_makes_ten_calls() {
    let provider = ScriptedProvider::new();
    let mut config = test_config();
    config.advanced_cascade_passes = 9;
    let request = short_request().with_strategy(AnalysisStrategy::Advanced);

    let analysis = orchestrator(&provider, config)
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!analysis.metadata.was_auto_selected);
    assert_eq!(analysis.metadata.model_calls, 10);
    assert_eq!(provider.call_count(), 10);
}

#[tokio::test]
async fn test_explicit_strategy_overrides_size() {
    let provider = ScriptedProvider::new();
    let request = long_request().with_strategy(AnalysisStrategy::Basic);

    let analysis = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.analysis_strategy, ExecutionStrategy::Basic);
    assert!(!analysis.metadata.was_auto_selected);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_independent_passes_respect_concurrency_cap() {
    let provider = ScriptedProvider::with_delay(std::time::Duration::from_millis(20));
    let mut config = test_config();
    config.cascade_digest = false;
    config.max_concurrency = 3;
    let request = short_request().with_strategy(AnalysisStrategy::Advanced);

    let analysis = orchestrator(&provider, config)
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(analysis.metadata.model_calls, 9);
    assert!(provider.peak_concurrency() <= 3);
    assert!(provider.peak_concurrency() >= 2);
}

// ============================================================================
// Results
// ============================================================================

#[tokio::test]
async fn test_results_are_merged_and_linked() {
    let provider = ScriptedProvider::new();
    let analysis = orchestrator(&provider, test_config())
        .analyze(&short_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();
    let results = &analysis.results;

    let section_ids: Vec<&str> = results.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(section_ids, vec!["overview", "risks"]);
    assert!(results.sections.iter().all(|s| !s.placeholder));
    assert!(results.summary.is_some());

    assert_eq!(results.agenda_items.len(), 1);
    let agenda_id = results.agenda_items[0].id.clone();
    assert_eq!(results.decisions[0].agenda_item_id.as_deref(), Some(agenda_id.as_str()));
    let decision_id = results.decisions[0].id.clone();
    assert_eq!(
        results.action_items[0].decision_id.as_deref(),
        Some(decision_id.as_str())
    );
    assert_eq!(results.action_items[0].owner.as_deref(), Some("Dana"));

    let citation = results.decisions[0].citation.as_ref().unwrap();
    assert!(citation.verified);
    assert_eq!(citation.segment_index, Some(2));
}

#[tokio::test]
async fn test_progress_reaches_total() {
    let provider = ScriptedProvider::new();
    let (progress, mut events) = ProgressReporter::channel();

    orchestrator(&provider, test_config())
        .analyze(&medium_request(), &progress, &CancellationToken::new())
        .await
        .unwrap();
    drop(progress);

    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }
    assert!(!received.is_empty());
    assert!(received.iter().all(|e| e.total_units == 3));
    assert!(received
        .windows(2)
        .all(|pair| pair[0].completed_units <= pair[1].completed_units));
    let last = received.last().unwrap();
    assert_eq!(last.completed_units, 3);
    assert_eq!(last.kind, recap_analyzer::ProgressEventKind::Finished);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_large_context_routes_to_extended_deployment() {
    let provider = ScriptedProvider::new();
    let request = recap_analyzer::AnalysisRequest::new(
        "t-huge",
        "tpl-1",
        transcript(300, 2_000),
        crate::support::template(),
    );

    let analysis = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    let deployment = &analysis.metadata.deployment;
    assert_eq!(deployment.deployment_id, "extended");
    assert!(deployment.is_extended_context);
    assert!(deployment.estimated_tokens <= deployment.token_limit);
    assert!(provider.calls().iter().all(|c| c.deployment_id == "extended"));
}

// ============================================================================
// Retries and failures
// ============================================================================

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let provider = ScriptedProvider::new();
    provider.script("Entity extraction", Script::FailFirst(2, server_error()));

    let analysis = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!analysis.metadata.is_partial);
    assert_eq!(analysis.metadata.model_calls, 5);
    let entities = analysis
        .metadata
        .phases
        .iter()
        .find(|p| p.id == "entities")
        .unwrap();
    assert_eq!(entities.state, PhaseState::Succeeded);
    assert_eq!(entities.attempts.len(), 3);
}

#[tokio::test]
async fn test_failed_extraction_yields_partial_analysis() {
    let provider = ScriptedProvider::new();
    provider.script("Entity extraction", Script::Fail(invalid_request()));

    let analysis = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(analysis.metadata.is_partial);
    assert_eq!(analysis.metadata.failed_phases, vec!["entities".to_string()]);
    // fatal errors are not retried
    assert_eq!(provider.calls_for("Entity extraction"), 1);
    assert_eq!(analysis.metadata.model_calls, 3);

    let consolidation = provider.calls().into_iter().last().unwrap();
    assert!(consolidation.prompt.contains("(phase failed; no output)"));
}

#[tokio::test]
async fn test_exhausted_retries_mark_phase_failed() {
    let provider = ScriptedProvider::new();
    provider.script("Section extraction", Script::Fail(server_error()));

    let analysis = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.calls_for("Section extraction"), 3);
    let sections = analysis
        .metadata
        .phases
        .iter()
        .find(|p| p.id == "sections")
        .unwrap();
    assert_eq!(sections.state, PhaseState::FailedFatal);
    assert_eq!(
        sections.error.as_ref().map(|e| e.kind),
        Some(ModelErrorKind::Transient)
    );
    assert!(analysis.metadata.is_partial);
}

#[tokio::test]
async fn test_consolidation_failure_produces_no_analysis() {
    let provider = ScriptedProvider::new();
    provider.script("Consolidation", Script::Fail(invalid_request()));

    let err = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        AppError::ConsolidationFailed { phase_id, error } => {
            assert_eq!(phase_id, "consolidation");
            assert_eq!(error.kind, ModelErrorKind::Fatal);
        }
        other => panic!("expected ConsolidationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_basic_failure_is_a_consolidation_failure() {
    let provider = ScriptedProvider::new();
    provider.script("Complete analysis", Script::Fail(invalid_request()));

    let err = orchestrator(&provider, test_config())
        .analyze(&short_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::ConsolidationFailed { ref phase_id, .. } if phase_id == "complete"
    ));
}

#[tokio::test]
async fn test_unparseable_response_is_retried_then_fails() {
    let provider = ScriptedProvider::new();
    provider.script("Complete analysis", Script::Respond("I cannot do that.".into()));

    let err = orchestrator(&provider, test_config())
        .analyze(&short_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(provider.calls_for("Complete analysis"), 3);
    assert!(matches!(err, AppError::ConsolidationFailed { .. }));
}
