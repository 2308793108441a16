//! Cancellation Integration Tests
//!
//! Firing the token stops in-flight calls, keeps completed phase outputs, and
//! leaves no phase in flight.

use std::time::Duration;

use recap_analyzer::models::PhaseState;
use recap_analyzer::{AnalysisStrategy, AppError, ProgressEventKind, ProgressReporter};
use tokio_util::sync::CancellationToken;

use crate::support::{medium_request, orchestrator, short_request, test_config, Script, ScriptedProvider};

fn cancel_after(ms: u64) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test]
async fn test_cancel_keeps_completed_outputs() {
    let provider = ScriptedProvider::new();
    provider.script("Entity extraction", Script::Hang);
    let cancel = cancel_after(100);

    let err = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &cancel)
        .await
        .unwrap_err();

    let AppError::Cancelled(partial) = err else {
        panic!("expected Cancelled");
    };
    assert!(partial.results.is_none());
    let completed: Vec<&str> = partial
        .completed_outputs
        .iter()
        .map(|o| o.phase_id.as_str())
        .collect();
    assert_eq!(completed, vec!["sections"]);

    let state = |id: &str| partial.phases.iter().find(|p| p.id == id).unwrap().state;
    assert_eq!(state("sections"), PhaseState::Succeeded);
    assert_eq!(state("entities"), PhaseState::Cancelled);
    assert_eq!(state("consolidation"), PhaseState::Cancelled);
    assert!(partial.phases.iter().all(|p| p.state.is_terminal()));
    assert_eq!(provider.calls_for("Consolidation"), 0);
}

#[tokio::test]
async fn test_cancel_mid_cascade_stops_later_passes() {
    let provider = ScriptedProvider::new();
    provider.script("Cascade pass 3/8", Script::Hang);
    let cancel = cancel_after(100);
    let request = short_request().with_strategy(AnalysisStrategy::Advanced);

    let err = orchestrator(&provider, test_config())
        .analyze(&request, &ProgressReporter::silent(), &cancel)
        .await
        .unwrap_err();

    let AppError::Cancelled(partial) = err else {
        panic!("expected Cancelled");
    };
    assert_eq!(partial.completed_phases(), 2);
    assert_eq!(provider.call_count(), 3);
    assert!(partial.phases.iter().all(|p| p.state != PhaseState::InFlight));
}

#[tokio::test]
async fn test_cancelled_before_start_makes_no_calls() {
    let provider = ScriptedProvider::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (progress, mut events) = ProgressReporter::channel();

    let err = orchestrator(&provider, test_config())
        .analyze(&short_request(), &progress, &cancel)
        .await
        .unwrap_err();
    drop(progress);

    assert!(matches!(err, AppError::Cancelled(_)));
    assert_eq!(provider.call_count(), 0);

    let mut last = None;
    while let Some(event) = events.recv().await {
        last = Some(event.kind);
    }
    assert_eq!(last, Some(ProgressEventKind::Cancelled));
}

#[tokio::test]
async fn test_cancelled_partial_serializes() {
    let provider = ScriptedProvider::new();
    provider.script("Entity extraction", Script::Hang);
    let cancel = cancel_after(50);

    let err = orchestrator(&provider, test_config())
        .analyze(&medium_request(), &ProgressReporter::silent(), &cancel)
        .await
        .unwrap_err();
    let AppError::Cancelled(partial) = err else {
        panic!("expected Cancelled");
    };

    let json = serde_json::to_value(&*partial).unwrap();
    assert_eq!(json["status"], "cancelled");
    assert_eq!(json["analysisStrategy"], "hybrid");
    assert_eq!(json["completedOutputs"][0]["phaseId"], "sections");
}
