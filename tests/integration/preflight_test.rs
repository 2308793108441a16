//! Pre-flight Integration Tests
//!
//! Validation, configuration and context-size problems surface before any
//! model call is made.

use std::sync::Arc;

use recap_analyzer::{AnalysisOrchestrator, AnalysisRequest, AppError, ProgressReporter};
use recap_core::Transcript;
use recap_llm::{DeploymentProfile, StaticDeploymentCatalog};
use tokio_util::sync::CancellationToken;

use crate::support::{orchestrator, short_request, template, test_config, transcript, ScriptedProvider};

async fn run(
    provider: &Arc<ScriptedProvider>,
    orchestrator: AnalysisOrchestrator,
    request: &AnalysisRequest,
) -> AppError {
    let err = orchestrator
        .analyze(request, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(provider.call_count(), 0, "no model call before pre-flight passes");
    err
}

#[tokio::test]
async fn test_empty_transcript_is_rejected() {
    let provider = ScriptedProvider::new();
    let request = AnalysisRequest::new("t-1", "tpl-1", Transcript::default(), template());
    let err = run(&provider, orchestrator(&provider, test_config()), &request).await;
    assert!(matches!(err, AppError::Validation(_)));
    assert!(err.is_preflight());
}

#[tokio::test]
async fn test_template_without_sections_is_rejected() {
    let provider = ScriptedProvider::new();
    let mut request = short_request();
    request.template.sections.clear();
    let err = run(&provider, orchestrator(&provider, test_config()), &request).await;
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("no sections")));
}

#[tokio::test]
async fn test_out_of_order_segments_are_rejected() {
    let provider = ScriptedProvider::new();
    let mut request = short_request();
    request.transcript.segments.swap(0, 1);
    let err = run(&provider, orchestrator(&provider, test_config()), &request).await;
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_missing_transcript_id_is_rejected() {
    let provider = ScriptedProvider::new();
    let mut request = short_request();
    request.transcript_id = "  ".into();
    let err = run(&provider, orchestrator(&provider, test_config()), &request).await;
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("transcriptId")));
}

#[tokio::test]
async fn test_invalid_config_is_configuration_error() {
    let provider = ScriptedProvider::new();
    let mut config = test_config();
    config.max_concurrency = 0;
    let err = run(&provider, orchestrator(&provider, config), &short_request()).await;
    assert!(matches!(err, AppError::Configuration(_)));
}

#[tokio::test]
async fn test_empty_catalog_is_configuration_error() {
    let provider = ScriptedProvider::new();
    let orchestrator = AnalysisOrchestrator::new(
        provider.clone(),
        Arc::new(StaticDeploymentCatalog::new(Vec::new())),
        test_config(),
    );
    let err = run(&provider, orchestrator, &short_request()).await;
    assert!(matches!(err, AppError::Configuration(_)));
}

#[tokio::test]
async fn test_failed_health_check_is_configuration_error() {
    let provider = ScriptedProvider::new();
    provider.set_healthy(false);
    let err = run(&provider, orchestrator(&provider, test_config()), &short_request()).await;
    match err {
        AppError::Configuration(msg) => assert!(msg.contains("health check")),
        other => panic!("expected Configuration, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_check_can_be_disabled() {
    let provider = ScriptedProvider::new();
    provider.set_healthy(false);
    let mut config = test_config();
    config.preflight_health_check = false;

    let analysis = orchestrator(&provider, config)
        .analyze(&short_request(), &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(analysis.metadata.model_calls, 1);
}

#[tokio::test]
async fn test_oversized_transcript_is_context_too_large() {
    let provider = ScriptedProvider::new();
    let catalog = StaticDeploymentCatalog::new(vec![DeploymentProfile::new("small", 1_000, false)]);
    let orchestrator = AnalysisOrchestrator::new(provider.clone(), Arc::new(catalog), test_config());

    let err = run(&provider, orchestrator, &short_request()).await;
    match err {
        AppError::ContextTooLarge {
            estimated_tokens,
            largest_limit,
        } => {
            assert_eq!(largest_limit, 1_000);
            assert!(estimated_tokens > 800);
        }
        other => panic!("expected ContextTooLarge, got {:?}", other),
    }
}

#[tokio::test]
async fn test_supplemental_material_counts_toward_routing() {
    let provider = ScriptedProvider::new();
    // 200 tokens of transcript fits a 1000-token deployment on its own
    let request = AnalysisRequest::new("t-1", "tpl-1", transcript(2, 400), template());
    let catalog = vec![DeploymentProfile::new("small", 1_000, false)];

    let fits = AnalysisOrchestrator::new(
        provider.clone(),
        Arc::new(StaticDeploymentCatalog::new(catalog.clone())),
        test_config(),
    )
    .analyze(&request, &ProgressReporter::silent(), &CancellationToken::new())
    .await;
    assert!(fits.is_ok());

    let provider = ScriptedProvider::new();
    let request = request.with_supplemental_material("x".repeat(4_000));
    let err = run(
        &provider,
        AnalysisOrchestrator::new(
            provider.clone(),
            Arc::new(StaticDeploymentCatalog::new(catalog)),
            test_config(),
        ),
        &request,
    )
    .await;
    assert!(matches!(err, AppError::ContextTooLarge { .. }));
}
