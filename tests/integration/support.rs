//! Shared fixtures: a scripted provider, transcripts of a chosen size, and a
//! test configuration with millisecond backoff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use recap_analyzer::models::AnalyzerConfig;
use recap_analyzer::{AnalysisOrchestrator, AnalysisRequest};
use recap_core::{
    AnalysisTemplate, OutputFormat, OutputKind, TemplateSection, Transcript, TranscriptSegment,
};
use recap_llm::{LlmError, LlmProvider, LlmResult, SchemaHint, StaticDeploymentCatalog};

// ============================================================================
// Scripted provider
// ============================================================================

/// How the provider answers prompts for one phase title.
#[derive(Clone)]
pub enum Script {
    Respond(String),
    /// Fails every attempt
    Fail(LlmError),
    /// Fails the first `n` attempts, then answers with the default
    FailFirst(u32, LlmError),
    /// Never answers
    Hang,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub title: String,
    pub deployment_id: String,
    pub prompt: String,
}

/// Answers by phase title (the prompt's first line) and records every call.
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, Script>>,
    attempts: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<Call>>,
    delay: Duration,
    healthy: AtomicBool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay,
            healthy: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn script(&self, title: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(title.to_string(), script);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, title: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.title == title)
            .count()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn invoke(
        &self,
        deployment_id: &str,
        prompt: &str,
        _schema_hint: Option<&SchemaHint>,
    ) -> LlmResult<String> {
        let title = prompt
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("# ")
            .to_string();
        self.calls.lock().unwrap().push(Call {
            title: title.clone(),
            deployment_id: deployment_id.to_string(),
            prompt: prompt.to_string(),
        });
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(title.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let script = self.scripts.lock().unwrap().get(&title).cloned();
        match script {
            Some(Script::Respond(text)) => Ok(text),
            Some(Script::Fail(err)) => Err(err),
            Some(Script::FailFirst(n, err)) if attempt <= n => Err(err),
            Some(Script::Hang) => std::future::pending::<LlmResult<String>>().await,
            _ => Ok(default_response(&title)),
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LlmError::AuthenticationFailed {
                message: "invalid api key".into(),
            })
        }
    }
}

/// Full report for final phases, a review for evaluation, a one-line summary otherwise.
pub fn default_response(title: &str) -> String {
    match title {
        "Complete analysis" | "Consolidation" => CONSOLIDATED.to_string(),
        "Quality review" => r#"{"qualityScore": 0.9, "issues": []}"#.to_string(),
        other => serde_json::json!({ "summary": other }).to_string(),
    }
}

pub const CONSOLIDATED: &str = r#"```json
{
  "summary": "The team agreed to ship the beta next week.",
  "sections": [
    {"id": "overview", "content": ["Beta launch reviewed", "Staffing discussed"], "evidence": ["00:05"]},
    {"id": "risks", "content": "- Support coverage is thin"}
  ],
  "agendaItems": [
    {"id": "a1", "title": "Beta launch plan", "timestamp": "00:00"}
  ],
  "decisions": [
    {"id": "d1", "description": "Ship the beta launch next week", "agendaItemId": "a1", "timestamp": "00:12"}
  ],
  "actionItems": [
    {"description": "Prepare beta release notes", "owner": "Dana", "decisionId": "d1"}
  ],
  "quotes": [
    {"text": "Let's ship it", "speaker": "Alex", "timestamp": "00:10"}
  ]
}
```"#;

// ============================================================================
// Fixtures
// ============================================================================

const LINE: &str = "We walked through the beta launch plan, support staffing and the release notes. ";

/// `count` five-second segments of `chars` characters each.
pub fn transcript(count: usize, chars: usize) -> Transcript {
    let text: String = LINE.chars().cycle().take(chars).collect();
    let segments: Vec<TranscriptSegment> = (0..count)
        .map(|i| TranscriptSegment {
            index: i as u32,
            start: i as f64 * 5.0,
            end: i as f64 * 5.0 + 5.0,
            text: text.clone(),
            speaker: Some(if i % 2 == 0 { "Alex" } else { "Dana" }.to_string()),
        })
        .collect();
    Transcript {
        text: segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        segments,
    }
}

pub fn template() -> AnalysisTemplate {
    AnalysisTemplate {
        sections: vec![
            TemplateSection {
                id: "overview".into(),
                name: "Overview".into(),
                prompt: "Summarize what was discussed".into(),
                extract_evidence: true,
                output_format: OutputFormat::BulletPoints,
            },
            TemplateSection {
                id: "risks".into(),
                name: "Risks".into(),
                prompt: "List the risks raised".into(),
                extract_evidence: false,
                output_format: OutputFormat::BulletPoints,
            },
        ],
        outputs: vec![
            OutputKind::Summary,
            OutputKind::Decisions,
            OutputKind::ActionItems,
            OutputKind::Quotes,
        ],
    }
}

/// About 2k tokens: auto selects basic.
pub fn short_request() -> AnalysisRequest {
    AnalysisRequest::new("t-short", "tpl-1", transcript(20, 400), template())
}

/// About 10k tokens: auto selects hybrid.
pub fn medium_request() -> AnalysisRequest {
    AnalysisRequest::new("t-medium", "tpl-1", transcript(100, 400), template())
}

/// About 75k tokens: auto selects advanced, still fits the standard deployment.
pub fn long_request() -> AnalysisRequest {
    AnalysisRequest::new("t-long", "tpl-1", transcript(150, 2_000), template())
}

/// Millisecond backoff, evaluation off unless a test asks for it.
pub fn test_config() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 2;
    config.retry.jitter = 0.0;
    config.call_timeout_secs = 5;
    config.run_evaluation_by_default = false;
    config
}

pub fn orchestrator(provider: &Arc<ScriptedProvider>, config: AnalyzerConfig) -> AnalysisOrchestrator {
    let catalog = Arc::new(StaticDeploymentCatalog::new(config.deployments.clone()));
    AnalysisOrchestrator::new(provider.clone(), catalog, config)
}
