//! # Recommendation Engine
//!
//! This module coordinates one recommendation request end to end:
//! 1. Validate the student's prompt
//! 2. Check the local quota (no reservation yet)
//! 3. Snapshot the catalog
//! 4. Build the prompt from that snapshot
//! 5. Reserve a quota slot and invoke the model under a timeout
//! 6. Reconcile the narrative against the same snapshot
//! 7. Return the narrative, matched courses and the quota after the increment
//!
//! Steps 1, 2, 3 and 5 can fail and end the request immediately. Nothing is
//! retried. Once step 5 reserves a slot it is never given back, whatever
//! the model does.
//!
//! The reservation in step 5 is the atomic one; the check in step 2 only
//! exists so an exhausted quota is reported before the catalog is touched.
//! A concurrent request can still take the last slot between the two, in
//! which case step 5 reports `QuotaExceeded` without calling the model.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog::{CatalogStore, Course};
use llm_client::{Completion, CompletionRequest, LanguageModel, LlmError};
use pipeline::{MentionOrderMatcher, PromptBuilder, PromptPair, Reconciler, SubstringMatcher};
use tracing::{debug, error, info, instrument, warn};

use crate::error::RecommendError;
use crate::quota::{QuotaSnapshot, QuotaTracker, Reservation};

/// Fixed model parameters, shared by every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on one model call, enforced here regardless of transport
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Which order matched courses are returned in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileOrder {
    /// Catalog order
    #[default]
    Catalog,
    /// Order of first mention in the narrative
    Mention,
}

impl ReconcileOrder {
    pub fn reconciler(self) -> Arc<dyn Reconciler> {
        match self {
            ReconcileOrder::Catalog => Arc::new(SubstringMatcher),
            ReconcileOrder::Mention => Arc::new(MentionOrderMatcher),
        }
    }
}

impl FromStr for ReconcileOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catalog" => Ok(ReconcileOrder::Catalog),
            "mention" => Ok(ReconcileOrder::Mention),
            other => Err(format!("expected 'catalog' or 'mention', got '{other}'")),
        }
    }
}

impl fmt::Display for ReconcileOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOrder::Catalog => f.write_str("catalog"),
            ReconcileOrder::Mention => f.write_str("mention"),
        }
    }
}

/// A student's free-text goal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationRequest {
    pub prompt: String,
}

impl RecommendationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Outcome of a successful request
#[derive(Debug, Clone)]
pub struct RecommendationResult {
    /// The model's reply, unmodified
    pub narrative: String,
    /// Catalog courses the narrative mentions; no id repeats
    pub matched_courses: Vec<Course>,
    /// Quota right after this request's reservation
    pub quota: QuotaSnapshot,
}

/// Orchestrates quota, prompt, model and reconciliation
#[derive(Clone)]
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    model: Arc<dyn LanguageModel>,
    quota: Arc<QuotaTracker>,
    prompt_builder: PromptBuilder,
    reconciler: Arc<dyn Reconciler>,
    settings: ModelSettings,
}

impl RecommendationEngine {
    /// Create an engine with the default prompt policy, substring
    /// reconciliation and default model settings
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        model: Arc<dyn LanguageModel>,
        quota: Arc<QuotaTracker>,
    ) -> Self {
        Self {
            catalog,
            model,
            quota,
            prompt_builder: PromptBuilder::new(),
            reconciler: Arc::new(SubstringMatcher),
            settings: ModelSettings::default(),
        }
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    pub fn with_reconciler(mut self, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current quota state; no side effects
    pub fn usage(&self) -> QuotaSnapshot {
        self.quota.snapshot()
    }

    /// Main entry point: recommend courses for a student's goal
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len()))]
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResult, RecommendError> {
        let start_time = Instant::now();

        // ValidatingInput
        if request.prompt.trim().is_empty() {
            warn!("Rejected recommendation request with empty prompt");
            return Err(RecommendError::InvalidRequest);
        }

        // CheckingQuota
        if !self.quota.has_capacity() {
            let snapshot = self.quota.snapshot();
            warn!(
                "Recommendation request limit reached: {}/{}",
                snapshot.used, snapshot.limit
            );
            return Err(RecommendError::QuotaExceeded(snapshot));
        }

        let catalog = self.fetch_catalog().await?;

        // BuildingPrompt
        let prompt = self.prompt_builder.build(&catalog, &request.prompt);
        debug!(
            "Built system instruction of {} chars for {} courses",
            prompt.system_instruction.len(),
            catalog.len()
        );

        // InvokingModel
        let quota = match self.quota.try_reserve() {
            Reservation::Granted(snapshot) => snapshot,
            Reservation::Denied(snapshot) => {
                warn!(
                    "Recommendation request limit reached before model call: {}/{}",
                    snapshot.used, snapshot.limit
                );
                return Err(RecommendError::QuotaExceeded(snapshot));
            }
        };
        info!("Recommendation request count: {}/{}", quota.used, quota.limit);

        let completion = self.invoke_model(prompt).await?;

        // Reconciling
        let matched_courses = self.reconciler.reconcile(&completion.narrative, &catalog);
        info!(
            "Reconciled {} courses with {} in {:.2?}",
            matched_courses.len(),
            self.reconciler.name(),
            start_time.elapsed()
        );

        Ok(RecommendationResult {
            narrative: completion.narrative,
            matched_courses,
            quota,
        })
    }

    async fn fetch_catalog(&self) -> Result<Vec<Course>, RecommendError> {
        self.catalog.fetch_all_courses().await.map_err(|e| {
            error!("Failed to fetch course catalog: {}", e);
            RecommendError::StoreUnavailable(e)
        })
    }

    async fn invoke_model(&self, prompt: PromptPair) -> Result<Completion, RecommendError> {
        let request = CompletionRequest {
            system_instruction: prompt.system_instruction,
            user_prompt: prompt.user_prompt,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        match tokio::time::timeout(self.settings.timeout, self.model.complete(request)).await {
            Ok(Ok(completion)) => Ok(completion),
            Ok(Err(e)) => {
                error!("Model {} failed: {}", self.model.name(), e);
                Err(e.into())
            }
            Err(_) => {
                error!(
                    "Model {} did not answer within {:?}",
                    self.model.name(),
                    self.settings.timeout
                );
                Err(RecommendError::Upstream(LlmError::Timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog::{CatalogError, InMemoryCatalog, InstructorRef, Level};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn course(id: &str, title: &str) -> Course {
        Course {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("Learn {title}."),
            content: "Module 1".to_string(),
            level: Level::Beginner,
            category: Some("Web Development".to_string()),
            duration: Some("8 weeks".to_string()),
            instructor: InstructorRef {
                id: "u1".to_string(),
                full_name: "John Doe".to_string(),
            },
        }
    }

    fn build_test_catalog() -> Arc<InMemoryCatalog> {
        Arc::new(
            InMemoryCatalog::from_courses(vec![
                course("web", "Intro to Web Development"),
                course("js", "Advanced JavaScript"),
                course("cloud", "Cloud Services with AWS & Azure"),
            ])
            .unwrap(),
        )
    }

    // ============================================================================
    // Mock collaborators
    // ============================================================================

    /// Replies with a fixed narrative and records what it was asked
    struct StubModel {
        reply: String,
        calls: AtomicUsize,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl StubModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LanguageModel for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            Ok(Completion {
                narrative: self.reply.clone(),
            })
        }
    }

    /// Always fails with the error produced by `make`
    struct FailingModel {
        make: fn() -> LlmError,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.make)())
        }
    }

    /// Never answers in time
    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Completion {
                narrative: "too late".to_string(),
            })
        }
    }

    /// Holds every caller at a barrier before answering, so all of them
    /// pass the quota check before any of them reserves
    struct BarrierCatalog {
        inner: Arc<InMemoryCatalog>,
        barrier: tokio::sync::Barrier,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl CatalogStore for BarrierCatalog {
        async fn fetch_all_courses(&self) -> catalog::Result<Vec<Course>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.barrier.wait().await;
            self.inner.fetch_all_courses().await
        }

        async fn get_course(&self, id: &str) -> catalog::Result<Option<Course>> {
            self.inner.get_course(id).await
        }
    }

    /// Catalog that is always down
    struct UnavailableCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogStore for UnavailableCatalog {
        async fn fetch_all_courses(&self) -> catalog::Result<Vec<Course>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CatalogError::Unavailable("connection refused".to_string()))
        }

        async fn get_course(&self, _id: &str) -> catalog::Result<Option<Course>> {
            Err(CatalogError::Unavailable("connection refused".to_string()))
        }
    }

    fn engine_with(model: Arc<dyn LanguageModel>, limit: u32) -> RecommendationEngine {
        RecommendationEngine::new(build_test_catalog(), model, Arc::new(QuotaTracker::new(limit)))
    }

    // ============================================================================
    // Happy path
    // ============================================================================

    #[tokio::test]
    async fn test_recommend_returns_matched_courses_and_quota() {
        let model = StubModel::new("We recommend Intro to Web Development because it covers HTML.");
        let engine = engine_with(model.clone(), 250);

        let result = engine
            .recommend(&RecommendationRequest::new("I want to build websites"))
            .await
            .expect("recommend failed");

        assert_eq!(result.narrative, "We recommend Intro to Web Development because it covers HTML.");
        let ids: Vec<&str> = result.matched_courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["web"]);
        assert_eq!(
            result.quota,
            QuotaSnapshot {
                used: 1,
                limit: 250,
                remaining: 249
            }
        );
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_receives_catalog_prompt_and_settings() {
        let model = StubModel::new("nothing relevant");
        let settings = ModelSettings {
            max_tokens: 321,
            temperature: 0.2,
            timeout: Duration::from_secs(5),
        };
        let engine = engine_with(model.clone(), 10).with_settings(settings);

        engine
            .recommend(&RecommendationRequest::new("  cloud please  "))
            .await
            .unwrap();

        let request = model.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.user_prompt, "  cloud please  ");
        assert_eq!(request.max_tokens, 321);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert!(request.system_instruction.contains(
            "3. Cloud Services with AWS & Azure - Learn Cloud Services with AWS & Azure. (Level: Beginner, Category: Web Development)"
        ));
        assert!(request.system_instruction.contains("Recommend exactly 3"));
    }

    #[tokio::test]
    async fn test_matches_keep_catalog_order_and_are_not_truncated() {
        let model = StubModel::new(
            "1. Cloud Services with AWS & Azure\n2. Advanced JavaScript\n3. Intro to Web Development",
        );
        let engine = engine_with(model, 10)
            .with_prompt_builder(PromptBuilder::new().with_recommendation_count(1));

        let result = engine
            .recommend(&RecommendationRequest::new("everything"))
            .await
            .unwrap();

        let ids: Vec<&str> = result.matched_courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["web", "js", "cloud"]);
    }

    #[tokio::test]
    async fn test_mention_order_reconciler_can_be_swapped_in() {
        let model = StubModel::new("1. Cloud Services with AWS & Azure\n2. Advanced JavaScript");
        let engine = engine_with(model, 10).with_reconciler(ReconcileOrder::Mention.reconciler());

        let result = engine
            .recommend(&RecommendationRequest::new("ops and js"))
            .await
            .unwrap();

        let ids: Vec<&str> = result.matched_courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cloud", "js"]);
    }

    #[tokio::test]
    async fn test_empty_catalog_still_invokes_model() {
        let model = StubModel::new("Intro to Web Development would be ideal.");
        let engine = RecommendationEngine::new(
            Arc::new(InMemoryCatalog::new()),
            model.clone(),
            Arc::new(QuotaTracker::new(5)),
        );

        let result = engine
            .recommend(&RecommendationRequest::new("web"))
            .await
            .unwrap();

        assert!(result.matched_courses.is_empty());
        assert_eq!(model.calls(), 1);
        assert_eq!(result.quota.used, 1);
        let request = model.last_request.lock().unwrap().clone().unwrap();
        assert!(request.system_instruction.contains("Available Courses:\n\n\nInstructions:"));
    }

    // ============================================================================
    // Validation and quota
    // ============================================================================

    #[tokio::test]
    async fn test_empty_prompt_rejected_without_quota() {
        let model = StubModel::new("unused");
        let engine = engine_with(model.clone(), 5);

        for prompt in ["", "   ", "\n\t"] {
            let err = engine
                .recommend(&RecommendationRequest::new(prompt))
                .await
                .unwrap_err();
            assert!(matches!(err, RecommendError::InvalidRequest), "prompt {prompt:?}");
        }

        assert_eq!(engine.usage().used, 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_quota_scenario_limit_two() {
        let model = StubModel::new("Advanced JavaScript");
        let engine = engine_with(model.clone(), 2);

        let a = engine.recommend(&RecommendationRequest::new("A")).await.unwrap();
        assert_eq!(a.quota.used, 1);

        let b = engine.recommend(&RecommendationRequest::new("B")).await.unwrap();
        assert_eq!(b.quota.used, 2);
        assert_eq!(b.quota.remaining, 0);

        let c = engine.recommend(&RecommendationRequest::new("C")).await.unwrap_err();
        match c {
            RecommendError::QuotaExceeded(snapshot) => {
                assert_eq!(snapshot.used, 2);
                assert_eq!(snapshot.limit, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(engine.usage().used, 2);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_usage_is_monotonic() {
        let model = StubModel::new("nothing");
        let engine = engine_with(model, 5);

        let mut last = engine.usage().used;
        for _ in 0..5 {
            let result = engine
                .recommend(&RecommendationRequest::new("goal"))
                .await
                .unwrap();
            assert_eq!(result.quota.used, last + 1);
            last = result.quota.used;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_race_for_last_slots() {
        const REQUESTS: usize = 20;
        const LIMIT: u32 = 5;

        let store = Arc::new(BarrierCatalog {
            inner: build_test_catalog(),
            barrier: tokio::sync::Barrier::new(REQUESTS),
            fetches: AtomicUsize::new(0),
        });
        let model = StubModel::new("Advanced JavaScript");
        let engine = RecommendationEngine::new(
            store.clone(),
            model.clone(),
            Arc::new(QuotaTracker::new(LIMIT)),
        );

        let handles: Vec<_> = (0..REQUESTS)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .recommend(&RecommendationRequest::new(format!("goal {i}")))
                        .await
                })
            })
            .collect();

        let mut granted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(result) => {
                    assert!(result.quota.used >= 1 && result.quota.used <= LIMIT);
                    granted += 1;
                }
                Err(RecommendError::QuotaExceeded(snapshot)) => {
                    assert_eq!(snapshot.used, LIMIT);
                    rejected += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // Every request passed the early check and fetched the catalog, so
        // all rejections came from the reservation step.
        assert_eq!(store.fetches.load(Ordering::SeqCst), REQUESTS);
        assert_eq!(granted, LIMIT as usize);
        assert_eq!(rejected, REQUESTS - LIMIT as usize);
        assert_eq!(engine.usage().used, LIMIT);
        assert_eq!(model.calls(), LIMIT as usize);
    }

    // ============================================================================
    // Failure paths
    // ============================================================================

    #[tokio::test]
    async fn test_store_unavailable_consumes_no_quota() {
        let store = Arc::new(UnavailableCatalog {
            calls: AtomicUsize::new(0),
        });
        let model = StubModel::new("unused");
        let engine =
            RecommendationEngine::new(store.clone(), model.clone(), Arc::new(QuotaTracker::new(5)));

        let err = engine
            .recommend(&RecommendationRequest::new("web"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::StoreUnavailable(_)));
        assert_eq!(engine.usage().used, 0);
        assert_eq!(model.calls(), 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_quota_reported_before_store_is_touched() {
        let store = Arc::new(UnavailableCatalog {
            calls: AtomicUsize::new(0),
        });
        let engine = RecommendationEngine::new(
            store.clone(),
            StubModel::new("unused"),
            Arc::new(QuotaTracker::new(0)),
        );

        let err = engine
            .recommend(&RecommendationRequest::new("web"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::QuotaExceeded(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_quota_error_keeps_slot() {
        let model = Arc::new(FailingModel {
            make: || LlmError::QuotaExceeded("insufficient_quota".to_string()),
            calls: AtomicUsize::new(0),
        });
        let engine = engine_with(model.clone(), 5);

        let err = engine
            .recommend(&RecommendationRequest::new("web"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::UpstreamQuotaExceeded(_)));
        assert_eq!(engine.usage().used, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_slot_and_is_not_retried() {
        let model = Arc::new(FailingModel {
            make: || LlmError::Api {
                status: 500,
                message: "boom".to_string(),
            },
            calls: AtomicUsize::new(0),
        });
        let engine = engine_with(model.clone(), 5);

        let err = engine
            .recommend(&RecommendationRequest::new("web"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::Upstream(LlmError::Api { status: 500, .. })));
        assert_eq!(engine.usage().used, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_timeout_is_upstream_error_and_keeps_slot() {
        let engine = engine_with(Arc::new(SlowModel), 5).with_settings(ModelSettings {
            timeout: Duration::from_millis(50),
            ..ModelSettings::default()
        });

        let err = engine
            .recommend(&RecommendationRequest::new("web"))
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::Upstream(LlmError::Timeout)));
        assert_eq!(engine.usage().used, 1);
    }

    #[test]
    fn test_reconcile_order_parsing() {
        assert_eq!("catalog".parse::<ReconcileOrder>(), Ok(ReconcileOrder::Catalog));
        assert_eq!(" Mention ".parse::<ReconcileOrder>(), Ok(ReconcileOrder::Mention));
        assert!("ranked".parse::<ReconcileOrder>().is_err());
        assert_eq!(ReconcileOrder::Mention.to_string(), "mention");
    }
}
