// The per-item processor and batch orchestrator.
//
// The core defines WHAT it needs from the outside world as ports (async
// traits) and works purely against them - no reqwest, no file paths. The
// infra layer supplies the real HTTP/API implementations, and tests supply
// mocks.
//
// Failure policy: nothing an individual item does can abort the batch. The
// only fatal condition is an entirely empty input collection, rejected before
// any processing begins.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::report_models::{
    FailureRecord, Findings, ItemOutcome, ItemResult, RenderedReport, ReportRequest, Stage,
    SuccessPayload, TrackerRecord, UploadReceipt,
};
use super::summary::{summarize, BatchSummary};

/// Errors coming back over a port. Collaborators are opaque, so their errors
/// are too - the pipeline only attributes them to a stage and moves on.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// PORTS
// ============================================================================

/// Fetches the remote content an item points at.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, CollaboratorError>;
}

/// Turns fetched content into structured findings.
#[async_trait]
pub trait ReportAnalyzer: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<Findings, CollaboratorError>;
}

/// Renders a document artifact from the findings.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(
        &self,
        request: &ReportRequest,
        findings: &Findings,
    ) -> Result<Vec<u8>, CollaboratorError>;
}

/// Uploads a rendered artifact to shared external storage.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    async fn upload(
        &self,
        artifact: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReceipt, CollaboratorError>;
}

/// Appends one outcome row to the shared external tracker.
/// Implementations must preserve row order as submitted.
#[async_trait]
pub trait OutcomeTracker: Send + Sync {
    async fn append(&self, record: TrackerRecord) -> Result<(), CollaboratorError>;
}

/// Hands out case numbers for report artifacts. Sequential in practice, so
/// it is only ever called from the sequential phase of the batch.
pub trait CaseNumberAllocator: Send + Sync {
    fn allocate(&self, client_name: &str) -> Result<String, CollaboratorError>;
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Upper bound on items in Stage A (fetch/analyze/render) at once.
    pub max_concurrent: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_concurrent: 10 }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no input rows provided")]
    EmptyBatch,
}

/// The batch orchestrator. Collaborators are trait objects so one pipeline
/// can be cloned into concurrently running item tasks.
#[derive(Clone)]
pub struct ReportPipeline {
    source: Arc<dyn ReportSource>,
    analyzer: Arc<dyn ReportAnalyzer>,
    renderer: Arc<dyn ArtifactRenderer>,
    storage: Arc<dyn ArtifactStorage>,
    tracker: Arc<dyn OutcomeTracker>,
    case_numbers: Arc<dyn CaseNumberAllocator>,
    config: PipelineConfig,
}

/// Per-item state between Stage A and the sequential phases.
enum PendingItem {
    /// Row failed validation; it never entered Stage A.
    Invalid(FailureRecord),
    /// Row entered Stage A; the handle resolves to its result.
    Running(
        ReportRequest,
        tokio::task::JoinHandle<Result<RenderedReport, FailureRecord>>,
    ),
}

impl ReportPipeline {
    pub fn new(
        source: Arc<dyn ReportSource>,
        analyzer: Arc<dyn ReportAnalyzer>,
        renderer: Arc<dyn ArtifactRenderer>,
        storage: Arc<dyn ArtifactStorage>,
        tracker: Arc<dyn OutcomeTracker>,
        case_numbers: Arc<dyn CaseNumberAllocator>,
    ) -> Self {
        Self {
            source,
            analyzer,
            renderer,
            storage,
            tracker,
            case_numbers,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Stage A for one item: fetch -> analyze -> render, fixed order, each
    /// stage only runs if the prior one succeeded. The first failure is
    /// terminal for this item and attributed to its stage.
    pub async fn process(&self, request: &ReportRequest) -> Result<RenderedReport, FailureRecord> {
        let content = self
            .source
            .fetch(&request.url)
            .await
            .map_err(|e| self.stage_failure(request, Stage::Fetch, e))?;

        let findings = self
            .analyzer
            .analyze(&content)
            .await
            .map_err(|e| self.stage_failure(request, Stage::Analyze, e))?;

        let artifact = self
            .renderer
            .render(request, &findings)
            .await
            .map_err(|e| self.stage_failure(request, Stage::Render, e))?;

        Ok(RenderedReport { findings, artifact })
    }

    /// Run the whole batch. Every input row yields exactly one outcome and
    /// exactly one tracker append attempt, in original input order.
    pub async fn run_batch(&self, rows: Vec<Value>) -> Result<BatchSummary, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        info!(total = rows.len(), "starting report batch");

        // Stage A: validation, then bounded-concurrency processing. Items are
        // independent here - nothing shared is written - so ordering between
        // them does not matter. Results are collected back in input order.
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut pending = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            match ReportRequest::from_row(row) {
                Ok(request) => {
                    let pipeline = self.clone();
                    let task_request = request.clone();
                    let permits = Arc::clone(&semaphore);
                    let handle = tokio::spawn(async move {
                        // The semaphore lives as long as the batch, so the
                        // acquire only fails if it were closed - which it
                        // never is.
                        let _permit = permits.acquire_owned().await;
                        pipeline.process(&task_request).await
                    });
                    pending.push(PendingItem::Running(request, handle));
                }
                Err(message) => {
                    let failure = row_failure(row, index, message);
                    warn!(identity = %failure.identity, "rejecting input row: {}", failure.message);
                    pending.push(PendingItem::Invalid(failure));
                }
            }
        }

        // Stages B and C: strictly sequential, in input order. The storage
        // and tracker are shared external resources; interleaved writes there
        // risk duplicate rows and rate-limit trips, so no concurrency here.
        let mut outcomes = Vec::with_capacity(pending.len());
        for item in pending {
            let outcome = match item {
                PendingItem::Invalid(failure) => self.settle_failure(failure).await,
                PendingItem::Running(request, handle) => {
                    let stage_a = match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(FailureRecord {
                            identity: request.identity().to_string(),
                            url: request.url.clone(),
                            stage: Stage::Fetch,
                            message: format!("worker task failed: {e}"),
                        }),
                    };
                    match stage_a {
                        Ok(rendered) => self.settle_success(&request, rendered).await,
                        Err(failure) => self.settle_failure(failure).await,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let summary = summarize(&outcomes);
        info!("{}", summary.summary_line());
        Ok(summary)
    }

    /// Stage B + C for an item that survived Stage A. An upload or tracker
    /// failure here is logged and reflected in the counts, but does not flip
    /// the item to failed and never blocks the items behind it.
    async fn settle_success(&self, request: &ReportRequest, rendered: RenderedReport) -> ItemOutcome {
        let case_number = match self.case_numbers.allocate(&request.client_name) {
            Ok(number) => Some(number),
            Err(e) => {
                warn!(identity = %request.identity(), "case number allocation failed: {e}");
                None
            }
        };

        let filename = match &case_number {
            Some(number) => format!("{number}.html"),
            None => format!("{}.html", request.identity()),
        };

        let (uploaded, artifact_link, file_id, upload_error) =
            match self.storage.upload(rendered.artifact, &filename).await {
                Ok(receipt) => (true, Some(receipt.link), Some(receipt.file_id), None),
                Err(e) => {
                    warn!(identity = %request.identity(), "upload failed: {e}");
                    (false, None, None, Some(format!("upload failed: {e}")))
                }
            };

        let findings = rendered.findings;
        let payload = SuccessPayload {
            case_number: case_number.clone(),
            total_points: findings.total_points,
            risk: findings.risk,
            flagged_count: findings.flagged_count(),
            artifact_link: artifact_link.clone(),
            file_id: file_id.clone(),
        };

        let recorded = self
            .track(TrackerRecord {
                client_name: request.client_name.clone(),
                url: request.url.clone(),
                success: true,
                total_points: Some(findings.total_points),
                risk: Some(findings.risk),
                flagged_count: Some(findings.flagged_count()),
                artifact_link,
                file_id,
                case_number,
                error: upload_error,
            })
            .await;

        ItemOutcome {
            identity: request.identity().to_string(),
            url: request.url.clone(),
            result: ItemResult::Success(payload),
            uploaded,
            recorded,
        }
    }

    /// Failed items skip the upload but still get their tracker row, so the
    /// final report accounts for every input item.
    async fn settle_failure(&self, failure: FailureRecord) -> ItemOutcome {
        let recorded = self
            .track(TrackerRecord {
                client_name: failure.identity.clone(),
                url: failure.url.clone(),
                success: false,
                total_points: None,
                risk: None,
                flagged_count: None,
                artifact_link: None,
                file_id: None,
                case_number: None,
                error: Some(failure.error_text()),
            })
            .await;

        ItemOutcome {
            identity: failure.identity.clone(),
            url: failure.url.clone(),
            result: ItemResult::Failure(failure),
            uploaded: false,
            recorded,
        }
    }

    async fn track(&self, record: TrackerRecord) -> bool {
        let identity = record.client_name.clone();
        match self.tracker.append(record).await {
            Ok(()) => true,
            Err(e) => {
                error!(identity = %identity, "tracker append failed: {e}");
                false
            }
        }
    }

    fn stage_failure(
        &self,
        request: &ReportRequest,
        stage: Stage,
        error: CollaboratorError,
    ) -> FailureRecord {
        warn!(identity = %request.identity(), %stage, "stage failed: {error}");
        FailureRecord {
            identity: request.identity().to_string(),
            url: request.url.clone(),
            stage,
            message: error.to_string(),
        }
    }
}

/// Build a validation failure for a row that never became a request.
fn row_failure(row: &Value, index: usize, message: String) -> FailureRecord {
    let identity = ["name", "client_name", "client"]
        .iter()
        .find_map(|key| row.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("row {}", index + 1));

    FailureRecord {
        identity,
        url: String::new(),
        stage: Stage::Validate,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reports::report_models::{IndicatorResult, RiskLevel};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // Mock collaborators, one per port.

    struct StubSource {
        fail_urls: HashSet<String>,
    }

    #[async_trait]
    impl ReportSource for StubSource {
        async fn fetch(&self, url: &str) -> Result<String, CollaboratorError> {
            if self.fail_urls.contains(url) {
                Err("HTTP 503".into())
            } else {
                Ok(format!("content of {url}"))
            }
        }
    }

    struct StubAnalyzer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ReportAnalyzer for StubAnalyzer {
        async fn analyze(&self, _content: &str) -> Result<Findings, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("no indicators present".into());
            }
            Ok(Findings {
                indicators: vec![IndicatorResult {
                    name: "active_ccj".into(),
                    flagged: true,
                    points: 40,
                }],
                total_points: 40,
                risk: RiskLevel::Amber,
            })
        }
    }

    struct StubRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactRenderer for StubRenderer {
        async fn render(
            &self,
            _request: &ReportRequest,
            _findings: &Findings,
        ) -> Result<Vec<u8>, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"<html/>".to_vec())
        }
    }

    struct RecordingStorage {
        fail: bool,
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ArtifactStorage for RecordingStorage {
        async fn upload(
            &self,
            _artifact: Vec<u8>,
            filename: &str,
        ) -> Result<UploadReceipt, CollaboratorError> {
            if self.fail {
                return Err("quota exceeded".into());
            }
            self.uploads.lock().unwrap().push(filename.to_string());
            Ok(UploadReceipt {
                file_id: format!("file-{filename}"),
                link: format!("https://storage.example/{filename}"),
            })
        }
    }

    struct RecordingTracker {
        fail: bool,
        rows: Mutex<Vec<TrackerRecord>>,
    }

    #[async_trait]
    impl OutcomeTracker for RecordingTracker {
        async fn append(&self, record: TrackerRecord) -> Result<(), CollaboratorError> {
            if self.fail {
                return Err("sheet unavailable".into());
            }
            self.rows.lock().unwrap().push(record);
            Ok(())
        }
    }

    struct SeqCaseNumbers {
        next: AtomicUsize,
    }

    impl CaseNumberAllocator for SeqCaseNumbers {
        fn allocate(&self, _client_name: &str) -> Result<String, CollaboratorError> {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(format!("CASE-{n}"))
        }
    }

    struct Fixture {
        pipeline: ReportPipeline,
        analyzer: Arc<StubAnalyzer>,
        renderer: Arc<StubRenderer>,
        storage: Arc<RecordingStorage>,
        tracker: Arc<RecordingTracker>,
    }

    fn fixture(fail_urls: &[&str], analyzer_fails: bool, storage_fails: bool) -> Fixture {
        fixture_with_tracker(fail_urls, analyzer_fails, storage_fails, false)
    }

    fn fixture_with_tracker(
        fail_urls: &[&str],
        analyzer_fails: bool,
        storage_fails: bool,
        tracker_fails: bool,
    ) -> Fixture {
        let analyzer = Arc::new(StubAnalyzer {
            calls: AtomicUsize::new(0),
            fail: analyzer_fails,
        });
        let renderer = Arc::new(StubRenderer {
            calls: AtomicUsize::new(0),
        });
        let storage = Arc::new(RecordingStorage {
            fail: storage_fails,
            uploads: Mutex::new(Vec::new()),
        });
        let tracker = Arc::new(RecordingTracker {
            fail: tracker_fails,
            rows: Mutex::new(Vec::new()),
        });

        let pipeline = ReportPipeline::new(
            Arc::new(StubSource {
                fail_urls: fail_urls.iter().map(|s| s.to_string()).collect(),
            }),
            Arc::clone(&analyzer) as Arc<dyn ReportAnalyzer>,
            Arc::clone(&renderer) as Arc<dyn ArtifactRenderer>,
            Arc::clone(&storage) as Arc<dyn ArtifactStorage>,
            Arc::clone(&tracker) as Arc<dyn OutcomeTracker>,
            Arc::new(SeqCaseNumbers {
                next: AtomicUsize::new(1),
            }),
        );

        Fixture {
            pipeline,
            analyzer,
            renderer,
            storage,
            tracker,
        }
    }

    fn rows(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({"name": format!("client {i}"), "url": format!("http://reports/{i}")}))
            .collect()
    }

    #[tokio::test]
    async fn empty_batch_is_the_only_fatal_error() {
        let fx = fixture(&[], false, false);
        let err = fx.pipeline.run_batch(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyBatch));
    }

    #[tokio::test]
    async fn partial_failure_never_aborts_the_batch() {
        // 5 items, item 3's fetch fails.
        let fx = fixture(&["http://reports/3"], false, false);

        let summary = fx.pipeline.run_batch(rows(5)).await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.uploaded, 4);
        // Failures still get a tracker row.
        assert_eq!(summary.recorded, 5);

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].identity, "client 3");
        assert!(summary.failures[0].error.contains("fetch failed"));

        // Exactly one tracker append per input item, in original order.
        let tracked = fx.tracker.rows.lock().unwrap();
        let names: Vec<&str> = tracked.iter().map(|r| r.client_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["client 1", "client 2", "client 3", "client 4", "client 5"]
        );
        assert!(!tracked[2].success);
    }

    #[tokio::test]
    async fn stage_a_short_circuits_per_item() {
        let fx = fixture(&["http://reports/1"], false, false);

        let summary = fx.pipeline.run_batch(rows(1)).await.unwrap();

        assert_eq!(summary.failed, 1);
        // Fetch failed, so the later stages never ran for this item.
        assert_eq!(fx.analyzer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyzer_failure_skips_render() {
        let fx = fixture(&[], true, false);

        let summary = fx.pipeline.run_batch(rows(2)).await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 0);
        assert!(summary.failures[0].error.contains("analyze failed"));
    }

    #[tokio::test]
    async fn invalid_rows_short_circuit_but_are_still_tracked() {
        let fx = fixture(&[], false, false);
        let mut batch = rows(2);
        batch.insert(1, json!({"name": "no url here"}));

        let summary = fx.pipeline.run_batch(batch).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.recorded, 3);
        assert_eq!(summary.failures[0].identity, "no url here");
        assert!(summary.failures[0].error.contains("validate failed"));

        let tracked = fx.tracker.rows.lock().unwrap();
        assert_eq!(tracked.len(), 3);
        assert_eq!(tracked[1].client_name, "no url here");
    }

    #[tokio::test]
    async fn upload_failure_does_not_fail_the_item() {
        let fx = fixture(&[], false, true);

        let summary = fx.pipeline.run_batch(rows(3)).await.unwrap();

        // Analysis succeeded everywhere; only the uploads went wrong.
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.recorded, 3);

        let tracked = fx.tracker.rows.lock().unwrap();
        assert!(tracked[0]
            .error
            .as_deref()
            .unwrap()
            .contains("upload failed"));
    }

    #[tokio::test]
    async fn tracker_failure_does_not_block_later_items() {
        let fx = fixture_with_tracker(&[], false, false, true);

        let summary = fx.pipeline.run_batch(rows(3)).await.unwrap();

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.recorded, 0);
        assert_eq!(summary.uploaded, 3);
        assert_eq!(fx.storage.uploads.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn all_failures_is_a_valid_outcome() {
        let fx = fixture(&["http://reports/1", "http://reports/2"], false, false);

        let summary = fx.pipeline.run_batch(rows(2)).await.unwrap();

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.recorded, 2);
    }

    #[tokio::test]
    async fn uploads_use_allocated_case_numbers() {
        let fx = fixture(&[], false, false);

        fx.pipeline.run_batch(rows(2)).await.unwrap();

        let uploads = fx.storage.uploads.lock().unwrap();
        assert_eq!(uploads.as_slice(), ["CASE-1.html", "CASE-2.html"]);
    }
}
