// Report pipeline module - the batch orchestration core.
// - `report_models.rs` holds the data types shared across stages.
// - `report_service.rs` defines the collaborator ports and runs the pipeline.
// - `summary.rs` folds per-item outcomes into the final batch summary.

pub mod report_models;
pub mod report_service;
pub mod summary;

pub use report_models::{
    FailureRecord, Findings, IndicatorResult, ItemOutcome, ItemResult, RenderedReport,
    ReportRequest, RiskLevel, Stage, SuccessPayload, TrackerRecord, UploadReceipt,
};
pub use report_service::{
    ArtifactRenderer, ArtifactStorage, CaseNumberAllocator, CollaboratorError, OutcomeTracker,
    PipelineConfig, PipelineError, ReportAnalyzer, ReportPipeline, ReportSource,
};
pub use summary::{summarize, BatchSummary, FailureEntry};
