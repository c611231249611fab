// This is the entry point of the assessment pipeline.
//
// **Architecture Overview:**
// - `core/` = Business logic (booking normalization, report orchestration)
// - `infra/` = Implementations of core traits (HTTP, Drive, Sheets, files)
//
// This file's job is to:
// 1. Load configuration from the environment
// 2. Initialize collaborators (dependency injection)
// 3. Run the booking intake and/or the report batch
// 4. Print the batch summary

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use anyhow::Context;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::booking::BookingService;
use crate::core::reports::{
    ArtifactStorage, CaseNumberAllocator, FailureRecord, OutcomeTracker, PipelineConfig,
    ReportPipeline, Stage, TrackerRecord,
};
use crate::infra::analysis::IndicatorAnalyzer;
use crate::infra::catalog::load_catalog;
use crate::infra::render::HtmlReportRenderer;
use crate::infra::source::HttpReportSource;
use crate::infra::storage::{DriveStorage, InMemoryStorage};
use crate::infra::tracker::{CaseNumberStore, InMemoryTracker, JsonlFailureLog, SheetsTracker};

const DEFAULT_TRACKER_SHEET: &str = "Tracker";

/// Side-effecting collaborators, swapped out wholesale in dry-run mode.
struct Collaborators {
    storage: Arc<dyn ArtifactStorage>,
    tracker: Arc<dyn OutcomeTracker>,
    case_numbers: Arc<dyn CaseNumberAllocator>,
}

fn build_collaborators(dry_run: bool, data_dir: &str) -> anyhow::Result<Collaborators> {
    if dry_run {
        tracing::info!("DRY_RUN is set - using in-memory storage and tracker");
        return Ok(Collaborators {
            storage: Arc::new(InMemoryStorage::new()),
            tracker: Arc::new(InMemoryTracker::new()),
            case_numbers: Arc::new(CaseNumberStore::ephemeral()),
        });
    }

    let token = std::env::var("GOOGLE_API_TOKEN")
        .context("Missing GOOGLE_API_TOKEN environment variable (or set DRY_RUN=1)")?;
    let spreadsheet_id = std::env::var("SPREADSHEET_ID")
        .context("Missing SPREADSHEET_ID environment variable (or set DRY_RUN=1)")?;
    let folder_id = std::env::var("DRIVE_FOLDER_ID").ok();
    let sheet_name =
        std::env::var("TRACKER_SHEET").unwrap_or_else(|_| DEFAULT_TRACKER_SHEET.to_string());

    Ok(Collaborators {
        storage: Arc::new(DriveStorage::new(token.clone(), folder_id)),
        tracker: Arc::new(SheetsTracker::new(token, spreadsheet_id, sheet_name)),
        case_numbers: Arc::new(CaseNumberStore::load(PathBuf::from(format!(
            "{}/case_counter.json",
            data_dir
        )))),
    })
}

fn read_rows(path: &str) -> anyhow::Result<Vec<Value>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Could not read {}", path))?;
    let rows: Vec<Value> =
        serde_json::from_str(&content).with_context(|| format!("{} is not a JSON array", path))?;
    Ok(rows)
}

/// Normalizes each raw booking item and records accepted bookings on the
/// tracker. Rejected items are logged and appended to the failure log; one
/// bad item never stops the rest of the file.
async fn run_booking_intake(
    bookings_file: &str,
    catalog_file: &str,
    tracker: &Arc<dyn OutcomeTracker>,
    failure_log: &JsonlFailureLog,
) -> anyhow::Result<()> {
    let catalog = load_catalog(std::path::Path::new(catalog_file))
        .with_context(|| format!("Could not load service catalog from {}", catalog_file))?;
    if catalog.is_empty() {
        tracing::warn!(
            "Service catalog at {} is empty - every booking will be rejected",
            catalog_file
        );
    }
    let service = BookingService::new(catalog);

    let rows = read_rows(bookings_file)?;
    tracing::info!("Processing {} booking item(s) from {}", rows.len(), bookings_file);

    let mut accepted = 0usize;
    let mut rejected = 0usize;

    for (index, row) in rows.iter().enumerate() {
        match service.normalize(row) {
            Ok(record) => {
                accepted += 1;
                tracing::info!(
                    "Booking {} accepted: {:?} {} at {}",
                    record.booking_id,
                    record.action,
                    record.service,
                    record.start
                );

                let client_name = record
                    .customer_name
                    .clone()
                    .unwrap_or_else(|| record.booking_id.clone());
                let recorded = tracker
                    .append(TrackerRecord {
                        client_name,
                        url: String::new(),
                        success: true,
                        total_points: None,
                        risk: None,
                        flagged_count: None,
                        artifact_link: None,
                        file_id: None,
                        case_number: Some(record.booking_id.clone()),
                        error: None,
                    })
                    .await;
                if let Err(e) = recorded {
                    tracing::error!("Could not track booking {}: {}", record.booking_id, e);
                }
            }
            Err(e) => {
                rejected += 1;
                tracing::warn!("Booking item {} rejected: {}", index, e);
                failure_log.append_all(&[FailureRecord {
                    identity: format!("booking item {}", index),
                    url: String::new(),
                    stage: Stage::Validate,
                    message: e.to_string(),
                }]);
            }
        }
    }

    tracing::info!(
        "Booking intake finished: {} accepted, {} rejected",
        accepted,
        rejected
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let dry_run = std::env::var("DRY_RUN")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Keep runtime state files in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    let failure_log = JsonlFailureLog::new(PathBuf::from(format!("{}/failures.jsonl", data_dir)));

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let collaborators = build_collaborators(dry_run, data_dir)?;

    // Booking intake runs first so that same-day bookings are on the tracker
    // before the report batch appends its rows.
    if let Ok(bookings_file) = std::env::var("BOOKINGS_FILE") {
        let catalog_file = std::env::var("CATALOG_FILE")
            .context("BOOKINGS_FILE is set but CATALOG_FILE is not")?;
        run_booking_intake(
            &bookings_file,
            &catalog_file,
            &collaborators.tracker,
            &failure_log,
        )
        .await?;
    }

    if let Ok(reports_file) = std::env::var("REPORTS_FILE") {
        let max_concurrent = std::env::var("MAX_CONCURRENT_FETCHES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(|| PipelineConfig::default().max_concurrent);

        let source = HttpReportSource::new().context("Failed to build HTTP client")?;
        let pipeline = ReportPipeline::new(
            Arc::new(source),
            Arc::new(IndicatorAnalyzer::new()),
            Arc::new(HtmlReportRenderer::new()),
            Arc::clone(&collaborators.storage),
            Arc::clone(&collaborators.tracker),
            Arc::clone(&collaborators.case_numbers),
        )
        .with_config(PipelineConfig { max_concurrent });

        let rows = read_rows(&reports_file)?;
        tracing::info!(
            "Processing {} report row(s) from {} ({} concurrent fetches)",
            rows.len(),
            reports_file,
            max_concurrent
        );

        let summary = pipeline
            .run_batch(rows)
            .await
            .context("Report batch could not run")?;

        failure_log.append_entries(&summary.failures);
        for failure in &summary.failures {
            tracing::warn!("{}: {}", failure.identity, failure.error);
        }

        println!("{}", summary.summary_line());
    }

    Ok(())
}
