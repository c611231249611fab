// Data types flowing through the report pipeline. Like the booking models,
// these stay inert - stage logic lives in report_service.rs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One unit of batch work: whose report, and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub client_name: String,
    pub url: String,
}

impl ReportRequest {
    /// Validate a raw input row. Rows are polymorphic the same way booking
    /// items are: the name may arrive as `name`, `client_name` or `client`,
    /// the URL as `url` or `report_url`. The URL is the only hard requirement.
    pub fn from_row(row: &Value) -> Result<Self, String> {
        let client_name = ["name", "client_name", "client"]
            .iter()
            .find_map(|key| row.get(key).and_then(Value::as_str))
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let url = ["url", "report_url"]
            .iter()
            .find_map(|key| row.get(key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "missing required field: url".to_string())?
            .to_string();

        Ok(Self { client_name, url })
    }

    /// Stable identity for outcome reporting: the name when we have one,
    /// otherwise the URL.
    pub fn identity(&self) -> &str {
        if self.client_name.is_empty() {
            &self.url
        } else {
            &self.client_name
        }
    }
}

/// Traffic-light risk level derived from the total indicator points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Green,
    Amber,
    Red,
}

impl RiskLevel {
    /// A higher point total means more flagged indicators, i.e. a stronger
    /// case, so high scores map to GREEN.
    pub fn from_points(total: u32) -> Self {
        if total >= 70 {
            RiskLevel::Green
        } else if total >= 40 {
            RiskLevel::Amber
        } else {
            RiskLevel::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "GREEN",
            RiskLevel::Amber => "AMBER",
            RiskLevel::Red => "RED",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated risk indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: String,
    pub flagged: bool,
    pub points: u32,
}

/// Structured findings produced by the analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub indicators: Vec<IndicatorResult>,
    pub total_points: u32,
    pub risk: RiskLevel,
}

impl Findings {
    pub fn flagged_count(&self) -> usize {
        self.indicators.iter().filter(|i| i.flagged).count()
    }
}

/// Output of Stage A for one item: findings plus the rendered artifact bytes.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub findings: Findings,
    pub artifact: Vec<u8>,
}

/// What the storage collaborator hands back after an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: String,
    pub link: String,
}

/// Which pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Fetch,
    Analyze,
    Render,
    Upload,
    Track,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Fetch => "fetch",
            Stage::Analyze => "analyze",
            Stage::Render => "render",
            Stage::Upload => "upload",
            Stage::Track => "track",
        };
        f.write_str(name)
    }
}

/// A caught per-item failure. Terminal for the item, never for the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub identity: String,
    pub url: String,
    pub stage: Stage,
    pub message: String,
}

impl FailureRecord {
    pub fn error_text(&self) -> String {
        format!("{} failed: {}", self.stage, self.message)
    }
}

/// What a fully successful item produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessPayload {
    pub case_number: Option<String>,
    pub total_points: u32,
    pub risk: RiskLevel,
    pub flagged_count: usize,
    pub artifact_link: Option<String>,
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    Success(SuccessPayload),
    Failure(FailureRecord),
}

/// Exactly one of these exists per input row, success or failure.
/// `uploaded` and `recorded` track the side-effecting stages separately so
/// the summary can count them - a tracker row is written even for failures,
/// so `recorded` is generally >= the success count.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub identity: String,
    pub url: String,
    pub result: ItemResult,
    pub uploaded: bool,
    pub recorded: bool,
}

/// The row handed to the tracker collaborator. The tracker itself stamps the
/// timestamp at append time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerRecord {
    pub client_name: String,
    pub url: String,
    pub success: bool,
    pub total_points: Option<u32>,
    pub risk: Option<RiskLevel>,
    pub flagged_count: Option<usize>,
    pub artifact_link: Option<String>,
    pub file_id: Option<String>,
    pub case_number: Option<String>,
    pub error: Option<String>,
}
