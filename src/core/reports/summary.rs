// The result reporter: folds per-item outcomes into the final batch tally.
// Pure functions over the outcome list - calling summarize twice on the same
// outcomes gives identical summaries.

use super::report_models::{ItemOutcome, ItemResult};

/// One user-facing failure entry, in original input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub identity: String,
    pub error: String,
}

/// Final tally for a batch run. Always produced, even when every item failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful artifact uploads (Stage B).
    pub uploaded: usize,
    /// Successful tracker appends (Stage C). Rows are written for failures
    /// too, so this is generally >= `succeeded`.
    pub recorded: usize,
    pub failures: Vec<FailureEntry>,
}

impl BatchSummary {
    pub fn summary_line(&self) -> String {
        format!(
            "Processed {}/{} reports successfully ({} failed, {} uploaded, {} tracked)",
            self.succeeded, self.total, self.failed, self.uploaded, self.recorded
        )
    }
}

pub fn summarize(outcomes: &[ItemOutcome]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: outcomes.len(),
        succeeded: 0,
        failed: 0,
        uploaded: 0,
        recorded: 0,
        failures: Vec::new(),
    };

    for outcome in outcomes {
        match &outcome.result {
            ItemResult::Success(_) => summary.succeeded += 1,
            ItemResult::Failure(failure) => {
                summary.failed += 1;
                summary.failures.push(FailureEntry {
                    identity: failure.identity.clone(),
                    error: failure.error_text(),
                });
            }
        }
        if outcome.uploaded {
            summary.uploaded += 1;
        }
        if outcome.recorded {
            summary.recorded += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reports::report_models::{FailureRecord, RiskLevel, Stage, SuccessPayload};

    fn success_outcome(identity: &str) -> ItemOutcome {
        ItemOutcome {
            identity: identity.to_string(),
            url: format!("http://reports/{identity}"),
            result: ItemResult::Success(SuccessPayload {
                case_number: None,
                total_points: 55,
                risk: RiskLevel::Amber,
                flagged_count: 2,
                artifact_link: Some("https://storage.example/x".into()),
                file_id: Some("x".into()),
            }),
            uploaded: true,
            recorded: true,
        }
    }

    fn failure_outcome(identity: &str, stage: Stage) -> ItemOutcome {
        ItemOutcome {
            identity: identity.to_string(),
            url: String::new(),
            result: ItemResult::Failure(FailureRecord {
                identity: identity.to_string(),
                url: String::new(),
                stage,
                message: "boom".into(),
            }),
            uploaded: false,
            recorded: true,
        }
    }

    #[test]
    fn counts_and_failure_list() {
        let outcomes = vec![
            success_outcome("a"),
            failure_outcome("b", Stage::Fetch),
            success_outcome("c"),
        ];

        let summary = summarize(&outcomes);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.recorded, 3);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].identity, "b");
        assert_eq!(summary.failures[0].error, "fetch failed: boom");
    }

    #[test]
    fn summarize_is_idempotent() {
        let outcomes = vec![success_outcome("a"), failure_outcome("b", Stage::Render)];

        assert_eq!(summarize(&outcomes), summarize(&outcomes));
    }

    #[test]
    fn empty_outcomes_summarize_to_zeroes() {
        let summary = summarize(&[]);

        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn summary_line_embeds_counts() {
        let outcomes = vec![success_outcome("a"), failure_outcome("b", Stage::Fetch)];
        let line = summarize(&outcomes).summary_line();

        assert!(line.contains("1/2"));
        assert!(line.contains("1 failed"));
    }
}
