// Marker-scan implementation of the ReportAnalyzer port.
//
// Each risk indicator is a (name, marker, points) rule: the indicator is
// flagged when its marker appears in the fetched content (case-insensitive
// substring match). The rule table is data so the weighting can be tuned
// without touching the scan.

use async_trait::async_trait;

use crate::core::reports::{
    CollaboratorError, Findings, IndicatorResult, ReportAnalyzer, RiskLevel,
};

#[derive(Debug, Clone)]
pub struct IndicatorRule {
    pub name: &'static str,
    pub marker: &'static str,
    pub points: u32,
}

pub fn default_indicator_rules() -> Vec<IndicatorRule> {
    vec![
        IndicatorRule {
            name: "active_ccj",
            marker: "county court judgement",
            points: 40,
        },
        IndicatorRule {
            name: "active_default",
            marker: "default",
            points: 30,
        },
        IndicatorRule {
            name: "debt_collection",
            marker: "debt collection",
            points: 25,
        },
        IndicatorRule {
            name: "ap_marker",
            marker: "arrangement to pay",
            points: 20,
        },
        IndicatorRule {
            name: "arrears",
            marker: "arrears",
            points: 20,
        },
        IndicatorRule {
            name: "utilisation",
            marker: "over limit",
            points: 15,
        },
        IndicatorRule {
            name: "rapid_borrowing",
            marker: "recently opened",
            points: 15,
        },
        IndicatorRule {
            name: "repeat_lending",
            marker: "repeat lending",
            points: 25,
        },
    ]
}

/// Extra points when the CCJ marker appears more than once.
const MULTIPLE_CCJS_POINTS: u32 = 50;

pub struct IndicatorAnalyzer {
    rules: Vec<IndicatorRule>,
}

impl IndicatorAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: default_indicator_rules(),
        }
    }

    pub fn with_rules(rules: Vec<IndicatorRule>) -> Self {
        Self { rules }
    }

    fn scan(&self, content: &str) -> Findings {
        let haystack = content.to_lowercase();
        let mut indicators = Vec::with_capacity(self.rules.len() + 1);
        let mut total_points = 0;

        for rule in &self.rules {
            let flagged = haystack.contains(rule.marker);
            if flagged {
                total_points += rule.points;
            }
            indicators.push(IndicatorResult {
                name: rule.name.to_string(),
                flagged,
                points: if flagged { rule.points } else { 0 },
            });
        }

        let ccj_occurrences = haystack.matches("county court judgement").count();
        let multiple = ccj_occurrences >= 2;
        if multiple {
            total_points += MULTIPLE_CCJS_POINTS;
        }
        indicators.push(IndicatorResult {
            name: "multiple_ccjs".to_string(),
            flagged: multiple,
            points: if multiple { MULTIPLE_CCJS_POINTS } else { 0 },
        });

        Findings {
            indicators,
            total_points,
            risk: RiskLevel::from_points(total_points),
        }
    }
}

impl Default for IndicatorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportAnalyzer for IndicatorAnalyzer {
    async fn analyze(&self, content: &str) -> Result<Findings, CollaboratorError> {
        if content.trim().is_empty() {
            return Err("fetched content is empty".into());
        }

        let findings = self.scan(content);
        tracing::debug!(
            total_points = findings.total_points,
            risk = %findings.risk,
            "analysis complete"
        );
        Ok(findings)
    }
}
