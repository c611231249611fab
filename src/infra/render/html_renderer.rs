// Self-contained HTML implementation of the ArtifactRenderer port.
// Layout is intentionally minimal - the artifact just needs to be a readable,
// uploadable document; presentation polish lives outside this service.

use async_trait::async_trait;
use chrono::Local;

use crate::core::reports::{ArtifactRenderer, CollaboratorError, Findings, ReportRequest};

pub struct HtmlReportRenderer;

impl HtmlReportRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_html(&self, request: &ReportRequest, findings: &Findings) -> String {
        let mut rows = String::new();
        for indicator in &findings.indicators {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&indicator.name),
                if indicator.flagged { "YES" } else { "no" },
                indicator.points,
            ));
        }

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Assessment Report - {name}</title>\n</head>\n<body>\n\
             <h1>Assessment Report</h1>\n\
             <p>Client: {name}</p>\n\
             <p>Source: {url}</p>\n\
             <p>Generated: {generated}</p>\n\
             <h2>Risk: {risk} ({points} points)</h2>\n\
             <table border=\"1\">\n\
             <tr><th>Indicator</th><th>Flagged</th><th>Points</th></tr>\n\
             {rows}\
             </table>\n</body>\n</html>\n",
            name = escape(request.identity()),
            url = escape(&request.url),
            generated = Local::now().format("%d/%m/%Y - %H:%M:%S"),
            risk = findings.risk,
            points = findings.total_points,
        )
    }
}

impl Default for HtmlReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactRenderer for HtmlReportRenderer {
    async fn render(
        &self,
        request: &ReportRequest,
        findings: &Findings,
    ) -> Result<Vec<u8>, CollaboratorError> {
        Ok(self.render_html(request, findings).into_bytes())
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reports::{IndicatorResult, RiskLevel};

    fn findings() -> Findings {
        Findings {
            indicators: vec![IndicatorResult {
                name: "active_ccj".into(),
                flagged: true,
                points: 40,
            }],
            total_points: 40,
            risk: RiskLevel::Amber,
        }
    }

    #[tokio::test]
    async fn rendered_artifact_contains_the_findings() {
        let request = ReportRequest {
            client_name: "Jane Doe".into(),
            url: "http://reports/1".into(),
        };

        let bytes = HtmlReportRenderer::new()
            .render(&request, &findings())
            .await
            .unwrap();
        let html = String::from_utf8(bytes).unwrap();

        assert!(html.contains("Jane Doe"));
        assert!(html.contains("AMBER"));
        assert!(html.contains("active_ccj"));
        assert!(html.contains("40 points"));
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape("<b>&x</b>"), "&lt;b&gt;&amp;x&lt;/b&gt;");
    }
}
