// Google Sheets implementation of OutcomeTracker.
//
// Appends one row per processed report to a tracker sheet via the
// values:append endpoint. Requires an OAuth access token with the
// spreadsheets scope.

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde_json::json;

use crate::core::reports::{CollaboratorError, OutcomeTracker, TrackerRecord};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y - %H:%M:%S";

pub struct SheetsTracker {
    client: Client,
    token: String,
    spreadsheet_id: String,
    sheet_name: String,
    api_base: String,
}

impl SheetsTracker {
    pub fn new(token: String, spreadsheet_id: String, sheet_name: String) -> Self {
        Self {
            client: Client::new(),
            token,
            spreadsheet_id,
            sheet_name,
            api_base: SHEETS_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, base: String) -> Self {
        self.api_base = base;
        self
    }

    /// Builds the cell values for one tracker row. Kept separate from the
    /// network call so the layout can be tested directly.
    ///
    /// Columns: timestamp, client, case number, status, points, risk,
    /// flagged indicators, report link, source url, notes.
    fn row_cells(record: &TrackerRecord, timestamp: &str) -> Vec<serde_json::Value> {
        let status = if record.success {
            "Processed"
        } else {
            "Failed"
        };

        let link_cell = match &record.artifact_link {
            Some(link) => json!(format!(
                "=HYPERLINK(\"{}\", \"Open report\")",
                link.replace('"', "")
            )),
            None => {
                if record.success {
                    json!("Upload Failed")
                } else {
                    json!("")
                }
            }
        };

        vec![
            json!(timestamp),
            json!(record.client_name),
            json!(record.case_number.as_deref().unwrap_or("")),
            json!(status),
            match record.total_points {
                Some(points) => json!(points),
                None => json!(""),
            },
            match record.risk {
                Some(risk) => json!(risk.to_string()),
                None => json!(""),
            },
            match record.flagged_count {
                Some(count) => json!(count),
                None => json!(""),
            },
            link_cell,
            json!(record.url),
            json!(record.error.as_deref().unwrap_or("")),
        ]
    }
}

#[async_trait]
impl OutcomeTracker for SheetsTracker {
    async fn append(&self, record: TrackerRecord) -> Result<(), CollaboratorError> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let cells = Self::row_cells(&record, &timestamp);

        let url = format!(
            "{}/{}/values/{}!A:J:append",
            self.api_base, self.spreadsheet_id, self.sheet_name
        );

        let response = self
            .client
            .post(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&json!({ "values": [cells] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Sheets append failed ({}): {}", status, text).into());
        }

        tracing::debug!("Appended tracker row for '{}'", record.client_name);
        Ok(())
    }
}
