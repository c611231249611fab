// HTTP implementation of the ReportSource port.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::core::reports::{CollaboratorError, ReportSource};

/// How long a single report fetch may take before we give up on it.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpReportSource {
    client: Client,
}

impl HttpReportSource {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    async fn fetch(&self, url: &str) -> Result<String, CollaboratorError> {
        tracing::debug!(url, "fetching report content");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()).into());
        }

        Ok(response.text().await?)
    }
}
