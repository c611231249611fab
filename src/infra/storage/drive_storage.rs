// Google Drive implementation of the ArtifactStorage port.
//
// Uses the simple media upload endpoint: one POST with the raw bytes, then a
// PATCH to set the filename (and parent folder when configured), then a
// best-effort permission grant so the view link works for anyone with it.
// The access token is supplied ready-made via configuration - negotiating
// credentials is not this crate's job.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::reports::{ArtifactStorage, CollaboratorError, UploadReceipt};

const DRIVE_API_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

pub struct DriveStorage {
    client: Client,
    token: String,
    folder_id: Option<String>,
    api_base: String,
}

impl DriveStorage {
    pub fn new(token: String, folder_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            token,
            folder_id,
            api_base: DRIVE_API_BASE.to_string(),
        }
    }

    /// Fallback view link when the API response does not include one.
    pub fn view_link_for(file_id: &str) -> String {
        format!("https://drive.google.com/file/d/{file_id}/view")
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response, CollaboratorError> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Drive {action} failed ({status}): {text}").into());
        }
        Ok(response)
    }
}

#[async_trait]
impl ArtifactStorage for DriveStorage {
    async fn upload(
        &self,
        artifact: Vec<u8>,
        filename: &str,
    ) -> Result<UploadReceipt, CollaboratorError> {
        // 1. Push the bytes.
        let response = self
            .client
            .post(format!(
                "{}/upload/drive/v3/files?uploadType=media",
                self.api_base
            ))
            .bearer_auth(&self.token)
            .header("Content-Type", "text/html")
            .body(artifact)
            .send()
            .await?;
        let created: DriveFile = Self::check(response, "upload").await?.json().await?;

        // 2. Name the file and move it into the target folder.
        let mut rename = self
            .client
            .patch(format!(
                "{}/drive/v3/files/{}?fields=id,webViewLink",
                self.api_base, created.id
            ))
            .bearer_auth(&self.token)
            .json(&json!({ "name": filename }));
        if let Some(folder) = &self.folder_id {
            rename = rename.query(&[("addParents", folder.as_str())]);
        }
        let named: DriveFile = Self::check(rename.send().await?, "rename").await?.json().await?;

        // 3. Best-effort public read permission; a denial is not fatal, the
        //    file exists either way.
        let permission = self
            .client
            .post(format!(
                "{}/drive/v3/files/{}/permissions",
                self.api_base, named.id
            ))
            .bearer_auth(&self.token)
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await;
        match permission {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(filename, "could not set public permission on upload");
            }
            Err(e) => tracing::warn!(filename, "permission request failed: {e}"),
            Ok(_) => {}
        }

        let link = named
            .web_view_link
            .unwrap_or_else(|| Self::view_link_for(&named.id));

        tracing::info!(filename, file_id = %named.id, "artifact uploaded");

        Ok(UploadReceipt {
            file_id: named.id,
            link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_link_embeds_the_file_id() {
        assert_eq!(
            DriveStorage::view_link_for("abc123"),
            "https://drive.google.com/file/d/abc123/view"
        );
    }
}
