//! Issue creation and project listing, used by the interactive bot commands.

use serde_json::{Value, json};
use std::time::Duration;

use trackwire_core::error::{Result, TrackWireError};
use trackwire_core::types::ProjectInfo;

use crate::client::TrackerClient;

impl TrackerClient {
    /// Create a new issue and return its readable id.
    pub async fn create_issue(&self, summary: &str, project_id: &str) -> Result<String> {
        let url = format!("{}/api/issues", self.base_url());
        let body = json!({
            "summary": summary,
            "project": { "id": project_id },
        });

        let resp = self
            .http()
            .post(&url)
            .query(&[("fields", "id,idReadable")])
            .bearer_auth(self.token())
            .json(&body)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| TrackWireError::Tracker(format!("issue create failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(TrackWireError::Tracker(format!(
                "issue create: HTTP {status}: {detail}"
            )));
        }

        let created: Value = resp
            .json()
            .await
            .map_err(|e| TrackWireError::Tracker(format!("invalid create response: {e}")))?;
        let id = created["idReadable"]
            .as_str()
            .or_else(|| created["id"].as_str())
            .unwrap_or_default()
            .to_string();
        if id.is_empty() {
            return Err(TrackWireError::Tracker(
                "issue created but response carried no id".into(),
            ));
        }
        tracing::info!("📝 Created issue {id} in project {project_id}");
        Ok(id)
    }

    /// List projects available for issue creation.
    pub async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        let url = format!("{}/api/admin/projects", self.base_url());
        let resp = self
            .http()
            .get(&url)
            .query(&[("fields", "id,name")])
            .bearer_auth(self.token())
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| TrackWireError::Tracker(format!("project list failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TrackWireError::Tracker(format!(
                "project list: HTTP {}",
                resp.status()
            )));
        }

        let raw: Value = resp
            .json()
            .await
            .map_err(|e| TrackWireError::Tracker(format!("invalid project response: {e}")))?;

        let mut projects = Vec::new();
        if let Some(arr) = raw.as_array() {
            for p in arr {
                let id = p["id"].as_str().unwrap_or_default().to_string();
                if id.is_empty() {
                    continue;
                }
                let name = p["name"].as_str().unwrap_or_default();
                projects.push(ProjectInfo {
                    name: if name.is_empty() { id.clone() } else { name.to_string() },
                    id,
                });
            }
        }
        Ok(projects)
    }
}
