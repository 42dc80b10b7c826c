//! Notification feed client.
//!
//! The feed endpoint returns an array of `{id, content, metadata}` where
//! `content` and `metadata` are base64 strings that may additionally be
//! gzip-compressed. Metadata carries the issue snapshot (summary, bundle
//! fields, tags, comment events) that we flatten into a `Notification`.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use std::time::Duration;

use trackwire_core::config::TrackerConfig;
use trackwire_core::error::{Result, TrackWireError};
use trackwire_core::traits::NotificationSource;
use trackwire_core::types::Notification;

/// Issue-tracker API client.
pub struct TrackerClient {
    config: TrackerConfig,
    client: reqwest::Client,
}

impl TrackerClient {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    pub(crate) fn token(&self) -> &str {
        &self.config.token
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    async fn fetch_raw(&self, limit: u32) -> Result<Value> {
        let url = format!("{}/api/users/notifications", self.base_url());
        let mut query: Vec<(&str, String)> = vec![
            ("fields", "id,content,metadata,read,updated".into()),
            ("all", "true".into()),
        ];
        if limit > 0 {
            query.push(("$top", limit.to_string()));
        }

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .bearer_auth(self.token())
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| TrackWireError::Tracker(format!("notification fetch failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TrackWireError::Tracker(format!(
                "notification fetch: HTTP {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| TrackWireError::Tracker(format!("invalid notification response: {e}")))
    }
}

#[async_trait]
impl NotificationSource for TrackerClient {
    async fn fetch_notifications(&self, limit: u32) -> Result<Vec<Notification>> {
        let raw = self.fetch_raw(limit).await?;
        let list = parse_notifications(&raw, self.base_url());
        tracing::debug!("📥 Fetched {} notification(s) from tracker", list.len());
        Ok(list)
    }
}

/// Flatten the raw feed array into `Notification`s.
pub fn parse_notifications(raw: &Value, base_url: &str) -> Vec<Notification> {
    let Some(arr) = raw.as_array() else {
        return Vec::new();
    };

    let mut list = Vec::with_capacity(arr.len());
    for n in arr {
        let id = text(n, "id");
        let content = decode_payload(&text(n, "content"));
        let metadata_raw = decode_payload(&text(n, "metadata"));
        let metadata: Value = serde_json::from_str(&metadata_raw).unwrap_or(Value::Null);

        let issue = &metadata["issue"];
        let fields = &issue["fields"];
        let change = &metadata["change"];

        let issue_id = text(issue, "id");
        let mut tags = tags_added(change);
        if tags.is_empty() {
            if let Some(reasons) = metadata["reason"]["tagReasons"].as_array() {
                tags.extend(reasons.iter().map(|t| text(t, "name")));
            }
        }

        let link = if issue_id.is_empty() {
            String::new()
        } else {
            format!("{base_url}/issue/{issue_id}")
        };

        list.push(Notification {
            id,
            issue_id,
            title: text(issue, "summary"),
            content,
            status: field_value_by_name(fields, "State"),
            updated: text(n, "updated"),
            read: n["read"].as_bool().unwrap_or(false),
            assignee: field_value_by_name(fields, "Assignee"),
            priority: field_value_by_name(fields, "Priority"),
            header: text(&metadata, "header"),
            comment: comment_text(change),
            link,
            tags,
        });
    }
    list
}

fn text(node: &Value, key: &str) -> String {
    match &node[key] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Look up a bundle field value by its name ("State", "Assignee", ...).
fn field_value_by_name(fields: &Value, name: &str) -> String {
    let Some(fields) = fields.as_array() else {
        return String::new();
    };
    fields
        .iter()
        .find(|f| text(f, "name").eq_ignore_ascii_case(name))
        .map(|f| text(f, "value"))
        .unwrap_or_default()
}

/// Tags added by this change's TAGS events.
fn tags_added(change: &Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(events) = change["events"].as_array() {
        for ev in events {
            if text(ev, "category") == "TAGS" {
                if let Some(added) = ev["addedValues"].as_array() {
                    out.extend(added.iter().map(|v| text(v, "name")));
                }
            }
        }
    }
    out
}

/// Text of the first COMMENT event, if any.
fn comment_text(change: &Value) -> String {
    if let Some(events) = change["events"].as_array() {
        for ev in events {
            if text(ev, "category") == "COMMENT" {
                if let Some(added) = ev["addedValues"].as_array() {
                    if let Some(first) = added.first() {
                        return text(first, "name");
                    }
                }
            }
        }
    }
    String::new()
}

/// Decode a payload that is base64, possibly gzip underneath. Anything that
/// fails to decode is returned as-is.
pub fn decode_payload(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let Ok(decoded) = BASE64.decode(input) else {
        return input.to_string();
    };
    // gzip magic bytes
    if decoded.len() >= 2 && decoded[0] == 0x1f && decoded[1] == 0x8b {
        let mut out = String::new();
        if GzDecoder::new(&decoded[..]).read_to_string(&mut out).is_ok() {
            return out;
        }
        return input.to_string();
    }
    String::from_utf8(decoded).unwrap_or_else(|_| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde_json::json;
    use std::io::Write;

    fn b64(data: &[u8]) -> String {
        BASE64.encode(data)
    }

    fn gzip_b64(data: &str) -> String {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data.as_bytes()).unwrap();
        b64(&enc.finish().unwrap())
    }

    #[test]
    fn test_decode_plain_base64() {
        assert_eq!(decode_payload(&b64(b"hello")), "hello");
    }

    #[test]
    fn test_decode_gzip_base64() {
        assert_eq!(decode_payload(&gzip_b64("compressed body")), "compressed body");
    }

    #[test]
    fn test_decode_garbage_passthrough() {
        assert_eq!(decode_payload("not!base64!!"), "not!base64!!");
        assert_eq!(decode_payload(""), "");
    }

    #[test]
    fn test_parse_notifications_full() {
        let metadata = json!({
            "issue": {
                "id": "DEMO-7",
                "summary": "Fix login bug",
                "fields": [
                    {"name": "State", "value": "Open"},
                    {"name": "Priority", "value": "Critical"},
                    {"name": "Assignee", "value": "alice"}
                ]
            },
            "header": "Issue updated",
            "change": {
                "events": [
                    {"category": "TAGS", "addedValues": [{"name": "regression"}]},
                    {"category": "COMMENT", "addedValues": [{"name": "please check"}]}
                ]
            }
        });
        let raw = json!([{
            "id": "516-1",
            "content": b64(b"body"),
            "metadata": b64(metadata.to_string().as_bytes()),
            "read": false,
            "updated": "1700000000000"
        }]);

        let list = parse_notifications(&raw, "https://issues.example.com");
        assert_eq!(list.len(), 1);
        let n = &list[0];
        assert_eq!(n.id, "516-1");
        assert_eq!(n.issue_id, "DEMO-7");
        assert_eq!(n.title, "Fix login bug");
        assert_eq!(n.status, "Open");
        assert_eq!(n.priority, "Critical");
        assert_eq!(n.assignee, "alice");
        assert_eq!(n.tags, vec!["regression"]);
        assert_eq!(n.comment, "please check");
        assert_eq!(n.link, "https://issues.example.com/issue/DEMO-7");
        assert_eq!(n.header, "Issue updated");
    }

    #[test]
    fn test_parse_tags_fall_back_to_reason() {
        let metadata = json!({
            "issue": {"id": "DEMO-8", "summary": "Tagged"},
            "change": {"events": []},
            "reason": {"tagReasons": [{"name": "Star"}]}
        });
        let raw = json!([{
            "id": "516-2",
            "metadata": b64(metadata.to_string().as_bytes())
        }]);

        let list = parse_notifications(&raw, "https://issues.example.com");
        assert_eq!(list[0].tags, vec!["Star"]);
    }

    #[test]
    fn test_parse_non_array_is_empty() {
        assert!(parse_notifications(&json!({"error": "nope"}), "x").is_empty());
    }
}
