//! Slack Web API notifications

use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Error, Result};

use super::{Channel, NotificationSink, PatchUpload, SinkResponse};

const SLACK_API_URL: &str = "https://slack.com/api";
const PAGE_LIMIT: &str = "200";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Slack bot client authenticated with a bot token
pub struct SlackClient {
    http: Client,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("wiki-diff-notify")
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
        })
    }

    /// Call a Web API method with form parameters
    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<SinkResponse> {
        debug!(method, "Calling Slack API");
        let response = self
            .http
            .post(format!("{}/{}", SLACK_API_URL, method))
            .bearer_auth(&self.token)
            .form(params)
            .send()?;

        // API errors come back as 200 with ok=false; anything else has no JSON body
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Ok(SinkResponse::from(json!({
                "ok": false,
                "status": status.as_u16(),
                "body": text,
            })));
        }

        let payload: Value = response.json()?;
        Ok(SinkResponse::from(payload))
    }

    /// Call a method whose failure is never recoverable by retrying later
    fn call_ok(&self, method: &str, params: &[(&str, &str)]) -> Result<Value> {
        let response = self.call(method, params)?;
        if !response.ok {
            error!(method, payload = %response.payload, "Slack API call failed");
            return Err(Error::Sink {
                method: method.to_string(),
                payload: response.payload,
            });
        }
        Ok(response.payload)
    }

    fn send_file_content(&self, upload_url: &str, content: &str) -> Result<SinkResponse> {
        let response = self
            .http
            .post(upload_url)
            .body(content.to_string())
            .send()?;

        let status = response.status();
        let text = response.text().unwrap_or_default();
        Ok(SinkResponse {
            ok: status.is_success(),
            payload: json!({ "status": status.as_u16(), "body": text }),
        })
    }
}

impl NotificationSink for SlackClient {
    fn list_channels(&self) -> Result<Vec<Channel>> {
        let mut channels = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut params = vec![
                ("types", "public_channel,private_channel"),
                ("exclude_archived", "true"),
                ("limit", PAGE_LIMIT),
            ];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }

            let payload = self.call_ok("conversations.list", &params)?;
            channels.extend(parse_channels(&payload));

            cursor = next_cursor(&payload);
            if cursor.is_empty() {
                break;
            }
        }

        Ok(channels)
    }

    fn is_archived(&self, channel: &Channel) -> Result<bool> {
        let payload = self.call_ok("conversations.info", &[("channel", channel.id.as_str())])?;
        Ok(channel_is_archived(&payload))
    }

    fn post_message(&self, channel: &Channel, text: &str) -> Result<SinkResponse> {
        self.call("chat.postMessage", &[("channel", channel.id.as_str()), ("text", text)])
    }

    fn upload_patch(&self, channel: &Channel, upload: &PatchUpload) -> Result<SinkResponse> {
        let filename = format!("{}.{}", upload.title, upload.filetype);
        let length = upload.content.len().to_string();
        let reserved = self.call(
            "files.getUploadURLExternal",
            &[
                ("filename", filename.as_str()),
                ("length", length.as_str()),
                ("snippet_type", upload.filetype.as_str()),
            ],
        )?;
        if !reserved.ok {
            return Ok(reserved);
        }

        let (Some(upload_url), Some(file_id)) = (
            reserved.payload["upload_url"].as_str(),
            reserved.payload["file_id"].as_str(),
        ) else {
            return Ok(SinkResponse {
                ok: false,
                payload: reserved.payload.clone(),
            });
        };

        let sent = self.send_file_content(upload_url, &upload.content)?;
        if !sent.ok {
            return Ok(sent);
        }

        let files = json!([{ "id": file_id, "title": upload.title }]).to_string();
        self.call(
            "files.completeUploadExternal",
            &[
                ("files", files.as_str()),
                ("channel_id", channel.id.as_str()),
                ("initial_comment", upload.comment.as_str()),
            ],
        )
    }
}

/// Channels of one `conversations.list` page, archived ones dropped
pub fn parse_channels(payload: &Value) -> Vec<Channel> {
    payload["channels"]
        .as_array()
        .map(|channels| {
            channels
                .iter()
                .filter(|c| !c["is_archived"].as_bool().unwrap_or(false))
                .filter_map(|c| {
                    Some(Channel {
                        name: c["name"].as_str()?.to_string(),
                        id: c["id"].as_str()?.to_string(),
                        private: c["is_private"].as_bool().unwrap_or(false),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pagination cursor of a list response, empty on the last page
pub fn next_cursor(payload: &Value) -> String {
    payload["response_metadata"]["next_cursor"]
        .as_str()
        .unwrap_or("")
        .to_string()
}

pub fn channel_is_archived(payload: &Value) -> bool {
    payload["channel"]["is_archived"].as_bool().unwrap_or(false)
}
