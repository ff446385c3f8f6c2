//! Just enough of the LINE Messaging API: webhook payloads in, text replies
//! and pushes out, plus the profile lookup for display names.

use std::future::Future;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LineError;

/// LINE rejects requests carrying more than five messages.
pub const MAX_MESSAGES_PER_REQUEST: usize = 5;

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WebhookEvent {
    Message {
        reply_token: Option<String>,
        source: Source,
        message: MessageContent,
    },
    Follow {
        reply_token: Option<String>,
        source: Source,
    },
    Postback {
        reply_token: Option<String>,
        source: Source,
        postback: Postback,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub data: String,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    display_name: String,
}

fn text_messages(messages: &[String]) -> Vec<TextMessage<'_>> {
    messages
        .iter()
        .take(MAX_MESSAGES_PER_REQUEST)
        .map(|text| TextMessage { kind: "text", text })
        .collect()
}

/// Outbound text messaging. Failures are reported, never retried.
pub trait Messenger: Send + Sync + 'static {
    fn reply(
        &self,
        reply_token: &str,
        messages: &[String],
    ) -> impl Future<Output = Result<(), LineError>> + Send;

    fn push(
        &self,
        to: &str,
        messages: &[String],
    ) -> impl Future<Output = Result<(), LineError>> + Send;

    /// The user's current LINE display name.
    fn display_name(&self, user_id: &str) -> impl Future<Output = Result<String, LineError>> + Send;
}

pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl LineClient {
    pub fn new(api_base: &str, access_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<(), LineError> {
        let url = format!("{}{}", self.api_base, path);
        debug!("POST {url}");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LineError> {
        let url = format!("{}{}", self.api_base, path);
        debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LineError::Status {
        status: status.as_u16(),
        body,
    })
}

impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, messages: &[String]) -> Result<(), LineError> {
        let request = ReplyRequest {
            reply_token,
            messages: text_messages(messages),
        };
        self.post("/v2/bot/message/reply", &request).await
    }

    async fn push(&self, to: &str, messages: &[String]) -> Result<(), LineError> {
        let request = PushRequest {
            to,
            messages: text_messages(messages),
        };
        self.post("/v2/bot/message/push", &request).await
    }

    async fn display_name(&self, user_id: &str) -> Result<String, LineError> {
        let profile: Profile = self.get(&format!("/v2/bot/profile/{user_id}")).await?;
        Ok(profile.display_name)
    }
}
