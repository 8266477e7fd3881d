use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use slack_morphism::prelude::*;
use tracing::debug;

use crate::message::{FetchWindow, Message};
use crate::{AppError, Result};

/// Conversation listing category. `conversations.list` only returns the
/// types it is asked for, so lookups walk these one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationCategory {
    Public,
    Private,
    /// Group and one-to-one direct messages
    Direct,
}

impl ConversationCategory {
    pub const DEFAULT_ORDER: [ConversationCategory; 3] = [
        ConversationCategory::Public,
        ConversationCategory::Private,
        ConversationCategory::Direct,
    ];
}

impl fmt::Display for ConversationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversationCategory::Public => "public_channel",
            ConversationCategory::Private => "private_channel",
            ConversationCategory::Direct => "mpim,im",
        })
    }
}

/// One entry of a conversations listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// The other party of a direct message
    #[serde(default)]
    pub user: Option<String>,
}

impl ConversationEntry {
    pub fn matches(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name) || self.user.as_deref() == Some(name)
    }
}

/// A single page of a cursor-paginated response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
            next_cursor: None,
        }
    }

    /// Cursor to request the following page with, if there is one.
    /// Slack signals the last page with an empty cursor as often as with none.
    pub fn next(&self) -> Option<&str> {
        match self.next_cursor.as_deref() {
            Some(cursor) if self.has_more && !cursor.is_empty() => Some(cursor),
            _ => None,
        }
    }
}

/// The three conversation endpoints the thread pipeline consumes.
///
/// Each call fetches exactly one page; pagination is driven by the caller.
pub trait ConversationsApi: Send + Sync + 'static {
    fn list_conversations(
        &self,
        category: ConversationCategory,
        cursor: Option<String>,
        limit: u16,
    ) -> impl Future<Output = Result<Page<ConversationEntry>>> + Send;

    fn history(
        &self,
        channel_id: &str,
        window: &FetchWindow,
        cursor: Option<String>,
        limit: u16,
    ) -> impl Future<Output = Result<Page<Message>>> + Send;

    fn replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        cursor: Option<String>,
    ) -> impl Future<Output = Result<Page<Message>>> + Send;
}

/// `ConversationsApi` backed by the Slack Web API.
///
/// Responses are decoded straight into this crate's types rather than
/// slack-morphism's models: those drop the `user` of direct-message listings
/// and any message field they do not model.
pub struct SlackConversationsApi {
    client: SlackHyperClient,
    token: SlackApiToken,
}

impl SlackConversationsApi {
    pub fn new(token: &str) -> Result<Self> {
        let connector =
            SlackClientHyperConnector::new().map_err(|e| AppError::SlackApi(e.to_string()))?;

        Ok(Self {
            client: SlackClient::new(connector),
            token: SlackApiToken::new(SlackApiTokenValue(token.to_string())),
        })
    }
}

impl ConversationsApi for SlackConversationsApi {
    async fn list_conversations(
        &self,
        category: ConversationCategory,
        cursor: Option<String>,
        limit: u16,
    ) -> Result<Page<ConversationEntry>> {
        debug!(%category, has_cursor = cursor.is_some(), "conversations.list");
        let session = self.client.open_session(&self.token);

        let params: Vec<(&str, Option<String>)> = vec![
            ("types", Some(category.to_string())),
            ("limit", Some(limit.to_string())),
            ("cursor", cursor),
        ];

        let response: ListResponse = session
            .http_session_api
            .http_get("conversations.list", &params, None)
            .await
            .map_err(|e| AppError::SlackApi(e.to_string()))?;

        Ok(response.into())
    }

    async fn history(
        &self,
        channel_id: &str,
        window: &FetchWindow,
        cursor: Option<String>,
        limit: u16,
    ) -> Result<Page<Message>> {
        debug!(channel_id, has_cursor = cursor.is_some(), "conversations.history");
        let session = self.client.open_session(&self.token);

        let params: Vec<(&str, Option<String>)> = vec![
            ("channel", Some(channel_id.to_string())),
            ("oldest", Some(window.oldest().to_slack_ts())),
            ("latest", Some(window.latest().to_slack_ts())),
            ("inclusive", Some("true".to_string())),
            ("limit", Some(limit.to_string())),
            ("cursor", cursor),
        ];

        let response: MessagesResponse = session
            .http_session_api
            .http_get("conversations.history", &params, None)
            .await
            .map_err(|e| AppError::SlackApi(e.to_string()))?;

        Ok(response.into())
    }

    async fn replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        cursor: Option<String>,
    ) -> Result<Page<Message>> {
        debug!(
            channel_id,
            thread_ts,
            has_cursor = cursor.is_some(),
            "conversations.replies"
        );
        let session = self.client.open_session(&self.token);

        let params: Vec<(&str, Option<String>)> = vec![
            ("channel", Some(channel_id.to_string())),
            ("ts", Some(thread_ts.to_string())),
            ("cursor", cursor),
        ];

        let response: MessagesResponse = session
            .http_session_api
            .http_get("conversations.replies", &params, None)
            .await
            .map_err(|e| AppError::SlackApi(e.to_string()))?;

        Ok(response.into())
    }
}

/// `conversations.list` body. `ok`/`error` are checked by the connector.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    channels: Vec<ConversationEntry>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

/// `conversations.history` and `conversations.replies` body.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    has_more: Option<bool>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

impl From<ListResponse> for Page<ConversationEntry> {
    fn from(response: ListResponse) -> Self {
        // conversations.list has no has_more flag; a non-empty cursor is the signal
        let next_cursor = cursor_of(response.response_metadata);
        Page {
            items: response.channels,
            has_more: next_cursor.is_some(),
            next_cursor,
        }
    }
}

impl From<MessagesResponse> for Page<Message> {
    fn from(response: MessagesResponse) -> Self {
        Page {
            items: response.messages,
            has_more: response.has_more.unwrap_or(false),
            next_cursor: cursor_of(response.response_metadata),
        }
    }
}

fn cursor_of(metadata: Option<ResponseMetadata>) -> Option<String> {
    metadata
        .and_then(|meta| meta.next_cursor)
        .filter(|cursor| !cursor.is_empty())
}
