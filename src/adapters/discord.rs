use crate::domain::model::{Channel, ChannelType, ChatMessage};
use crate::domain::ports::ChatPlatform;
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::{header, Client, StatusCode};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!("DiscordBot (regear-bot, ", env!("CARGO_PKG_VERSION"), ")");

fn snowflake<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse()
        .map_err(|_| D::Error::custom(format!("invalid snowflake '{}'", raw)))
}

fn optional_snowflake<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid snowflake '{}'", raw))),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    #[serde(deserialize_with = "snowflake")]
    id: u64,
    #[serde(rename = "type")]
    kind: ChannelType,
    #[serde(default, deserialize_with = "optional_snowflake")]
    guild_id: Option<u64>,
    #[serde(default, deserialize_with = "optional_snowflake")]
    parent_id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
}

impl From<WireChannel> for Channel {
    fn from(wire: WireChannel) -> Self {
        Channel {
            id: wire.id,
            kind: wire.kind,
            guild_id: wire.guild_id,
            parent_id: wire.parent_id,
            name: wire.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireAuthor {
    #[serde(deserialize_with = "snowflake")]
    id: u64,
    username: String,
}

#[derive(Debug, Deserialize)]
struct WireAttachment {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(deserialize_with = "snowflake")]
    id: u64,
    author: WireAuthor,
    #[serde(default)]
    content: String,
    #[serde(default)]
    attachments: Vec<WireAttachment>,
    timestamp: DateTime<FixedOffset>,
}

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        ChatMessage {
            id: wire.id,
            author_id: wire.author.id,
            author_name: wire.author.username,
            content: wire.content,
            attachment_urls: wire
                .attachments
                .into_iter()
                .map(|a| a.url)
                .filter(|url| !url.is_empty())
                .collect(),
            timestamp: wire.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMember {
    #[serde(default)]
    nick: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireActiveThreads {
    #[serde(default)]
    threads: Vec<WireChannel>,
}

/// Discord REST v10 用戶端，只用到讀取類的端點
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// 404 回傳 `None`，其他非 2xx 視為錯誤
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Discord request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .query(query)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(BotError::UpstreamStatus {
                url,
                status: status.as_u16(),
            }),
        }
    }

    async fn get_required<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.get_optional(path, query)
            .await?
            .ok_or_else(|| BotError::UpstreamStatus {
                url: format!("{}{}", self.base_url, path),
                status: StatusCode::NOT_FOUND.as_u16(),
            })
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn channel(&self, channel_id: u64) -> Result<Option<Channel>> {
        let channel: Option<WireChannel> = self
            .get_optional(&format!("/channels/{}", channel_id), &[])
            .await?;
        Ok(channel.map(Channel::from))
    }

    /// 由新到舊取回全部訊息，每頁 100 筆
    async fn channel_messages(&self, channel_id: u64) -> Result<Vec<ChatMessage>> {
        let path = format!("/channels/{}/messages", channel_id);
        let mut messages: Vec<ChatMessage> = Vec::new();

        loop {
            let mut query = vec![("limit", PAGE_SIZE.to_string())];
            if let Some(oldest) = messages.last() {
                query.push(("before", oldest.id.to_string()));
            }

            let page: Vec<WireMessage> = self.get_required(&path, &query).await?;
            let page_len = page.len();
            messages.extend(page.into_iter().map(ChatMessage::from));

            if page_len < PAGE_SIZE {
                break;
            }
        }

        tracing::debug!("Fetched {} messages from channel {}", messages.len(), channel_id);
        Ok(messages)
    }

    async fn member_nickname(&self, guild_id: u64, user_id: u64) -> Result<Option<String>> {
        let member: Option<WireMember> = self
            .get_optional(&format!("/guilds/{}/members/{}", guild_id, user_id), &[])
            .await?;
        Ok(member.and_then(|m| m.nick))
    }

    async fn active_threads(&self, guild_id: u64) -> Result<Vec<Channel>> {
        let active: WireActiveThreads = self
            .get_required(&format!("/guilds/{}/threads/active", guild_id), &[])
            .await?;
        Ok(active.threads.into_iter().map(Channel::from).collect())
    }
}
