use crate::domain::model::{DeathEvent, GuildMember};
use crate::domain::ports::StatsApi;
use crate::utils::error::{BotError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 遊戲公開 API (gameinfo) 的用戶端；每個請求都有逾時，不重試
#[derive(Debug, Clone)]
pub struct AlbionClient {
    client: Client,
    base_url: String,
}

impl AlbionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_array(&self, url: &str) -> Result<Vec<serde_json::Value>> {
        tracing::debug!("Making API request to: {}", url);
        let response = self.client.get(url).send().await?;
        tracing::debug!("API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(BotError::UpstreamStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        match response.json::<serde_json::Value>().await? {
            serde_json::Value::Array(items) => Ok(items),
            other => Err(BotError::UnexpectedResponse {
                url: url.to_string(),
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// 形狀不對的單筆資料直接略過
fn decode_each<T: DeserializeOwned>(items: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("⚠️ Skipping malformed {} entry: {}", what, e);
                None
            }
        })
        .collect()
}

impl StatsApi for AlbionClient {
    async fn guild_members(&self, guild_id: &str) -> Result<Vec<GuildMember>> {
        let url = format!("{}/guilds/{}/members", self.base_url, guild_id);
        let items = self.get_array(&url).await?;
        Ok(decode_each(items, "guild member"))
    }

    async fn player_deaths(&self, player_id: &str) -> Result<Vec<DeathEvent>> {
        let url = format!("{}/players/{}/deaths", self.base_url, player_id);
        let items = self.get_array(&url).await?;
        Ok(decode_each(items, "death event"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> AlbionClient {
        AlbionClient::new(server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_guild_members_success() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/guilds/G1/members");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"Id": "p1", "Name": "Alice", "KillFame": 10},
                    {"Id": "p2", "Name": "Bob"},
                    {"Id": "p3"}
                ]));
        });

        let members = client_for(&server).guild_members("G1").await.unwrap();

        api_mock.assert();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, "p1");
        assert_eq!(members[1].name, "Bob");
    }

    #[tokio::test]
    async fn test_guild_members_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/guilds/G1/members");
            then.status(503);
        });

        let err = client_for(&server).guild_members("G1").await.unwrap_err();
        assert!(matches!(err, BotError::UpstreamStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_guild_members_unexpected_shape() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/guilds/G1/members");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"error": "busy"}));
        });

        let err = client_for(&server).guild_members("G1").await.unwrap_err();
        assert!(matches!(err, BotError::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_player_deaths_decoding() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/players/p1/deaths");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {
                        "TimeStamp": "2024-01-01T02:00:00Z",
                        "Victim": {"Name": "Alice", "Equipment": {
                            "MainHand": {"Type": "T4_MAIN_SWORD", "Quality": 3},
                            "Mount": null
                        }}
                    },
                    {"TimeStamp": 12345}
                ]));
        });

        let deaths = client_for(&server).player_deaths("p1").await.unwrap();

        api_mock.assert();
        assert_eq!(deaths.len(), 1);
        assert_eq!(deaths[0].timestamp, "2024-01-01T02:00:00Z");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/players/p1/deaths");
            then.status(200).json_body(serde_json::json!([]));
        });

        let client = AlbionClient::new(format!("{}/", server.base_url()), Duration::from_secs(5))
            .unwrap();
        assert!(client.player_deaths("p1").await.unwrap().is_empty());
        api_mock.assert();
    }
}
