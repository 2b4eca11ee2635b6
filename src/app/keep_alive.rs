use crate::utils::error::{BotError, Result};
use reqwest::Client;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// 定期呼叫自己的 `/healthz`，避免託管平台讓服務休眠
pub struct KeepAlive {
    client: Client,
    health_url: Option<String>,
    interval: Duration,
}

impl KeepAlive {
    pub fn new(app_url: Option<&str>, interval: Duration) -> Result<Self> {
        let client = Client::builder().timeout(PING_TIMEOUT).build()?;
        Ok(Self {
            client,
            health_url: app_url.map(|url| format!("{}/healthz", url.trim_end_matches('/'))),
            interval,
        })
    }

    /// 單次 ping；回傳狀態碼
    pub async fn ping(&self) -> Result<u16> {
        let Some(url) = &self.health_url else {
            return Err(BotError::MissingConfigError {
                field: crate::config::ENV_APP_URL.to_string(),
            });
        };
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.ping().await {
                Ok(status) => tracing::info!("💓 Keep-alive ping returned {}", status),
                Err(BotError::MissingConfigError { .. }) => {
                    tracing::warn!("⚠️ APP_URL is not set; skipping keep-alive ping")
                }
                Err(e) => tracing::warn!("⚠️ Keep-alive ping failed: {}", e),
            }
        }
    }
}
