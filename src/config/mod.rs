#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;

use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
pub use settings::RegearSettings;

pub const ENV_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_FORUM_CHANNEL_ID: &str = "FORUM_CHANNEL_ID";
pub const ENV_APP_URL: &str = "APP_URL";
pub const ENV_WORKBOOK_DIR: &str = "REGEAR_WORKBOOK_DIR";
pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// 常駐模式的設定，啟動時從環境變數讀取一次
#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub forum_channel_id: u64,
    pub app_url: Option<String>,
    pub workbook_dir: String,
    pub listen_addr: String,
    pub settings: RegearSettings,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("forum_channel_id", &self.forum_channel_id)
            .field("app_url", &self.app_url)
            .field("workbook_dir", &self.workbook_dir)
            .field("listen_addr", &self.listen_addr)
            .field("settings", &self.settings)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env(settings: RegearSettings) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), settings)
    }

    /// 缺少必要值時立即失敗；空字串視同未設定
    pub fn from_lookup<F>(lookup: F, settings: RegearSettings) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = read(ENV_BOT_TOKEN);
        let discord_token = validation::validate_required_field(ENV_BOT_TOKEN, &discord_token)?;

        let forum_channel_id = read(ENV_FORUM_CHANNEL_ID);
        let forum_channel_id = validation::parse_snowflake(
            ENV_FORUM_CHANNEL_ID,
            validation::validate_required_field(ENV_FORUM_CHANNEL_ID, &forum_channel_id)?,
        )?;

        let workbook_dir = read(ENV_WORKBOOK_DIR);
        let workbook_dir = validation::validate_required_field(ENV_WORKBOOK_DIR, &workbook_dir)?;

        Ok(Self {
            discord_token: discord_token.clone(),
            forum_channel_id,
            app_url: read(ENV_APP_URL).map(|url| url.trim_end_matches('/').to_string()),
            workbook_dir: workbook_dir.clone(),
            listen_addr: read(ENV_LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            settings,
        })
    }
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string(ENV_BOT_TOKEN, &self.discord_token)?;
        validation::validate_path(ENV_WORKBOOK_DIR, &self.workbook_dir)?;
        validation::validate_socket_addr(ENV_LISTEN_ADDR, &self.listen_addr)?;
        if let Some(app_url) = &self.app_url {
            validation::validate_url(ENV_APP_URL, app_url)?;
        }
        self.settings.validate()?;

        tracing::info!("✅ Bot configuration validation passed");
        Ok(())
    }
}
