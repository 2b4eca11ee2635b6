use crate::core::ConfigProvider;
use crate::domain::model::StatisticsPolicy;
use crate::domain::ports::SheetLayout;
use crate::utils::error::{BotError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is a valid regex"));

/// 管線設定；TOML 中每個鍵都可省略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegearSettings {
    pub api_base_url: String,
    pub guild_id: String,
    pub request_timeout_seconds: u64,
    pub concurrent_requests: usize,
    pub window_hours: i64,
    pub statistics_policy: StatisticsPolicy,
    pub discord_api_base_url: String,
    pub keep_alive_interval_seconds: u64,
    pub thread_poll_interval_seconds: u64,
    pub sheets: SheetLayout,
}

impl Default for RegearSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://gameinfo-sgp.albiononline.com/api/gameinfo".to_string(),
            guild_id: "Oyx4dxj1RWGDV5Pf_o4XTg".to_string(),
            request_timeout_seconds: 30,
            concurrent_requests: 4,
            window_hours: 4,
            statistics_policy: StatisticsPolicy::Always,
            discord_api_base_url: "https://discord.com/api/v10".to_string(),
            keep_alive_interval_seconds: 60,
            thread_poll_interval_seconds: 30,
            sheets: SheetLayout::default(),
        }
    }
}

impl RegearSettings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| BotError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GUILD_ID})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_seconds)
    }

    pub fn thread_poll_interval(&self) -> Duration {
        Duration::from_secs(self.thread_poll_interval_seconds)
    }
}

impl Validate for RegearSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_base_url", &self.api_base_url)?;
        validation::validate_url("discord_api_base_url", &self.discord_api_base_url)?;
        validation::validate_non_empty_string("guild_id", &self.guild_id)?;
        validation::validate_range("request_timeout_seconds", self.request_timeout_seconds, 1, 300)?;
        validation::validate_range("concurrent_requests", self.concurrent_requests, 1, 32)?;
        validation::validate_range("window_hours", self.window_hours, 1, 24 * 7)?;
        validation::validate_range(
            "keep_alive_interval_seconds",
            self.keep_alive_interval_seconds,
            1,
            3600,
        )?;
        validation::validate_range(
            "thread_poll_interval_seconds",
            self.thread_poll_interval_seconds,
            1,
            3600,
        )?;
        validation::validate_non_empty_string("sheets.members_sheet", &self.sheets.members_sheet)?;
        validation::validate_non_empty_string("sheets.items_sheet", &self.sheets.items_sheet)?;
        Ok(())
    }
}

impl ConfigProvider for RegearSettings {
    fn guild_id(&self) -> &str {
        &self.guild_id
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn statistics_policy(&self) -> StatisticsPolicy {
        self.statistics_policy
    }

    fn sheet_layout(&self) -> &SheetLayout {
        &self.sheets
    }
}
