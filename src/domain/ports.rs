use crate::domain::model::{
    Channel, ChatMessage, DeathEvent, Extracted, GuildMember, Record, RegearJob, RunReport,
    StatisticsPolicy, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 遊戲公開統計 API
pub trait StatsApi: Send + Sync {
    fn guild_members(
        &self,
        guild_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<GuildMember>>> + Send;
    fn player_deaths(
        &self,
        player_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<DeathEvent>>> + Send;
}

/// 以工作表名稱存取的表格儲存 (試算表)
pub trait SheetStore: Send + Sync {
    fn has_worksheet(&self, name: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    fn create_worksheet(&self, name: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_rows(
        &self,
        name: &str,
        rows: &[Vec<String>],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn clear(&self, name: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 工作表不存在時回傳 `WorksheetNotFound`
    fn get_all_records(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Record>>> + Send;
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn channel(&self, channel_id: u64) -> Result<Option<Channel>>;
    async fn channel_messages(&self, channel_id: u64) -> Result<Vec<ChatMessage>>;
    async fn member_nickname(&self, guild_id: u64, user_id: u64) -> Result<Option<String>>;
    async fn active_threads(&self, guild_id: u64) -> Result<Vec<Channel>>;
}

/// 參考資料工作表的名稱與欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub members_sheet: String,
    pub members_column: String,
    pub items_sheet: String,
    pub items_key_column: String,
    pub items_name_column: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            members_sheet: "Members".to_string(),
            members_column: "Guild Members".to_string(),
            items_sheet: "RawItems".to_string(),
            items_key_column: "Unique Item Name".to_string(),
            items_name_column: "Base Item Name".to_string(),
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn guild_id(&self) -> &str;
    fn concurrent_requests(&self) -> usize;
    fn statistics_policy(&self) -> StatisticsPolicy;
    fn sheet_layout(&self) -> &SheetLayout;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, job: &RegearJob) -> Result<Extracted>;
    async fn transform(&self, job: &RegearJob, data: Extracted) -> Result<TransformResult>;
    async fn load(&self, job: &RegearJob, result: TransformResult) -> Result<RunReport>;
}
