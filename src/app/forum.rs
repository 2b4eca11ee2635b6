use crate::core::etl::RegearEngine;
use crate::core::window::trailing_window_from_now;
use crate::core::Pipeline;
use crate::domain::model::{Channel, ChannelType, RegearJob, RunReport, ThreadCreated};
use crate::domain::ports::ChatPlatform;
use crate::utils::error::{BotError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Discord snowflake 的起算時間 (2015-01-01T00:00:00Z)，毫秒
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

pub fn snowflake_created_at_ms(id: u64) -> i64 {
    (id >> 22) as i64 + DISCORD_EPOCH_MS
}

/// 論壇有新討論串時，在背景跑一次補裝紀錄
pub struct ForumTrigger<P: Pipeline + 'static> {
    forum_channel_id: u64,
    engine: Arc<RegearEngine<P>>,
    window_hours: i64,
}

impl<P: Pipeline + 'static> ForumTrigger<P> {
    pub fn new(forum_channel_id: u64, engine: Arc<RegearEngine<P>>, window_hours: i64) -> Self {
        Self {
            forum_channel_id,
            engine,
            window_hours,
        }
    }

    /// 不等待執行結果；不是目標論壇時回傳 `None`
    pub fn handle(&self, event: ThreadCreated) -> Option<JoinHandle<Result<RunReport>>> {
        if event.parent_channel_type != ChannelType::Forum
            || event.parent_channel_id != self.forum_channel_id
        {
            tracing::debug!(
                "Ignoring thread {} from channel {}",
                event.thread_id,
                event.parent_channel_id
            );
            return None;
        }

        tracing::info!("📝 New forum post '{}' ({})", event.thread_name, event.thread_id);
        let Some(window) = trailing_window_from_now(self.window_hours) else {
            tracing::error!(
                "❌ Cannot build a {} hour window for '{}'",
                self.window_hours,
                event.thread_name
            );
            return None;
        };
        let job = RegearJob {
            window,
            label: event.thread_name,
        };
        let engine = Arc::clone(&self.engine);

        Some(tokio::spawn(async move {
            let result = engine.run(&job).await;
            match &result {
                Ok(report) => tracing::info!(
                    "✅ Recorded {} losses for '{}' (roster fetched: {})",
                    report.rows_appended,
                    job.label,
                    report.roster_fetched
                ),
                Err(e) => tracing::error!(
                    "❌ Regear run '{}' failed: {} ({})",
                    job.label,
                    e,
                    e.recovery_suggestion()
                ),
            }
            result
        }))
    }
}

/// 以輪詢活躍討論串取代 gateway 事件
pub struct ThreadWatcher {
    chat: Arc<dyn ChatPlatform>,
    forum_channel_id: u64,
    interval: Duration,
    started_at_ms: i64,
    seen: HashSet<u64>,
}

impl ThreadWatcher {
    pub fn new(chat: Arc<dyn ChatPlatform>, forum_channel_id: u64, interval: Duration) -> Self {
        Self::starting_at(chat, forum_channel_id, interval, Utc::now().timestamp_millis())
    }

    pub fn starting_at(
        chat: Arc<dyn ChatPlatform>,
        forum_channel_id: u64,
        interval: Duration,
        started_at_ms: i64,
    ) -> Self {
        Self {
            chat,
            forum_channel_id,
            interval,
            started_at_ms,
            seen: HashSet::new(),
        }
    }

    /// 論壇頻道必須存在且屬於某個伺服器
    pub async fn resolve_forum(&self) -> Result<Channel> {
        let forum = self
            .chat
            .channel(self.forum_channel_id)
            .await?
            .ok_or_else(|| BotError::InvalidConfigValueError {
                field: crate::config::ENV_FORUM_CHANNEL_ID.to_string(),
                value: self.forum_channel_id.to_string(),
                reason: "channel not found or not visible to the bot".to_string(),
            })?;

        if forum.guild_id.is_none() {
            return Err(BotError::InvalidConfigValueError {
                field: crate::config::ENV_FORUM_CHANNEL_ID.to_string(),
                value: self.forum_channel_id.to_string(),
                reason: "channel does not belong to a guild".to_string(),
            });
        }
        if forum.kind != ChannelType::Forum {
            tracing::warn!(
                "⚠️ Channel {} is not a forum (type {}); no posts will trigger a run",
                forum.id,
                u8::from(forum.kind)
            );
        }
        Ok(forum)
    }

    /// 挑出啟動後才建立、且尚未處理過的討論串
    pub fn new_threads(&mut self, forum: &Channel, threads: Vec<Channel>) -> Vec<ThreadCreated> {
        // 只記住仍在活躍清單上的討論串
        let active: HashSet<u64> = threads.iter().map(|thread| thread.id).collect();
        self.seen.retain(|id| active.contains(id));

        let mut created = Vec::new();
        for thread in threads {
            if thread.parent_id != Some(forum.id)
                || snowflake_created_at_ms(thread.id) < self.started_at_ms
                || !self.seen.insert(thread.id)
            {
                continue;
            }
            created.push(ThreadCreated {
                parent_channel_id: forum.id,
                parent_channel_type: forum.kind,
                thread_name: thread.name.unwrap_or_default(),
                thread_id: thread.id,
            });
        }
        created
    }

    pub async fn poll(&mut self, forum: &Channel) -> Result<Vec<ThreadCreated>> {
        let guild_id = forum.guild_id.ok_or_else(|| BotError::ProcessingError {
            message: format!("forum channel {} has no guild", forum.id),
        })?;
        let threads = self.chat.active_threads(guild_id).await?;
        Ok(self.new_threads(forum, threads))
    }

    /// 只有論壇解析失敗時才會回傳
    pub async fn run<F>(mut self, mut on_thread: F) -> Result<()>
    where
        F: FnMut(ThreadCreated),
    {
        let forum = self.resolve_forum().await?;
        tracing::info!(
            "👀 Watching forum {} every {:?}",
            forum.name.as_deref().unwrap_or("<unnamed>"),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.poll(&forum).await {
                Ok(events) => events.into_iter().for_each(&mut on_thread),
                Err(e) => tracing::warn!("⚠️ Thread poll failed: {}", e),
            }
        }
    }
}
