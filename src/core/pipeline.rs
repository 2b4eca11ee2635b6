use crate::core::normalize::ItemNormalizer;
use crate::core::sink;
use crate::core::window::parse_naive_instant;
use crate::domain::model::{
    AllowList, DeathEvent, Extracted, GuildMember, Localization, LossCounters, MemberDeaths,
    OutputRow, RegearJob, RunReport, SlotName, StatisticsPolicy, TransformResult,
};
use crate::domain::ports::{ConfigProvider, Pipeline, SheetStore, StatsApi};
use crate::utils::error::Result;
use futures_util::future::join_all;

/// 名單 → 成員過濾 → 死亡紀錄 → 時間過濾 → 裝備正規化 → 寫入工作表
pub struct RegearPipeline<A: StatsApi, S: SheetStore, C: ConfigProvider> {
    api: A,
    store: S,
    config: C,
}

impl<A: StatsApi, S: SheetStore, C: ConfigProvider> RegearPipeline<A, S, C> {
    pub fn new(api: A, store: S, config: C) -> Self {
        Self { api, store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_reference_data(&self) -> Result<(AllowList, Localization)> {
        let layout = self.config.sheet_layout();

        let members = self.store.get_all_records(&layout.members_sheet).await?;
        let allow_list = AllowList::from_records(&members, &layout.members_column);

        let items = self.store.get_all_records(&layout.items_sheet).await?;
        let localization = Localization::from_records(
            &items,
            &layout.items_key_column,
            &layout.items_name_column,
        );

        tracing::info!(
            "📋 Loaded {} known members and {} item names",
            allow_list.len(),
            localization.len()
        );
        Ok((allow_list, localization))
    }

    async fn fetch_member_deaths(
        &self,
        member: GuildMember,
    ) -> (GuildMember, Result<Vec<DeathEvent>>) {
        tracing::info!("🔎 Processing player: {}", member.name);
        let deaths = self.api.player_deaths(&member.id).await;
        (member, deaths)
    }
}

#[async_trait::async_trait]
impl<A: StatsApi, S: SheetStore, C: ConfigProvider> Pipeline for RegearPipeline<A, S, C> {
    async fn extract(&self, job: &RegearJob) -> Result<Extracted> {
        let (allow_list, localization) = self.load_reference_data().await?;

        tracing::debug!("Fetching roster for guild {} ({})", self.config.guild_id(), job.label);
        let roster = match self.api.guild_members(self.config.guild_id()).await {
            Ok(roster) => roster,
            Err(e) => {
                // 名單失敗直接結束本次處理，不往下抓死亡紀錄
                tracing::error!("❌ Unable to fetch guild roster: {}", e);
                return Ok(Extracted {
                    roster_fetched: false,
                    localization,
                    ..Extracted::default()
                });
            }
        };

        // 先過濾再抓死亡紀錄，API 呼叫數 = 名單 ∩ 已登記成員
        let matched: Vec<GuildMember> = roster
            .into_iter()
            .map(|member| GuildMember {
                name: member.name.trim().to_string(),
                ..member
            })
            .filter(|member| allow_list.contains(&member.name))
            .collect();
        let members_matched = matched.len();
        tracing::info!("👥 {} roster members are on the member list", members_matched);

        let mut deaths = Vec::with_capacity(matched.len());
        let mut members_skipped = 0;
        for chunk in matched.chunks(self.config.concurrent_requests().max(1)) {
            let fetched = join_all(
                chunk
                    .iter()
                    .cloned()
                    .map(|member| self.fetch_member_deaths(member)),
            )
            .await;

            for (member, result) in fetched {
                match result {
                    Ok(events) => deaths.push(MemberDeaths { member, events }),
                    Err(e) => {
                        tracing::error!(
                            "❌ Error fetching death history for {}: {}",
                            member.name,
                            e
                        );
                        members_skipped += 1;
                    }
                }
            }
        }

        Ok(Extracted {
            roster_fetched: true,
            members_matched,
            members_skipped,
            deaths,
            localization,
        })
    }

    async fn transform(&self, job: &RegearJob, data: Extracted) -> Result<TransformResult> {
        let normalizer = ItemNormalizer::new(&data.localization);
        let mut counters = LossCounters::new();
        let mut rows = Vec::new();

        for MemberDeaths { member, events } in &data.deaths {
            let mut member_counters = LossCounters::new();

            for event in events {
                let Some(instant) = parse_naive_instant(&event.timestamp) else {
                    tracing::warn!(
                        "⚠️ Skipping death of {} with unreadable timestamp '{}'",
                        member.name,
                        event.timestamp
                    );
                    continue;
                };
                if !job.window.contains(instant) {
                    continue;
                }

                let equipment = &event.victim.equipment;
                let items = SlotName::ALL
                    .map(|slot| normalizer.normalize(equipment.slot(slot), &mut member_counters));
                rows.push(OutputRow {
                    timestamp: event.timestamp.clone(),
                    member_name: member.name.clone(),
                    items,
                });
            }

            counters.merge(member_counters);
        }

        tracing::debug!("Normalized {} deaths into {} item names", rows.len(), counters.len());
        Ok(TransformResult {
            rows,
            counters,
            roster_fetched: data.roster_fetched,
            members_matched: data.members_matched,
            members_skipped: data.members_skipped,
        })
    }

    async fn load(&self, job: &RegearJob, result: TransformResult) -> Result<RunReport> {
        let rows_appended = sink::append_raw_rows(&self.store, &job.label, &result.rows).await?;

        let statistics_written = result.roster_fetched
            || self.config.statistics_policy() == StatisticsPolicy::Always;
        if statistics_written {
            sink::rewrite_statistics(&self.store, &job.label, &result.counters).await?;
        } else {
            tracing::warn!(
                "⚠️ Roster unavailable, keeping previous statistics for '{}'",
                job.label
            );
        }

        Ok(RunReport {
            roster_fetched: result.roster_fetched,
            members_matched: result.members_matched,
            members_skipped: result.members_skipped,
            rows_appended,
            statistics_written,
            statistics: result.counters.sorted(),
        })
    }
}
