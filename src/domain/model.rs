use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// 裝備格為空時寫入的標記
pub const EMPTY_ITEM: &str = "None";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// API 的 Quality 有時是數字有時是字串，一律轉成字串
fn quality_digit<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => default_quality(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// `null`、缺欄位與 `{}` 都視為空裝備格
fn slot_item<'de, D>(deserializer: D) -> Result<Option<EquipmentItem>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => EquipmentItem::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn default_quality() -> String {
    "0".to_string()
}

fn default_type_code() -> String {
    EMPTY_ITEM.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentItem {
    #[serde(rename = "Type", default = "default_type_code")]
    pub type_code: String,
    #[serde(
        rename = "Quality",
        default = "default_quality",
        deserialize_with = "quality_digit"
    )]
    pub quality: String,
}

impl EquipmentItem {
    pub fn new(type_code: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            type_code: type_code.into(),
            quality: quality.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    MainHand,
    OffHand,
    Head,
    Armor,
    Shoes,
    Cape,
    Mount,
}

impl SlotName {
    /// 輸出欄位順序
    pub const ALL: [SlotName; 7] = [
        SlotName::MainHand,
        SlotName::OffHand,
        SlotName::Head,
        SlotName::Armor,
        SlotName::Shoes,
        SlotName::Cape,
        SlotName::Mount,
    ];

    pub fn column_label(&self) -> &'static str {
        match self {
            SlotName::MainHand => "Main Hand",
            SlotName::OffHand => "Off Hand",
            SlotName::Head => "Head",
            SlotName::Armor => "Armor",
            SlotName::Shoes => "Shoes",
            SlotName::Cape => "Cape",
            SlotName::Mount => "Mount",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Equipment {
    #[serde(default, deserialize_with = "slot_item")]
    pub main_hand: Option<EquipmentItem>,
    #[serde(default, deserialize_with = "slot_item")]
    pub off_hand: Option<EquipmentItem>,
    #[serde(default, deserialize_with = "slot_item")]
    pub head: Option<EquipmentItem>,
    #[serde(default, deserialize_with = "slot_item")]
    pub armor: Option<EquipmentItem>,
    #[serde(default, deserialize_with = "slot_item")]
    pub shoes: Option<EquipmentItem>,
    #[serde(default, deserialize_with = "slot_item")]
    pub cape: Option<EquipmentItem>,
    #[serde(default, deserialize_with = "slot_item")]
    pub mount: Option<EquipmentItem>,
}

impl Equipment {
    pub fn slot(&self, slot: SlotName) -> Option<&EquipmentItem> {
        match slot {
            SlotName::MainHand => self.main_hand.as_ref(),
            SlotName::OffHand => self.off_hand.as_ref(),
            SlotName::Head => self.head.as_ref(),
            SlotName::Armor => self.armor.as_ref(),
            SlotName::Shoes => self.shoes.as_ref(),
            SlotName::Cape => self.cape.as_ref(),
            SlotName::Mount => self.mount.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victim {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Equipment", default, deserialize_with = "null_as_default")]
    pub equipment: Equipment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// 原始字串，寫入 Raw 表時不做任何轉換
    #[serde(rename = "TimeStamp", default)]
    pub timestamp: String,
    #[serde(rename = "Victim", default, deserialize_with = "null_as_default")]
    pub victim: Victim,
}

/// 閉區間 [start, end]，兩端皆為去除時區後的時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub timestamp: String,
    pub member_name: String,
    pub items: [String; 7],
}

impl OutputRow {
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(2 + self.items.len());
        cells.push(self.timestamp.clone());
        cells.push(self.member_name.clone());
        cells.extend(self.items.iter().cloned());
        cells
    }
}

/// 每個顯示名稱出現的次數；以名稱排序輸出
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LossCounters {
    counts: BTreeMap<String, u32>,
}

impl LossCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str) {
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: LossCounters) {
        for (name, count) in other.counts {
            *self.counts.entry(name).or_insert(0) += count;
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn sorted(&self) -> Vec<(String, u32)> {
        self.counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsPolicy {
    /// 每次執行都清空並重寫統計表，即使名單抓取失敗
    #[default]
    Always,
    /// 名單抓取失敗時保留舊的統計表
    OnSuccess,
}

/// 試算表中一列資料，以第一列標題為 key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub data: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }
}

/// 物品代碼對在地化名稱的對照表 (RawItems 工作表)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Localization {
    names: HashMap<String, String>,
}

impl Localization {
    pub fn new() -> Self {
        Self::default()
    }

    /// 代碼欄為空的列會被略過
    pub fn from_records(records: &[Record], key_column: &str, name_column: &str) -> Self {
        records
            .iter()
            .filter_map(|record| {
                let key = record.get(key_column)?;
                if key.is_empty() {
                    return None;
                }
                let name = record.get(name_column).unwrap_or("");
                Some((key.to_string(), name.to_string()))
            })
            .collect()
    }

    pub fn get(&self, type_code: &str) -> Option<&str> {
        self.names.get(type_code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, String)> for Localization {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelType {
    Text,
    PublicThread,
    PrivateThread,
    Forum,
    Other(u8),
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => ChannelType::Text,
            11 => ChannelType::PublicThread,
            12 => ChannelType::PrivateThread,
            15 => ChannelType::Forum,
            other => ChannelType::Other(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(value: ChannelType) -> Self {
        match value {
            ChannelType::Text => 0,
            ChannelType::PublicThread => 11,
            ChannelType::PrivateThread => 12,
            ChannelType::Forum => 15,
            ChannelType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub kind: ChannelType,
    pub guild_id: Option<u64>,
    pub parent_id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    pub attachment_urls: Vec<String>,
    pub timestamp: DateTime<FixedOffset>,
}

/// 論壇底下新開的討論串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadCreated {
    pub parent_channel_id: u64,
    pub parent_channel_type: ChannelType,
    pub thread_name: String,
    pub thread_id: u64,
}

/// `/read_messages` 回傳的單筆訊息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub username: String,
    pub nickname: Option<String>,
    pub content: Option<String>,
    pub image_urls: Vec<String>,
    pub timestamp: String,
}

/// 已登記的成員名稱 (去除空白並轉小寫)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn from_records(records: &[Record], column: &str) -> Self {
        records
            .iter()
            .filter_map(|record| record.get(column))
            .filter(|name| !name.trim().is_empty())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&Self::normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for AllowList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Self::normalize_name).collect(),
        }
    }
}

/// 單次執行的參數：時間區間與工作表標籤 (通常是討論串標題)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegearJob {
    pub window: TimeWindow,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDeaths {
    pub member: GuildMember,
    pub events: Vec<DeathEvent>,
}

/// extract 階段的輸出
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    /// 名單抓取失敗時為 false，此時不會有任何死亡紀錄
    pub roster_fetched: bool,
    pub members_matched: usize,
    pub members_skipped: usize,
    pub deaths: Vec<MemberDeaths>,
    pub localization: Localization,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub rows: Vec<OutputRow>,
    pub counters: LossCounters,
    pub roster_fetched: bool,
    pub members_matched: usize,
    pub members_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub roster_fetched: bool,
    pub members_matched: usize,
    pub members_skipped: usize,
    pub rows_appended: usize,
    pub statistics_written: bool,
    pub statistics: Vec<(String, u32)>,
}
