//! 裝備代碼正規化
//!
//! 物品代碼格式為 `T<階級>_<本體>[@<附魔等級>]`，例如 `T6_2H_CLAYMORE@2`。
//! 顯示名稱為 `{在地化名稱或本體}{階級}{.附魔} - {品質}`，
//! 代碼不符合格式時 (例如外觀道具) 退回 `{在地化名稱或空字串} - {品質}`。

use crate::domain::model::{EquipmentItem, Localization, LossCounters, EMPTY_ITEM};
use regex::Regex;
use std::sync::LazyLock;

static TYPE_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(T\d+)_?(.*?)(@\d+)?$").expect("type code pattern is a valid regex")
});

pub const QUALITY_LABELS: [(&str, &str); 5] = [
    ("1", "無"),
    ("2", "鉄"),
    ("3", "銅"),
    ("4", "銀"),
    ("5", "金"),
];

pub const UNKNOWN_QUALITY_LABEL: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCode<'a> {
    pub tier: &'a str,
    pub body: &'a str,
    /// 附魔等級，不含 `@`
    pub level: Option<&'a str>,
}

pub fn parse_type_code(code: &str) -> Option<TypeCode<'_>> {
    let caps = TYPE_CODE_PATTERN.captures(code)?;
    Some(TypeCode {
        tier: caps.get(1)?.as_str(),
        body: caps.get(2).map_or("", |m| m.as_str()),
        level: caps.get(3).map(|m| &m.as_str()[1..]),
    })
}

pub fn quality_label(quality: &str) -> &'static str {
    QUALITY_LABELS
        .iter()
        .find(|(digit, _)| *digit == quality)
        .map_or(UNKNOWN_QUALITY_LABEL, |(_, label)| *label)
}

pub struct ItemNormalizer<'a> {
    localization: &'a Localization,
}

impl<'a> ItemNormalizer<'a> {
    pub fn new(localization: &'a Localization) -> Self {
        Self { localization }
    }

    pub fn display_name(&self, item: &EquipmentItem) -> String {
        let label = quality_label(&item.quality);
        match parse_type_code(&item.type_code) {
            Some(code) => {
                let base = self
                    .localization
                    .get(&item.type_code)
                    .unwrap_or(code.body);
                let level = code.level.map(|l| format!(".{}", l)).unwrap_or_default();
                format!("{}{}{} - {}", base, code.tier, level, label)
            }
            None => {
                let base = self.localization.get(&item.type_code).unwrap_or("");
                format!("{} - {}", base, label)
            }
        }
    }

    /// 空格回傳 `"None"` 且不計數；其餘每呼叫一次計數加一
    pub fn normalize(&self, item: Option<&EquipmentItem>, counters: &mut LossCounters) -> String {
        match item {
            None => EMPTY_ITEM.to_string(),
            Some(item) => {
                let name = self.display_name(item);
                counters.record(&name);
                name
            }
        }
    }
}
