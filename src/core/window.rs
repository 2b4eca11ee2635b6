use crate::domain::model::TimeWindow;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 解析 ISO-8601 時間並直接丟棄時區 (保留原本的牆上時間，不換算)
pub fn parse_naive_instant(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// 從現在往回推 `hours` 小時的區間 (UTC)；超出日期範圍時回傳 `None`
pub fn trailing_window(now: NaiveDateTime, hours: i64) -> Option<TimeWindow> {
    let start = now.checked_sub_signed(TimeDelta::try_hours(hours)?)?;
    Some(TimeWindow::new(start, now))
}

pub fn trailing_window_from_now(hours: i64) -> Option<TimeWindow> {
    trailing_window(Utc::now().naive_utc(), hours)
}
