use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;

pub const TIMES_UP_LABEL: &str = "time's up";
pub const INVALID_DEADLINE_LABEL: &str = "invalid deadline";
/// 最初のティック前に表示するラベル
pub const CALCULATING_LABEL: &str = "calculating...";

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// 締め切りまでの残り時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining { hours: i64, minutes: i64, seconds: i64 },
    TimesUp,
    InvalidDeadline,
}

impl Countdown {
    /// 締め切り文字列と現在時刻から毎回計算し直す（減算による更新はしない）
    pub fn until(deadline: &str, now: DateTime<Utc>) -> Self {
        match parse_deadline(deadline) {
            Some(deadline) => Self::from_millis((deadline - now).num_milliseconds()),
            None => Countdown::InvalidDeadline,
        }
    }

    pub fn from_millis(diff_ms: i64) -> Self {
        if diff_ms <= 0 {
            return Countdown::TimesUp;
        }
        Countdown::Remaining {
            hours: diff_ms / MS_PER_HOUR,
            minutes: (diff_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (diff_ms % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Countdown::TimesUp)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Remaining {
                hours,
                minutes,
                seconds,
            } => write!(f, "{hours} hours {minutes} minutes {seconds} seconds"),
            Countdown::TimesUp => f.write_str(TIMES_UP_LABEL),
            Countdown::InvalidDeadline => f.write_str(INVALID_DEADLINE_LABEL),
        }
    }
}

/// 締め切り文字列を解釈する
///
/// - オフセット付き RFC 3339 はそのまま
/// - `YYYY-MM-DDTHH:MM[:SS]` などオフセットなしはローカル時刻
/// - 日付のみ `YYYY-MM-DD` は UTC の 0 時
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_to_utc(naive);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    // 夏時間の切り替えで存在しない時刻は 1 時間後ろへずらす
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// 一覧表示用の締め切り表記（解釈できなければ入力のまま）
pub fn format_deadline(raw: &str) -> String {
    match parse_deadline(raw) {
        Some(deadline) => deadline
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => raw.to_string(),
    }
}
