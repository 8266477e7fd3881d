use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A Slack message as returned by the history and replies endpoints.
///
/// Only the fields the thread pipeline looks at are typed; everything else
/// (blocks, files, reactions, bot metadata...) is carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Slack timestamp, e.g. "1767636991.559059". Unique within a channel.
    pub ts: String,
    /// Timestamp of the thread root. Equal to `ts` on the root itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Only present on thread roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Might not exist for bots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub fn new(ts: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            ts: ts.into(),
            thread_ts: None,
            reply_count: None,
            text: Some(text.into()),
            user: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Key of the thread this message belongs to: `thread_ts` when set, else `ts`.
    pub fn thread_key(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    /// Root timestamp of a thread worth expanding, if this message is the root
    /// of a thread that reports at least one reply.
    pub fn expandable_thread(&self) -> Option<&str> {
        match (&self.thread_ts, self.reply_count) {
            (Some(thread_ts), Some(count)) if count > 0 => Some(thread_ts),
            _ => None,
        }
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Numeric value of a Slack timestamp.
///
/// Slack encodes timestamps as `seconds.fraction` decimal strings. They are
/// parsed exactly instead of going through `f64` so that ordering never
/// depends on rounding, and never on string comparison ("999.1" < "1000.0").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            secs: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Slack wire format with microsecond precision.
    pub fn to_slack_ts(&self) -> String {
        format!("{}.{:06}", self.secs, self.nanos / 1_000)
    }

    pub fn to_local(&self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp(self.secs, self.nanos).map(|dt| dt.with_timezone(&Local))
    }
}

impl FromStr for Timestamp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::InvalidTimestamp(s.to_string());
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) || fraction.len() > 9 {
            return Err(invalid());
        }

        let secs = whole.parse::<i64>().map_err(|_| invalid())?;
        let nanos = if fraction.is_empty() {
            0
        } else {
            format!("{:0<9}", fraction)
                .parse::<u32>()
                .map_err(|_| invalid())?
        };

        Ok(Self { secs, nanos })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_slack_ts())
    }
}

/// Inclusive `[start, end]` range of local wall-clock time to fetch history for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl FetchWindow {
    /// Window covering `duration_days` full days before `end_date` plus the
    /// whole of `end_date` itself, up to 23:59:59.999999.
    pub fn ending_on(end_date: NaiveDate, duration_days: u32) -> Result<Self> {
        let end = end_date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .ok_or_else(|| AppError::InvalidDate(end_date.to_string()))?;
        let start = end_date
            .checked_sub_days(Days::new(duration_days.into()))
            .ok_or(AppError::InvalidDuration(duration_days))?
            .and_time(NaiveTime::MIN);

        Ok(Self { start, end })
    }

    /// Value for the `oldest` history parameter.
    pub fn oldest(&self) -> Timestamp {
        local_timestamp(self.start)
    }

    /// Value for the `latest` history parameter.
    pub fn latest(&self) -> Timestamp {
        local_timestamp(self.end)
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn local_timestamp(dt: NaiveDateTime) -> Timestamp {
    // Wall-clock times skipped by a DST jump have no local mapping.
    match Local.from_local_datetime(&dt).earliest() {
        Some(local) => Timestamp::from_datetime(&local),
        None => Timestamp::from_datetime(&dt.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_message_deserialize_passes_extra_fields_through() {
        let json = r#"{
            "ts": "1704844800.000100",
            "thread_ts": "1704844800.000100",
            "reply_count": 2,
            "text": "hello",
            "user": "U123",
            "channel": "C42",
            "reactions": [{"name": "wave", "count": 1}]
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();

        assert_eq!(msg.ts, "1704844800.000100");
        assert_eq!(msg.thread_ts.as_deref(), Some("1704844800.000100"));
        assert_eq!(msg.reply_count, Some(2));
        assert_eq!(msg.user.as_deref(), Some("U123"));
        assert_eq!(msg.extra["channel"], "C42");
        assert!(msg.extra.contains_key("reactions"));

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["channel"], "C42");
        assert_eq!(back["reply_count"], 2);
    }

    #[test]
    fn test_message_deserialize_requires_ts() {
        let result: std::result::Result<Message, _> = serde_json::from_str(r#"{"text": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_thread_key_prefers_thread_ts() {
        let mut msg = Message::new("2.0", "reply");
        assert_eq!(msg.thread_key(), "2.0");

        msg.thread_ts = Some("1.0".to_string());
        assert_eq!(msg.thread_key(), "1.0");
    }

    #[test]
    fn test_expandable_thread() {
        let mut msg = Message::new("1.0", "root");
        assert_eq!(msg.expandable_thread(), None);

        msg.thread_ts = Some("1.0".to_string());
        msg.reply_count = Some(0);
        assert_eq!(msg.expandable_thread(), None);

        msg.reply_count = Some(3);
        assert_eq!(msg.expandable_thread(), Some("1.0"));

        msg.thread_ts = None;
        assert_eq!(msg.expandable_thread(), None);
    }

    #[test]
    fn test_timestamp_parse() {
        let ts: Timestamp = "1704844800.000100".parse().unwrap();
        assert_eq!(ts.secs(), 1704844800);
        assert_eq!(ts.to_slack_ts(), "1704844800.000100");

        let whole: Timestamp = "42".parse().unwrap();
        assert_eq!(whole.to_slack_ts(), "42.000000");
    }

    #[test]
    fn test_timestamp_parse_rejects_garbage() {
        for input in ["", ".5", "abc", "1.2.3", "-1.0", "1.0000000001", "1e9"] {
            assert!(
                matches!(input.parse::<Timestamp>(), Err(AppError::InvalidTimestamp(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_timestamp_orders_numerically() {
        let small: Timestamp = "999.9".parse().unwrap();
        let large: Timestamp = "1000.1".parse().unwrap();
        assert!(small < large);
        assert!("999.9" > "1000.1");

        let a: Timestamp = "10.5".parse().unwrap();
        let b: Timestamp = "10.500000".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_timestamp_from_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap()
            .and_utc();

        assert_eq!(Timestamp::from_datetime(&dt).to_slack_ts(), "1704931199.999999");
    }

    #[test]
    fn test_timestamp_to_local_roundtrips_instant() {
        let ts: Timestamp = "1704844800.5".parse().unwrap();
        let local = ts.to_local().unwrap();
        assert_eq!(local.with_timezone(&Utc).timestamp(), 1704844800);
    }

    #[test]
    fn test_fetch_window_ending_on() {
        let end_date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let window = FetchWindow::ending_on(end_date, 2).unwrap();

        assert_eq!(
            window.start,
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            end_date.and_hms_micro_opt(23, 59, 59, 999_999).unwrap()
        );
        assert!(window.oldest() < window.latest());
    }

    #[test]
    fn test_fetch_window_zero_duration_is_single_day() {
        let end_date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let window = FetchWindow::ending_on(end_date, 0).unwrap();

        assert_eq!(window.start.date(), end_date);
        assert_eq!(window.to_string(), "2024-03-01 00:00:00 to 2024-03-01 23:59:59");
    }

    #[test]
    fn test_fetch_window_rejects_huge_duration() {
        let end_date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let result = FetchWindow::ending_on(end_date, u32::MAX);
        assert!(matches!(result, Err(AppError::InvalidDuration(_))));
    }
}
