//! Upload-time parsing. Listing timestamps arrive in wildly different shapes
//! ("2025-09-23 12:34", "2025.09.23", "3일 전", RFC 3339, ...), so parsing is
//! an ordered chain of independent strategies; the first success wins.
//!
//! Relative phrases resolve against the `now` passed in, which callers take
//! from the wall clock, never from the reference clock that anchors windows.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Sentinel strings the crawlers emit when a listing carried no usable time.
const UNUSABLE_VALUES: [&str; 3] = ["시간 형식 오류", "시간 정보 없음", "등록 시간 정보 없음"];

pub trait ParseStrategy {
    fn try_parse(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

pub fn parse_upload_time(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || UNUSABLE_VALUES.contains(&trimmed) {
        return None;
    }
    let chain: [&dyn ParseStrategy; 4] = [
        &DirectTimestamp,
        &ExplicitFields,
        &LiteralRelative,
        &QuantifiedRelative,
    ];
    chain.iter().find_map(|strategy| strategy.try_parse(trimmed, now))
}

/// RFC 3339 / ISO timestamps with an explicit offset.
struct DirectTimestamp;

impl ParseStrategy for DirectTimestamp {
    fn try_parse(&self, text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// `YYYY-MM-DD[ T]HH:MM[:SS]`, `YYYY-MM-DD`, `YYYY.MM.DD`, possibly embedded
/// in surrounding text. Fields are extracted by hand so the ambiguous
/// separators stay deterministic; missing time means midnight; naive results
/// are taken as UTC.
struct ExplicitFields;

impl ParseStrategy for ExplicitFields {
    fn try_parse(&self, text: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let bytes = text.as_bytes();
        for i in 0..bytes.len() {
            if bytes[i].is_ascii_digit() {
                if let Some(parsed) = parse_date_at(bytes, i) {
                    return Some(parsed);
                }
            }
        }
        None
    }
}

fn parse_date_at(bytes: &[u8], start: usize) -> Option<DateTime<Utc>> {
    let (year, mut pos) = take_digits(bytes, start, 4, 4)?;
    let sep = *bytes.get(pos)?;
    if sep != b'-' && sep != b'.' {
        return None;
    }
    pos += 1;
    let (month, next) = take_digits(bytes, pos, 1, 2)?;
    pos = next;
    if *bytes.get(pos)? != sep {
        return None;
    }
    pos += 1;
    let (day, next) = take_digits(bytes, pos, 1, 2)?;
    pos = next;
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;

    let (hour, minute, second) = if sep == b'-' {
        parse_time_at(bytes, pos).unwrap_or((0, 0, 0))
    } else {
        // Dotted dates are date-only; any trailing time is ignored.
        (0, 0, 0)
    };

    Some(date.and_hms_opt(hour, minute, second)?.and_utc())
}

fn parse_time_at(bytes: &[u8], pos: usize) -> Option<(u32, u32, u32)> {
    if !matches!(bytes.get(pos), Some(&b' ') | Some(&b'T')) {
        return None;
    }
    let (hour, next) = take_digits(bytes, pos + 1, 1, 2)?;
    if bytes.get(next) != Some(&b':') {
        return None;
    }
    let (minute, end) = take_digits(bytes, next + 1, 1, 2)?;
    let mut second = 0;
    if bytes.get(end) == Some(&b':') {
        if let Some((ss, _)) = take_digits(bytes, end + 1, 1, 2) {
            second = ss;
        }
    }
    Some((hour, minute, second))
}

fn take_digits(bytes: &[u8], start: usize, min: usize, max: usize) -> Option<(u32, usize)> {
    let mut pos = start;
    let mut value: u32 = 0;
    let mut count = 0;
    while pos < bytes.len() && count < max && bytes[pos].is_ascii_digit() {
        value = value * 10 + u32::from(bytes[pos] - b'0');
        pos += 1;
        count += 1;
    }
    (count >= min).then_some((value, pos))
}

/// "방금 전", "지금", "오늘", "어제" and their English counterparts.
struct LiteralRelative;

impl ParseStrategy for LiteralRelative {
    fn try_parse(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let lowered = text.to_lowercase();
        match lowered.trim() {
            "방금 전" | "방금전" | "지금" | "just now" | "now" | "오늘" | "today" => Some(now),
            "어제" | "yesterday" => Some(now - Duration::days(1)),
            _ => None,
        }
    }
}

/// "<N> 분/시간/일/주/개월 전" and "<N> minutes/hours/days/weeks/months ago".
/// A month counts as 30 days.
struct QuantifiedRelative;

impl ParseStrategy for QuantifiedRelative {
    fn try_parse(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let lowered = text.trim().to_lowercase();
        let rest = lowered
            .strip_suffix("전")
            .or_else(|| lowered.strip_suffix("ago"))?
            .trim_end();

        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let amount: i64 = digits.parse().ok()?;
        let unit = rest[digits.len()..].trim();
        let delta = match unit {
            "분" | "minute" | "minutes" | "min" | "mins" => Duration::minutes(amount),
            "시간" | "hour" | "hours" => Duration::hours(amount),
            "일" | "day" | "days" => Duration::days(amount),
            "주" | "week" | "weeks" => Duration::weeks(amount),
            "개월" | "달" | "month" | "months" => Duration::days(30 * amount),
            _ => return None,
        };
        Some(now - delta)
    }
}
