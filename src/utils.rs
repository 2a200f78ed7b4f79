//! Hashing and simulated-clock helpers shared across the crate.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::Language;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const RUN_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// SHA-256 of a string, as lowercase hex.
pub fn get_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// SHA-256 of a JSON value over its canonical (key-sorted) rendering.
pub fn get_value_hash(value: &Value) -> String {
    get_hash(&canonical_json(value))
}

/// Render JSON with object keys sorted so the same data always hashes
/// the same regardless of map insertion order.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", serde_json::to_string(k).unwrap_or_default(), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}

pub fn str_to_datetime(time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(time, TIME_FORMAT).ok()
}

pub fn str_to_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

pub fn check_time_format(time: &str) -> bool {
    str_to_datetime(time).is_some()
}

pub fn check_date_format(date: &str) -> bool {
    str_to_date(date).is_some()
}

pub fn format_time(time: NaiveDateTime, format: &str) -> String {
    time.format(format).to_string()
}

/// Wall-clock now, formatted. Simulated clocks live on the DB and take
/// precedence there; this is the fallback.
pub fn get_now(format: &str) -> String {
    Local::now().format(format).to_string()
}

/// Localized weekday name for a `%Y-%m-%d %H:%M:%S` time string.
pub fn get_weekday(time: &str, language: Language) -> String {
    let Some(parsed) = str_to_datetime(time) else {
        return String::new();
    };
    let index = parsed.weekday().num_days_from_monday() as usize;
    match language {
        Language::English => [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ][index]
            .to_string(),
        Language::Chinese => {
            let names = ["一", "二", "三", "四", "五", "六", "日"];
            format!("星期{}", names[index])
        }
    }
}

/// Dates in `[start_date, end_date)`, one string per day.
pub fn get_date_between(start_date: &str, end_date: &str) -> Vec<String> {
    let (Some(mut current), Some(end)) = (str_to_date(start_date), str_to_date(end_date)) else {
        return Vec::new();
    };
    let mut dates = Vec::new();
    while current < end {
        dates.push(current.format(DATE_FORMAT).to_string());
        current += chrono::Duration::days(1);
    }
    dates
}

/// Seconds since the Unix epoch for a simulated `%Y-%m-%d %H:%M:%S` time,
/// with sub-second precision preserved for the real-clock fallback.
pub fn unix_timestamp(simulated: Option<&str>) -> f64 {
    if let Some(parsed) = simulated.and_then(str_to_datetime) {
        return parsed.and_utc().timestamp() as f64
            + f64::from(parsed.nanosecond()) / 1_000_000_000.0;
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let h = get_hash("#DELIVERY#user_001");
        assert_eq!(h.len(), 64);
        assert_eq!(h, get_hash("#DELIVERY#user_001"));
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":2,"x":3}}"#).unwrap();
        assert_eq!(canonical_json(&a), r#"{"a":{"x":3,"y":2},"b":1}"#);
    }

    #[test]
    fn weekday_localization() {
        assert_eq!(get_weekday("2025-08-01 12:00:00", Language::English), "Friday");
        assert_eq!(get_weekday("2025-08-01 12:00:00", Language::Chinese), "星期五");
    }

    #[test]
    fn date_between_excludes_end() {
        let dates = get_date_between("2025-01-30", "2025-02-02");
        assert_eq!(dates, vec!["2025-01-30", "2025-01-31", "2025-02-01"]);
    }

    #[test]
    fn simulated_timestamp_is_pinned() {
        let a = unix_timestamp(Some("2025-08-01 12:00:00"));
        let b = unix_timestamp(Some("2025-08-01 12:00:00"));
        assert_eq!(a, b);
    }
}
