//! Coercion helpers for loosely typed snapshot values.
//!
//! Collectors serialize whatever the OS instrumentation hands them, so the
//! same field can show up as a number, a numeric string, a wrapped date
//! object, or a list. Everything here is best-effort: a value that cannot be
//! interpreted becomes `None` (or `false`) and a debug event is recorded for
//! the field, rather than failing the snapshot.

use std::net::Ipv4Addr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Deserialize a field that producers emit either as one object or as a
/// sequence of objects. Both shapes come out as a sequence.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::Many(items)) => Some(items),
        Some(OneOrMany::One(item)) => Some(vec![item]),
    })
}

/// Deserialize a scalar as text regardless of its JSON type.
pub fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => blank_to_none(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) if map.contains_key("Major") => version_text(map),
        _ => None,
    }
}

// PowerShell serializes [version] as {Major, Minor, Build, Revision} with -1
// for unset trailing parts.
fn version_text(map: &serde_json::Map<String, Value>) -> Option<String> {
    let parts: Vec<String> = ["Major", "Minor", "Build", "Revision"]
        .iter()
        .map_while(|key| map.get(*key).and_then(Value::as_i64).filter(|n| *n >= 0))
        .map(|n| n.to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

/// Trim a string and collapse blank input to `None`.
pub fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First element of a normalized sequence. Logs how many were discarded.
pub fn first<'a, T>(field: &str, items: Option<&'a [T]>) -> Option<&'a T> {
    let items = items?;
    if items.len() > 1 {
        debug!(field, discarded = items.len() - 1, "keeping first entry only");
    }
    items.first()
}

pub fn coerce_f64(field: &str, value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Some(f),
                _ => {
                    debug!(field, value = %trimmed, "numeric coercion fell back to null");
                    None
                }
            }
        }
        other => {
            debug!(field, value = %other, "numeric coercion fell back to null");
            None
        }
    }
}

pub fn coerce_i64(field: &str, value: Option<&Value>) -> Option<i64> {
    if let Some(Value::Number(n)) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    coerce_f64(field, value).map(|f| f.round() as i64)
}

/// Native booleans or case-insensitive "true"/"false"; anything else is false.
pub fn coerce_bool(field: &str, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
        Some(other) => {
            debug!(field, value = %other, "boolean coercion fell back to false");
            false
        }
    }
}

/// Flatten a string-or-list value into one comma-delimited string.
pub fn join_list(field: &str, value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(","))
            }
        }
        Value::Object(_) => {
            debug!(field, "list coercion fell back to null");
            None
        }
        other => scalar_text(other),
    }
}

/// The first scalar of a string-or-list value.
pub fn first_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => items.iter().find_map(scalar_text),
        other => scalar_text(other),
    }
}

/// Best-effort timestamp parsing. Unparseable input yields `None`.
pub fn parse_timestamp(field: &str, value: Option<&Value>) -> Option<NaiveDateTime> {
    let parsed = match value? {
        Value::Null => return None,
        Value::String(s) => {
            if s.trim().is_empty() {
                return None;
            }
            parse_timestamp_str(s)
        }
        // PowerShell date wrapper: {"value": "/Date(..)/", "DateTime": "..."}
        Value::Object(map) => ["value", "DateTime"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find_map(parse_timestamp_str),
        _ => None,
    };
    if parsed.is_none() {
        debug!(field, "timestamp coercion fell back to null");
    }
    parsed
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

pub fn parse_timestamp_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Some(ms) = json_date_millis(s) {
        return DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Some(date) = compact_date(s) {
        return date.and_hms_opt(0, 0, 0);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// "/Date(1709280900000)/" or "/Date(1709280900000+0100)/"
fn json_date_millis(s: &str) -> Option<i64> {
    let inner = s.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(inner.len(), |(i, _)| i);
    inner[..end].parse().ok()
}

// Registry InstallDate values: "20230115"
fn compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Convert a CIDR prefix length ("24" or "/24") to a dotted-decimal mask.
/// Anything else, including out-of-range prefixes, is returned unchanged.
pub fn cidr_to_dotted(mask: &str) -> String {
    let trimmed = mask.trim();
    let digits = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.to_string();
    }
    match digits.parse::<u32>() {
        Ok(prefix) if prefix <= 32 => {
            let bits = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            Ipv4Addr::from(bits).to_string()
        }
        _ => {
            debug!(mask = %trimmed, "prefix length out of range, keeping mask as-is");
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "one_or_many")]
        items: Option<Vec<Item>>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn singleton_and_sequence_normalize_alike() {
        let one: Holder = serde_json::from_value(json!({"items": {"name": "a"}})).unwrap();
        let many: Holder = serde_json::from_value(json!({"items": [{"name": "a"}]})).unwrap();
        assert_eq!(one.items, many.items);
        assert_eq!(one.items.unwrap().len(), 1);

        let absent: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(absent.items.is_none());
        let null: Holder = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(null.items.is_none());
    }

    #[test]
    fn first_keeps_leading_entry() {
        let items = vec![1, 2, 3];
        assert_eq!(first("GPU", Some(items.as_slice())), Some(&1));
        assert_eq!(first::<i32>("GPU", None), None);
        assert_eq!(first::<i32>("GPU", Some(&[][..])), None);
    }

    #[test]
    fn numbers_from_numbers_and_strings() {
        assert_eq!(coerce_f64("f", Some(&json!(15.9))), Some(15.9));
        assert_eq!(coerce_f64("f", Some(&json!(" 256 "))), Some(256.0));
        assert_eq!(coerce_f64("f", Some(&json!("n/a"))), None);
        assert_eq!(coerce_f64("f", Some(&json!(""))), None);
        assert_eq!(coerce_f64("f", Some(&json!([1]))), None);
        assert_eq!(coerce_i64("i", Some(&json!(8))), Some(8));
        assert_eq!(coerce_i64("i", Some(&json!("2900"))), Some(2900));
        assert_eq!(coerce_i64("i", Some(&json!(3.6))), Some(4));
        assert_eq!(coerce_i64("i", None), None);
    }

    #[test]
    fn booleans_accept_native_and_text() {
        assert!(coerce_bool("b", Some(&json!(true))));
        assert!(coerce_bool("b", Some(&json!("TRUE"))));
        assert!(!coerce_bool("b", Some(&json!("False"))));
        assert!(!coerce_bool("b", Some(&json!("yes"))));
        assert!(!coerce_bool("b", Some(&json!(1))));
        assert!(!coerce_bool("b", None));
    }

    #[test]
    fn blank_strings_collapse() {
        assert_eq!(blank_to_none("  "), None);
        assert_eq!(blank_to_none(" PT-A1 "), Some("PT-A1".into()));
    }

    #[test]
    fn lists_flatten_to_delimited_text() {
        assert_eq!(
            join_list("DNSServers", Some(&json!(["10.0.0.1", "10.0.0.2"]))),
            Some("10.0.0.1,10.0.0.2".into())
        );
        assert_eq!(
            join_list("DNSServers", Some(&json!("10.0.0.1"))),
            Some("10.0.0.1".into())
        );
        assert_eq!(join_list("DNSServers", Some(&json!([]))), None);
        assert_eq!(first_text(Some(&json!(["255.255.255.0", "64"]))), Some("255.255.255.0".into()));
    }

    #[test]
    fn timestamps_in_collector_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        for raw in [
            json!("2024-03-01T08:15:00"),
            json!("2024-03-01 08:15:00"),
            json!("2024-03-01T08:15:00Z"),
            json!("2024-03-01T10:15:00+02:00"),
            json!("3/1/2024 8:15:00 AM"),
            json!("/Date(1709280900000)/"),
            json!({"value": "/Date(1709280900000)/", "DateTime": "Friday, March 1, 2024 8:15:00 AM"}),
        ] {
            assert_eq!(parse_timestamp("BootTime", Some(&raw)), Some(expected), "{raw}");
        }

        let midnight = NaiveDate::from_ymd_opt(2023, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("InstallDate", Some(&json!("20230115"))), Some(midnight));
        assert_eq!(parse_timestamp("InstalledOn", Some(&json!("1/15/2023"))), Some(midnight));
        assert_eq!(parse_timestamp("InstalledOn", Some(&json!("2023-01-15"))), Some(midnight));
    }

    #[test]
    fn unparseable_timestamps_become_null() {
        assert_eq!(parse_timestamp("BootTime", Some(&json!("yesterday"))), None);
        assert_eq!(parse_timestamp("InstallDate", Some(&json!("20231345"))), None);
        assert_eq!(parse_timestamp("BootTime", Some(&json!(42))), None);
        assert_eq!(parse_timestamp("BootTime", None), None);
    }

    #[test]
    fn cidr_prefixes_convert() {
        assert_eq!(cidr_to_dotted("24"), "255.255.255.0");
        assert_eq!(cidr_to_dotted("/20"), "255.255.240.0");
        assert_eq!(cidr_to_dotted("0"), "0.0.0.0");
        assert_eq!(cidr_to_dotted("32"), "255.255.255.255");
        assert_eq!(cidr_to_dotted("255.255.255.0"), "255.255.255.0");
        assert_eq!(cidr_to_dotted("40"), "40");
        assert_eq!(cidr_to_dotted("abc"), "abc");
    }

    #[test]
    fn powershell_version_objects_render_as_text() {
        #[derive(Deserialize)]
        struct V {
            #[serde(default, deserialize_with = "loose_string")]
            v: Option<String>,
        }
        let obj: V = serde_json::from_value(
            json!({"v": {"Major": 5, "Minor": 1, "Build": 19041, "Revision": -1}}),
        )
        .unwrap();
        assert_eq!(obj.v.as_deref(), Some("5.1.19041"));
        let num: V = serde_json::from_value(json!({"v": 22631})).unwrap();
        assert_eq!(num.v.as_deref(), Some("22631"));
    }
}
