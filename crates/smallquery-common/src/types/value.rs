//! Scalar values carried in result rows.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A scalar in a result row.
///
/// Temporal variants only exist on the encoding side. They serialize to
/// ISO-8601 text, so after a round trip they come back as [`Value::Text`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Signed integer value.
    Integer(i64),
    /// Unsigned integer too large for `Integer`.
    UInteger(u64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Calendar date, encoded as `YYYY-MM-DD`.
    Date(NaiveDate),
    /// Date-time without zone, encoded as `YYYY-MM-DDTHH:MM:SS[.ffffff]`.
    DateTime(NaiveDateTime),
    /// Instant in time, encoded with a `+00:00` offset.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tries to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Tries to get as integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::UInteger(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }
}

/// Formats a date-time the way ISO-8601 text is expected on the wire: the
/// fraction is omitted when there are no sub-second microseconds.
fn iso_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::UInteger(u) => write!(f, "{}", u),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", iso_datetime(dt)),
            Value::Timestamp(ts) => write!(f, "{}+00:00", iso_datetime(&ts.naive_utc())),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::UInteger(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(_) | Value::DateTime(_) | Value::Timestamp(_) => {
                serializer.serialize_str(&self.to_string())
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = JsonValue::deserialize(deserializer)?;
        Value::try_from(json).map_err(de::Error::custom)
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = String;

    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Boolean(b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Value::UInteger(u))
                } else {
                    n.as_f64()
                        .map(Value::Float)
                        .ok_or_else(|| format!("unrepresentable number {}", n))
                }
            }
            JsonValue::String(s) => Ok(Value::Text(s)),
            JsonValue::Array(_) => Err("nested arrays are not scalar values".to_string()),
            JsonValue::Object(_) => Err("objects are not scalar values".to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_datetime() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 24)
            .unwrap()
            .and_hms_micro_opt(13, 3, 12, 2323)
            .unwrap()
    }

    #[test]
    fn test_temporal_serialization() {
        let row = vec![
            Value::Date(NaiveDate::from_ymd_opt(2020, 11, 10).unwrap()),
            Value::DateTime(sample_datetime()),
            Value::from("ksjdf"),
            Value::from(78),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"["2020-11-10","2021-06-24T13:03:12.002323","ksjdf",78]"#
        );
    }

    #[test]
    fn test_whole_second_datetime_has_no_fraction() {
        let dt = NaiveDate::from_ymd_opt(2021, 6, 24)
            .unwrap()
            .and_hms_opt(13, 3, 12)
            .unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2021-06-24T13:03:12");

        let ts = DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc);
        assert_eq!(Value::Timestamp(ts).to_string(), "2021-06-24T13:03:12+00:00");
    }

    #[test]
    fn test_deserialize_scalars() {
        let row: Vec<Value> =
            serde_json::from_str(r#"[null, true, -3, 18446744073709551615, 0.5, "x"]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Value::Null,
                Value::Boolean(true),
                Value::Integer(-3),
                Value::UInteger(u64::MAX),
                Value::Float(0.5),
                Value::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_deserialize_rejects_nested() {
        assert!(serde_json::from_str::<Vec<Value>>(r#"[[1]]"#).is_err());
        assert!(serde_json::from_str::<Vec<Value>>(r#"[{"a": 1}]"#).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Float(0.42).to_string(), "0.42");
        assert_eq!(Value::Integer(1).as_i64(), Some(1));
        assert_eq!(Value::from("a").as_str(), Some("a"));
    }
}
