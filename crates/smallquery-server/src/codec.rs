//! Remote-side result encoding.
//!
//! Rows fetched from a [`Cursor`] are converted to transport [`Value`]s and
//! packed into a [`QueryResponse`] whose `results` field is itself a JSON
//! document (a JSON array of rows serialized to a string).

use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use datafusion::scalar::ScalarValue;
use thiserror::Error;

use smallquery_common::{QueryResponse, Value};

use crate::engine::{Cursor, EngineError};

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Errors raised while encoding a result.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A value of a type with no transport representation.
    #[error("Type {type_name} not serializable")]
    UnsupportedType {
        /// Engine name of the type.
        type_name: String,
    },

    /// A temporal value outside the representable range.
    #[error("{type_name} value out of range")]
    OutOfRange {
        /// Engine name of the type.
        type_name: String,
    },

    /// Fetching rows failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The row document could not be written.
    #[error("failed to encode results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fetches up to `limit` rows from `cursor` and encodes them.
///
/// `query_ms` covers the fetch only; conversion and serialization are not
/// timed.
pub async fn encode(cursor: &mut dyn Cursor, limit: usize) -> Result<QueryResponse, EncodeError> {
    let column_names = cursor.column_names();

    let start = Instant::now();
    let fetched = cursor.fetch_many(limit).await?;
    let query_ms = start.elapsed().as_nanos() as f64 / 1_000_000.0;

    let rows = fetched
        .iter()
        .map(|row| row.iter().map(scalar_to_value).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryResponse {
        results: serde_json::to_string(&rows)?,
        column_names,
        query_ms,
    })
}

/// Converts one engine scalar to a transport value.
pub fn scalar_to_value(scalar: &ScalarValue) -> Result<Value, EncodeError> {
    if scalar.is_null() {
        return Ok(Value::Null);
    }

    let value = match scalar {
        ScalarValue::Boolean(Some(v)) => Value::Boolean(*v),
        ScalarValue::Int8(Some(v)) => Value::Integer(i64::from(*v)),
        ScalarValue::Int16(Some(v)) => Value::Integer(i64::from(*v)),
        ScalarValue::Int32(Some(v)) => Value::Integer(i64::from(*v)),
        ScalarValue::Int64(Some(v)) => Value::Integer(*v),
        ScalarValue::UInt8(Some(v)) => Value::Integer(i64::from(*v)),
        ScalarValue::UInt16(Some(v)) => Value::Integer(i64::from(*v)),
        ScalarValue::UInt32(Some(v)) => Value::Integer(i64::from(*v)),
        ScalarValue::UInt64(Some(v)) => match i64::try_from(*v) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::UInteger(*v),
        },
        ScalarValue::Float16(Some(v)) => Value::Float(f64::from(*v)),
        ScalarValue::Float32(Some(v)) => Value::Float(f64::from(*v)),
        ScalarValue::Float64(Some(v)) => Value::Float(*v),
        ScalarValue::Utf8(Some(v))
        | ScalarValue::LargeUtf8(Some(v))
        | ScalarValue::Utf8View(Some(v)) => Value::Text(v.clone()),
        ScalarValue::Date32(Some(days)) => Value::Date(date_from_days(*days, scalar)?),
        ScalarValue::Date64(Some(ms)) => {
            Value::Date(timestamp_from_units(*ms, 1_000, scalar)?.date_naive())
        }
        ScalarValue::TimestampSecond(Some(v), tz) => {
            timestamp(timestamp_from_units(*v, 1, scalar)?, tz.is_some())
        }
        ScalarValue::TimestampMillisecond(Some(v), tz) => {
            timestamp(timestamp_from_units(*v, 1_000, scalar)?, tz.is_some())
        }
        ScalarValue::TimestampMicrosecond(Some(v), tz) => {
            timestamp(timestamp_from_units(*v, 1_000_000, scalar)?, tz.is_some())
        }
        ScalarValue::TimestampNanosecond(Some(v), tz) => {
            timestamp(timestamp_from_units(*v, 1_000_000_000, scalar)?, tz.is_some())
        }
        ScalarValue::Dictionary(_, inner) => return scalar_to_value(inner),
        other => {
            return Err(EncodeError::UnsupportedType {
                type_name: other.data_type().to_string(),
            })
        }
    };

    Ok(value)
}

/// Zone-aware timestamps keep their instant; naive ones become wall-clock
/// date-times.
fn timestamp(instant: DateTime<Utc>, zoned: bool) -> Value {
    if zoned {
        Value::Timestamp(instant)
    } else {
        Value::DateTime(instant.naive_utc())
    }
}

fn date_from_days(days: i32, scalar: &ScalarValue) -> Result<NaiveDate, EncodeError> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| out_of_range(scalar))
}

fn timestamp_from_units(
    value: i64,
    per_second: i64,
    scalar: &ScalarValue,
) -> Result<DateTime<Utc>, EncodeError> {
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    u32::try_from(nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(secs, nanos))
        .ok_or_else(|| out_of_range(scalar))
}

fn out_of_range(scalar: &ScalarValue) -> EncodeError {
    EncodeError::OutOfRange {
        type_name: scalar.data_type().to_string(),
    }
}
