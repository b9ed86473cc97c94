//! Conversion between phases and ordered records.
//!
//! A serialized phase is a flat ordered record: `id`, the timing fields
//! that are set, then the caller's data. Rebuilding a phase from such a
//! record restores its state as-is: no observer is attached, nothing is
//! notified and no timing is recomputed unless `elapsed_seconds` is missing.
//! A stored `elapsed_seconds` must agree with `end_time - start_time`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PhaseError;
use crate::phase::timer::{ELAPSED_FIELD, END_TIME_FIELD, ID_FIELD, START_TIME_FIELD, Timing};
use crate::phase::{PhaseId, PhaseTimer};
use crate::record::OrderedRecord;

/// Formats a timestamp as RFC 3339 UTC, keeping sub-second digits.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns [`PhaseError::MalformedField`] naming `key` if `value` is not an
/// RFC 3339 string.
pub fn parse_timestamp(key: &str, value: &Value) -> Result<DateTime<Utc>, PhaseError> {
    let text = value.as_str().ok_or_else(|| malformed(key, "expected an RFC 3339 string"))?;
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| malformed(key, &e.to_string()))
}

/// Allowed drift between a stored `elapsed_seconds` and the timestamps.
const ELAPSED_TOLERANCE_SECS: f64 = 1e-6;

/// Seconds from `start` to `end`, zero when `end` precedes `start`.
fn span_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).to_std().map_or(0.0, |d| d.as_secs_f64())
}

fn malformed(key: &str, reason: &str) -> PhaseError {
    PhaseError::MalformedField {
        key: key.to_owned(),
        reason: reason.to_owned(),
    }
}

impl PhaseTimer {
    /// Flattens the phase into an ordered record: id, timing, then data.
    #[must_use]
    pub fn to_record(&self) -> OrderedRecord {
        let mut record = OrderedRecord::new();
        record.set(ID_FIELD, self.id().as_str());
        for (key, value) in self.timing_fields() {
            record.set(key, value);
        }
        for (key, value) in self.data() {
            record.set(key.clone(), value.clone());
        }
        record
    }

    /// Rebuilds a phase from a record produced by [`to_record`](Self::to_record)
    /// or an equivalent structure. Reserved names may appear anywhere in the
    /// record; `null` timing values count as absent.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::MissingId`] when there is no `id` field
    /// - [`PhaseError::MalformedField`] when a reserved field has the wrong
    ///   type, when `end_time` is present without `start_time`, or when
    ///   `elapsed_seconds` is negative, present without `end_time`, or
    ///   disagrees with `end_time - start_time`
    pub fn from_record(record: OrderedRecord) -> Result<Self, PhaseError> {
        let mut id = None;
        let mut timing = Timing::default();
        let mut data = OrderedRecord::new();

        for (key, value) in record {
            match key.as_str() {
                ID_FIELD => id = Some(parse_id(&value)?),
                START_TIME_FIELD if !value.is_null() => {
                    timing.start = Some(parse_timestamp(&key, &value)?);
                }
                END_TIME_FIELD if !value.is_null() => {
                    timing.end = Some(parse_timestamp(&key, &value)?);
                }
                ELAPSED_FIELD if !value.is_null() => {
                    let secs = value
                        .as_f64()
                        .filter(|s| *s >= 0.0)
                        .ok_or_else(|| malformed(&key, "expected a non-negative number"))?;
                    timing.elapsed_seconds = Some(secs);
                }
                START_TIME_FIELD | END_TIME_FIELD | ELAPSED_FIELD => {}
                _ => {
                    data.set(key, value);
                }
            }
        }

        let id = id.ok_or(PhaseError::MissingId)?;
        match (timing.start, timing.end, timing.elapsed_seconds) {
            (None, Some(_), _) => {
                return Err(malformed(END_TIME_FIELD, "end_time without start_time"));
            }
            (_, None, Some(_)) => {
                return Err(malformed(ELAPSED_FIELD, "elapsed_seconds without end_time"));
            }
            (Some(start), Some(end), None) => {
                timing.elapsed_seconds = Some(span_seconds(start, end));
            }
            (Some(start), Some(end), Some(secs)) => {
                let span = span_seconds(start, end);
                if (secs - span).abs() > ELAPSED_TOLERANCE_SECS.max(span * 1e-12) {
                    return Err(malformed(
                        ELAPSED_FIELD,
                        &format!("{secs} does not match end_time - start_time ({span})"),
                    ));
                }
            }
            _ => {}
        }

        Ok(Self::from_parts(id, data, timing))
    }
}

fn parse_id(value: &Value) -> Result<PhaseId, PhaseError> {
    match value {
        Value::String(s) => Ok(PhaseId::new(s.as_str())),
        Value::Number(n) => Ok(PhaseId::new(n.to_string())),
        _ => Err(malformed(ID_FIELD, "expected a string")),
    }
}

impl Serialize for PhaseTimer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PhaseTimer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = OrderedRecord::deserialize(deserializer)?;
        Self::from_record(record).map_err(D::Error::custom)
    }
}
