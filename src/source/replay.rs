//! JSON-lines replay source.
//!
//! Each non-blank line is either an envelope
//! `{"observed_at": "2024-05-01T12:00:00Z", "payload": {...}}` (the timestamp
//! may also be Unix milliseconds) or a bare payload, which is stamped with
//! the fallback time.

use crate::source::types::{RawEvent, SourceError};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::io::BufRead;

/// Parse one line into a raw event.
pub fn parse_line(
    line: &str,
    line_no: usize,
    fallback: DateTime<Utc>,
) -> Result<RawEvent, SourceError> {
    let value: Value = serde_json::from_str(line).map_err(|e| SourceError::ParseError {
        line: line_no,
        message: e.to_string(),
    })?;

    let Value::Object(mut object) = value else {
        return Err(SourceError::ParseError {
            line: line_no,
            message: "expected a JSON object".to_string(),
        });
    };

    if !object.get("payload").is_some_and(Value::is_object) {
        return Ok(RawEvent::new(Value::Object(object), fallback));
    }

    let observed_at = match object.get("observed_at") {
        None | Some(Value::Null) => fallback,
        Some(ts) => parse_timestamp(ts).ok_or_else(|| SourceError::ParseError {
            line: line_no,
            message: format!("invalid observed_at: {ts}"),
        })?,
    };
    let payload = object.remove("payload").unwrap_or(Value::Null);

    Ok(RawEvent::new(payload, observed_at))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

/// Iterator over the events of a JSON-lines stream.
pub struct ReplayReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for ReplayReader<R> {
    type Item = Result<RawEvent, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SourceError::IoError(e.to_string()))),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }
            return Some(parse_line(&line, self.line_no, Utc::now()));
        }
    }
}
