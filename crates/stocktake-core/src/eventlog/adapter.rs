//! Probe, validate, query and normalise the external event log.

use crate::errors::ExError;
use crate::errors::StocktakeError;
use crate::eventlog::extractors::{extract, RowView};
use crate::eventlog::source::{EventLogSource, RawEventRow};
use crate::model::{ExternalEvent, SourceStatus, TimeRange};
use crate::settings::EventLogSchema;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Optional column that marks what kind of action a row records.
/// Searched among known variants; never required.
const ACTION_FIELDS: &[&str] = &["action", "event_type", "type", "log_type"];

const UPDATE_MARKERS: &[&str] = &["update", "upgrad"];

/// Fetch component-update events for `window`.
///
/// Never fails: every problem with the log maps onto a [`SourceStatus`],
/// and individual unparseable rows are skipped and logged.
pub fn fetch_events(
    source: &dyn EventLogSource,
    schema: &EventLogSchema,
    window: &TimeRange,
) -> (Vec<ExternalEvent>, SourceStatus) {
    // 1. Probe
    match source.exists() {
        Ok(true) => {}
        Ok(false) => return (Vec::new(), SourceStatus::Unavailable),
        Err(e) => {
            tracing::warn!(op = "fetch_events", err_code = e.code(), error = %e, "event log probe failed");
            return (Vec::new(), SourceStatus::Unavailable);
        }
    }

    // 2. Validate required fields by exact name
    let fields = match source.field_names() {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(op = "fetch_events", err_code = e.code(), error = %e, "event log schema read failed");
            return (Vec::new(), SourceStatus::Unavailable);
        }
    };
    let missing = missing_fields(schema, &fields);
    if !missing.is_empty() {
        let err = ExError::from(StocktakeError::EventSchemaInvalid {
            missing: missing.clone(),
        });
        tracing::warn!(op = "fetch_events", err_code = err.code(), error = %err, "event log schema invalid");
        return (Vec::new(), SourceStatus::SchemaInvalid { missing });
    }
    let action_field = ACTION_FIELDS
        .iter()
        .find(|candidate| fields.iter().any(|f| f == *candidate))
        .copied();

    // 3. Query the window
    let rows = match source.query(&schema.timestamp_field, window) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(op = "fetch_events", err_code = e.code(), error = %e, "event log query failed");
            return (Vec::new(), SourceStatus::Unavailable);
        }
    };

    // 4. Normalise, skipping what cannot be parsed
    let mut seen = BTreeSet::new();
    let mut events = Vec::new();
    for row in &rows {
        match normalize_row(row, schema, action_field, window) {
            Ok(Some(event)) => {
                if seen.insert(event.dedup_key()) {
                    events.push(event);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(op = "fetch_events", err_code = e.code(), reason = e.message(), "event row skipped");
            }
        }
    }

    let status = if events.is_empty() {
        SourceStatus::OkEmpty
    } else {
        SourceStatus::Ok
    };
    (events, status)
}

fn missing_fields(schema: &EventLogSchema, fields: &[String]) -> Vec<String> {
    let has = |name: &str| fields.iter().any(|f| f == name);
    let mut missing = Vec::new();
    if !has(&schema.timestamp_field) {
        missing.push(schema.timestamp_field.clone());
    }
    let payload = schema.payload_fields();
    if payload.is_empty() {
        missing.push("message|context".to_string());
    } else if !payload.iter().any(|name| has(name)) {
        missing.extend(payload.iter().map(|name| name.to_string()));
    }
    missing
}

/// `Ok(None)` for rows that are not component updates or fall outside the
/// window; `Err` for update rows that cannot be turned into an event.
fn normalize_row(
    row: &RawEventRow,
    schema: &EventLogSchema,
    action_field: Option<&str>,
    window: &TimeRange,
) -> Result<Option<ExternalEvent>, ExError> {
    let columns: Map<String, Value> = row.clone().into_iter().collect();
    let message = schema
        .message_field
        .as_deref()
        .and_then(|f| columns.get(f))
        .and_then(Value::as_str);
    let context = schema
        .context_field
        .as_deref()
        .and_then(|f| columns.get(f))
        .and_then(parse_context);

    if !is_update_action(&columns, action_field, message, context.as_ref()) {
        return Ok(None);
    }

    let skipped = |reason: String| ExError::from(StocktakeError::EventParseSkipped { reason });

    let occurred_at = columns
        .get(&schema.timestamp_field)
        .and_then(parse_timestamp)
        .ok_or_else(|| skipped(format!("unreadable timestamp in '{}'", schema.timestamp_field)))?;
    if !window.contains(occurred_at) {
        return Ok(None);
    }

    let view = RowView {
        context: context.as_ref(),
        columns: &columns,
        message,
    };
    let extracted = extract(&view).ok_or_else(|| skipped("no extractor matched".to_string()))?;
    if extracted.slug.is_empty() {
        return Err(skipped(format!(
            "no component identifier ({} strategy)",
            extracted.strategy
        )));
    }

    Ok(Some(ExternalEvent {
        slug: extracted.slug,
        version_from: extracted.version_from,
        version_to: extracted.version_to,
        occurred_at,
        origin: extracted.origin,
    }))
}

fn is_update_action(
    columns: &Map<String, Value>,
    action_field: Option<&str>,
    message: Option<&str>,
    context: Option<&Map<String, Value>>,
) -> bool {
    let has_marker = |text: &str| {
        let lower = text.to_lowercase();
        UPDATE_MARKERS.iter().any(|m| lower.contains(m))
    };

    if let Some(action) = action_field
        .and_then(|f| columns.get(f))
        .and_then(Value::as_str)
    {
        return has_marker(action);
    }
    if let Some(action) = context
        .and_then(|c| ACTION_FIELDS.iter().find_map(|f| c.get(*f)))
        .and_then(Value::as_str)
    {
        return has_marker(action);
    }
    message.map(has_marker).unwrap_or(false)
}

fn parse_context(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// Zone-less layouts, read as UTC. `%.f` takes optional fractional seconds.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Accepts RFC 3339 (also with a space separator), `YYYY-MM-DD HH:MM:SS[.f]`
/// (UTC) and unix seconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(at) = DateTime::parse_from_rfc3339(text) {
                return Some(at.with_timezone(&Utc));
            }
            if let Ok(at) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
                return Some(at.with_timezone(&Utc));
            }
            if let Some(naive) = NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            {
                return Some(Utc.from_utc_datetime(&naive));
            }
            text.parse::<i64>()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        }
        _ => None,
    }
}
