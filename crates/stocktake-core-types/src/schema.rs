//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent across the logging macros,
//! the error facility and the test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_PERIOD_KEY: &str = "period_key";
pub const FIELD_SLUG: &str = "slug";

// Collection sizes
pub const FIELD_EVENT_COUNT: &str = "event_count";

// Event source diagnostics
pub const FIELD_SOURCE_STATUS: &str = "source_status";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
