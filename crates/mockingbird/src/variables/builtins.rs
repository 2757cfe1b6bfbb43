//! Built-in dynamic variables.
//!
//! These are prefixed with `$` and produce a fresh value on every resolution.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

/// Resolve a built-in name (including the `$` prefix) to a generated value.
/// Returns `None` for names that are not built-ins.
pub fn resolve_builtin(name: &str) -> Option<String> {
    match name {
        "$uuid" | "$randomUuid" => Some(Uuid::new_v4().to_string()),
        "$timestamp" => Some(Utc::now().timestamp().to_string()),
        "$isoTimestamp" => Some(Utc::now().to_rfc3339()),
        "$randomInt" => Some(rand::thread_rng().gen_range(0..1000).to_string()),
        "$randomBoolean" => Some(rand::thread_rng().gen_bool(0.5).to_string()),
        _ => None,
    }
}
