//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    String,
    Integer,
    Bool,
}

/// All supported `WARDEN_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_TRUST_LEVEL",
        field_path: "trust_gate.trust_level",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "WARDEN_APPROVAL_MODE",
        field_path: "trust_gate.mode",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_EXEC_APPROVAL_SOCKET",
        field_path: "trust_gate.socket.path",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_TOTP_WINDOW_MINUTES",
        field_path: "totp.window_minutes",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "WARDEN_AUDIT_PATH",
        field_path: "audit.path",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_WATCH_MODE",
        field_path: "delivery.watch_mode",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::String,
    },
];

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(ConfigLayer::is_file)
        {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field(merged, mapping.field_path, coerce(mapping.kind, val));
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Convert an env string into a TOML value of the field's type. Values that
/// fail to parse are kept as strings so deserialization reports them.
fn coerce(kind: FieldKind, val: &str) -> toml::Value {
    match kind {
        FieldKind::Integer => val
            .trim()
            .parse::<i64>()
            .map_or_else(|_| toml::Value::String(val.to_owned()), toml::Value::Integer),
        FieldKind::Bool => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => toml::Value::Boolean(true),
            "0" | "false" | "no" | "off" => toml::Value::Boolean(false),
            _ => toml::Value::String(val.to_owned()),
        },
        FieldKind::String => toml::Value::String(val.to_owned()),
    }
}

/// Set a dotted field path in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}
