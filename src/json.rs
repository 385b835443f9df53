use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Position, TimeError};
use crate::units::UnitRegistry;
use crate::validate::ValidationError;

/// JSON formatting style.
#[derive(Clone, Copy)]
pub enum JsonStyle {
    /// Compact: no whitespace between tokens.
    Compact,
    /// Pretty: 2-space indented, one entry per line.
    Pretty,
}

/// Serialize anything serde can, in the given style.
pub fn to_json<T: Serialize + ?Sized>(value: &T, style: JsonStyle) -> Result<String, TimeError> {
    let result = match style {
        JsonStyle::Compact => serde_json::to_string(value),
        JsonStyle::Pretty => serde_json::to_string_pretty(value),
    };
    result.map_err(|err| TimeError::InvalidInput(format!("Cannot write JSON: {}", err)))
}

/// Every unit and alias name as a JSON array.
pub fn units_to_json(registry: &UnitRegistry, style: JsonStyle) -> Result<String, TimeError> {
    to_json(&registry.all(), style)
}

/// An error as `{"code", "message"}`, plus `begin`/`end` positions in
/// `source` for template errors.
pub fn error_to_value(err: &TimeError, source: &str) -> Value {
    let mut value = json!({
        "code": err.code(),
        "message": err.to_string(),
    });
    if let Some((start, end)) = err.span() {
        value["begin"] = position_to_value(Position::locate(source, start));
        value["end"] = position_to_value(Position::locate(source, end));
    }
    value
}

fn position_to_value(pos: Position) -> Value {
    json!({ "line": pos.line, "column": pos.column, "offset": pos.offset })
}

pub fn validation_errors_to_json(errors: &[ValidationError]) -> Result<String, TimeError> {
    let values: Vec<Value> = errors
        .iter()
        .map(|e| {
            json!({
                "code": e.code,
                "message": e.message,
                "reference": e.reference,
                "index": e.index,
            })
        })
        .collect();
    to_json(&values, JsonStyle::Compact)
}
