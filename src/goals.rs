//! Goal normalization for the intake `financial_goals` payload.
//!
//! The form has stored this column as a JSON object, as a JSON string, and
//! occasionally as something else entirely. Normalization is best effort: a
//! payload we cannot decode yields no goals and an unreadable number yields 0.
//! Nothing here returns an error.

use crate::models::GoalRecord;
use serde_json::{Map, Value};

/// Turns a goals payload into the selected goals, in payload key order.
pub fn normalize_goals(payload: &Value) -> Vec<GoalRecord> {
    let Some(goals) = decode_payload(payload) else {
        if !payload.is_null() {
            tracing::warn!("Unreadable financial_goals payload, treating as no goals");
        }
        return Vec::new();
    };

    goals
        .iter()
        .filter_map(|(goal_type, details)| normalize_entry(goal_type, details))
        .collect()
}

fn decode_payload(payload: &Value) -> Option<Map<String, Value>> {
    let decoded = match payload {
        Value::Object(map) => return Some(map.clone()),
        Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
        Value::Null => return None,
        // Anything else gets one chance as its string form.
        other => serde_json::from_str::<Value>(&other.to_string()).ok()?,
    };

    match decoded {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn normalize_entry(goal_type: &str, details: &Value) -> Option<GoalRecord> {
    let details = details.as_object()?;
    if details.get("selected") != Some(&Value::Bool(true)) {
        return None;
    }

    Some(GoalRecord {
        goal_type: goal_type.to_string(),
        years: details.get("years").map(parse_years).unwrap_or(0),
        amount: details.get("amount").map(parse_amount).unwrap_or(0.0),
        description: match details.get("description") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
    })
}

fn parse_years(value: &Value) -> u32 {
    let years = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    years.and_then(|y| u32::try_from(y).ok()).unwrap_or(0)
}

fn parse_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount
        .filter(|a| a.is_finite() && *a >= 0.0)
        .unwrap_or(0.0)
}
