use crate::domain::{DomainError, DomainResult};
use chrono::{DateTime, Utc};

/// One validated telemetry reading from the ingestion feed.
///
/// `occurred_at` is assigned at validation time; a timestamp supplied by the
/// publisher is never trusted (source clocks are unsynchronized at best).
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub category: String,
    pub value: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Parse and type-check a raw feed payload into a [`SensorEvent`].
///
/// The payload must be a JSON object carrying `category` (non-empty string)
/// and `value` (number). Anything else is rejected with a human-readable
/// reason and must cause no write and no fan-out.
pub fn validate_payload(raw: &[u8]) -> DomainResult<SensorEvent> {
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| DomainError::ValidationError(format!("payload is not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| DomainError::ValidationError("payload is not a JSON object".to_string()))?;

    let category = object
        .get("category")
        .ok_or_else(|| DomainError::ValidationError("missing field: category".to_string()))?
        .as_str()
        .ok_or_else(|| DomainError::ValidationError("category must be a string".to_string()))?;

    if category.is_empty() {
        return Err(DomainError::ValidationError(
            "category must be a non-empty string".to_string(),
        ));
    }

    let measured = object
        .get("value")
        .ok_or_else(|| DomainError::ValidationError("missing field: value".to_string()))?
        .as_f64()
        .ok_or_else(|| DomainError::ValidationError("value must be a number".to_string()))?;

    Ok(SensorEvent {
        category: category.to_string(),
        value: measured,
        occurred_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_payload() {
        let event = validate_payload(br#"{"category":"glass","value":1}"#).unwrap();
        assert_eq!(event.category, "glass");
        assert_eq!(event.value, 1.0);
    }

    #[test]
    fn test_valid_payload_float_value() {
        let event = validate_payload(br#"{"category":"plastic","value":2.5}"#).unwrap();
        assert_eq!(event.value, 2.5);
    }

    #[test]
    fn test_publisher_timestamp_is_discarded() {
        let before = Utc::now();
        let event = validate_payload(
            br#"{"category":"glass","value":1,"occurredAt":"1999-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(event.occurred_at >= before);
    }

    #[test]
    fn test_missing_category() {
        let result = validate_payload(br#"{"value":1}"#);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
        assert!(result.unwrap_err().to_string().contains("category"));
    }

    #[test]
    fn test_missing_value() {
        let result = validate_payload(br#"{"category":"glass"}"#);
        assert!(result.unwrap_err().to_string().contains("value"));
    }

    #[test]
    fn test_wrong_category_type() {
        let result = validate_payload(br#"{"category":42,"value":1}"#);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_wrong_value_type() {
        let result = validate_payload(br#"{"category":"glass","value":"one"}"#);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_empty_category() {
        let result = validate_payload(br#"{"category":"","value":1}"#);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_not_json() {
        let result = validate_payload(b"\x01\x67\x01\x10");
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_not_an_object() {
        let result = validate_payload(br#"[1,2,3]"#);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
