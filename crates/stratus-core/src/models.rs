//! Record models extracted from and posted to the service
//!
//! Records flowing out of a response body are transient: the extractor
//! hands each one to a consumer callback and drops it as soon as the
//! callback returns, so at most one record's backing data is alive at a
//! time.

use serde::{Deserialize, Serialize};

/// A single telemetry value: number, text or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl DataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Number(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        DataValue::Number(value as f64)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Number(value as f64)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

/// One data point from a stream listing. The stream it belongs to is the
/// one the request named; it is not repeated in every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamValue {
    /// When the value was recorded, ISO-8601
    pub timestamp: String,
    /// The recorded value
    pub value: DataValue,
}

/// One location fix from a device's waypoint history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    /// When the fix was recorded, ISO-8601
    pub timestamp: String,
}

/// One outbound value for a batch update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamUpdate {
    /// Record timestamp; the service stamps arrival time when omitted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<String>,
    pub value: DataValue,
}

impl StreamUpdate {
    pub fn new(value: impl Into<DataValue>) -> Self {
        Self {
            timestamp: None,
            value: value.into(),
        }
    }

    pub fn at(timestamp: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_data_value_untagged_forms() {
        let n: DataValue = serde_json::from_str("21.5").unwrap();
        assert_eq!(n, DataValue::Number(21.5));

        let t: DataValue = serde_json::from_str("\"21.5\"").unwrap();
        assert_eq!(t, DataValue::Text("21.5".to_string()));

        let b: DataValue = serde_json::from_str("true").unwrap();
        assert_eq!(b, DataValue::Bool(true));
    }

    #[test]
    fn test_stream_value_requires_both_fields() {
        let ok: StreamValue =
            serde_json::from_str(r#"{"timestamp":"2016-02-29T00:00:00.000Z","value":7}"#).unwrap();
        assert_eq!(ok.value.as_f64(), Some(7.0));

        let missing: Result<StreamValue, _> = serde_json::from_str(r#"{"value":7}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_stream_update_omits_absent_timestamp() {
        let body = serde_json::to_string(&StreamUpdate::new(42.0)).unwrap();
        assert_eq!(body, r#"{"value":42.0}"#);

        let body =
            serde_json::to_string(&StreamUpdate::at("2016-02-29T00:00:00.000Z", "on")).unwrap();
        assert_eq!(
            body,
            r#"{"timestamp":"2016-02-29T00:00:00.000Z","value":"on"}"#
        );
    }
}
