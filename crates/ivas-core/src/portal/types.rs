use serde::Deserialize;

/// One inbound SMS row from the live SMS table.
///
/// `date` is passed through exactly as the portal renders it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsMessage {
    pub number: String,
    pub message: String,
    pub date: String,
}

/// One phone number under a termination id.
#[derive(Clone, Debug, PartialEq)]
pub struct NumberRecord {
    pub number: String,
    /// Remaining fields of the JSON record, uninterpreted.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of one `data` element.
#[derive(Deserialize)]
struct RawNumberRecord {
    number: Option<RawNumber>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Text(String),
    Numeric(serde_json::Number),
}

impl NumberRecord {
    /// Build a record from one element of the portal's `data` array.
    ///
    /// Returns `None` when the element is not an object or carries no usable
    /// `number` field. Numeric numbers are rendered as strings.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        let raw: RawNumberRecord = serde_json::from_value(value).ok()?;
        let number = match raw.number? {
            RawNumber::Text(s) => s,
            RawNumber::Numeric(n) => n.to_string(),
        };
        Some(Self {
            number,
            extra: raw.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_record_keeps_extra_fields() {
        let r = NumberRecord::from_value(json!({"number": "2250700", "range": "CI", "id": 7}))
            .unwrap();
        assert_eq!(r.number, "2250700");
        assert_eq!(r.extra.get("range"), Some(&json!("CI")));
        assert_eq!(r.extra.get("id"), Some(&json!(7)));
        assert!(!r.extra.contains_key("number"));
    }

    #[test]
    fn number_record_accepts_numeric_number() {
        let r = NumberRecord::from_value(json!({"number": 4455})).unwrap();
        assert_eq!(r.number, "4455");
    }

    #[test]
    fn number_record_rejects_missing_number() {
        assert!(NumberRecord::from_value(json!({"range": "CI"})).is_none());
        assert!(NumberRecord::from_value(json!("123")).is_none());
        assert!(NumberRecord::from_value(json!({"number": null})).is_none());
        assert!(NumberRecord::from_value(json!({"number": true, "range": "CI"})).is_none());
    }
}
