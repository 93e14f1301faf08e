//! Inbound form submission and presence validation.

use crate::domain::error::RelayError;
use serde::Deserialize;
use serde_json::Value;

/// Raw request body. Fields stay untyped so that presence is judged the
/// same way for strings, numbers, booleans and nulls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionForm {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

/// A validated submission. All three fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl Submission {
    /// Build a submission directly from text fields.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, RelayError> {
        SubmissionForm {
            name: Some(Value::String(name.into())),
            email: Some(Value::String(email.into())),
            message: Some(Value::String(message.into())),
        }
        .validate()
    }
}

impl SubmissionForm {
    /// Reject the form unless every required field is present.
    pub fn validate(self) -> Result<Submission, RelayError> {
        let name = present_text(self.name);
        let email = present_text(self.email);
        let message = present_text(self.message);

        match (name, email, message) {
            (Some(name), Some(email), Some(message)) => Ok(Submission {
                name,
                email,
                message,
            }),
            _ => Err(RelayError::MissingFields),
        }
    }
}

/// Text of a field, or `None` when the value is absent or falsy
/// (`null`, `""`, `false`, `0`).
fn present_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<Submission, RelayError> {
        serde_json::from_value::<SubmissionForm>(body)
            .expect("form deserializes")
            .validate()
    }

    #[test]
    fn test_complete_form_is_accepted() {
        let submission = parse(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "message": "Hello"
        }))
        .unwrap();
        assert_eq!(submission.name, "Ada");
        assert_eq!(submission.email, "ada@example.com");
        assert_eq!(submission.message, "Hello");
    }

    #[test]
    fn test_each_missing_field_is_rejected() {
        for missing in ["name", "email", "message"] {
            let mut body = json!({"name": "Ada", "email": "a@b.c", "message": "Hi"});
            body.as_object_mut().unwrap().remove(missing);
            assert!(matches!(parse(body), Err(RelayError::MissingFields)), "{missing}");
        }
    }

    #[test]
    fn test_falsy_values_are_rejected() {
        for falsy in [json!(""), json!(null), json!(false), json!(0), json!(0.0)] {
            let body = json!({"name": falsy, "email": "a@b.c", "message": "Hi"});
            assert!(matches!(parse(body), Err(RelayError::MissingFields)));
        }
    }

    #[test]
    fn test_truthy_non_strings_are_stringified() {
        let submission = parse(json!({"name": 42, "email": true, "message": ["x"]})).unwrap();
        assert_eq!(submission.name, "42");
        assert_eq!(submission.email, "true");
        assert_eq!(submission.message, r#"["x"]"#);
    }

    #[test]
    fn test_whitespace_only_counts_as_present() {
        assert!(parse(json!({"name": " ", "email": "a@b.c", "message": "Hi"})).is_ok());
    }

    #[test]
    fn test_new_validates() {
        assert!(Submission::new("Ada", "a@b.c", "Hi").is_ok());
        assert!(Submission::new("Ada", "", "Hi").is_err());
    }
}
