use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied resume data for one render call.
///
/// Arbitrary JSON: `personalInfo`, `experience`, `education`, `skills`,
/// `languages`, `certifications`, `customSections`, plus whatever a template
/// chooses to read. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeData(Value);

impl ResumeData {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// True when the caller sent no data at all (as opposed to `{}`).
    pub fn is_absent(&self) -> bool {
        self.0.is_null()
    }

    /// Scope used by builder and canvas templates: the fields of `personalInfo`
    /// are also reachable from the root (`{{firstName}}`). On a name clash the
    /// `personalInfo` value replaces the root one.
    pub fn flattened(&self) -> Value {
        let Value::Object(root) = &self.0 else {
            return self.0.clone();
        };
        let mut scope = root.clone();
        if let Some(Value::Object(personal)) = root.get("personalInfo") {
            for (key, value) in personal {
                scope.insert(key.clone(), value.clone());
            }
        }
        Value::Object(scope)
    }
}

impl From<Value> for ResumeData {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_lifts_personal_info() {
        let data = ResumeData::new(json!({
            "personalInfo": { "firstName": "Emma", "email": "emma@example.com" }
        }));
        let scope = data.flattened();
        assert_eq!(scope["firstName"], "Emma");
        assert_eq!(scope["personalInfo"]["email"], "emma@example.com");
    }

    #[test]
    fn test_flattened_personal_info_wins() {
        let data = ResumeData::new(json!({
            "email": "root@example.com",
            "summary": "root",
            "personalInfo": { "email": "nested@example.com", "summary": "nested" }
        }));
        let scope = data.flattened();
        assert_eq!(scope["email"], "nested@example.com");
        assert_eq!(scope["summary"], "nested");
        assert_eq!(scope["personalInfo"]["email"], "nested@example.com");
    }

    #[test]
    fn test_absent_vs_empty() {
        assert!(ResumeData::default().is_absent());
        assert!(!ResumeData::new(json!({})).is_absent());
    }
}
