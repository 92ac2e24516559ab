//! Sample processor for JSON person records.
//!
//! Records without a positive revenue are dropped. When the run asks for
//! anonymization, names and emails are replaced by placeholders and birthdays
//! are removed. Fields the processor does not know about pass through.

use async_trait::async_trait;
use intake_staging::RunParameters;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProcessorError;
use crate::processor::Processor;

/// A single person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default)]
    pub revenue: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Filters and optionally anonymizes person records.
#[derive(Debug, Clone)]
pub struct PersonAnonymizer {
    placeholder_name: String,
    placeholder_email: String,
}

impl PersonAnonymizer {
    pub fn new() -> Self {
        Self {
            placeholder_name: "John Doe".to_string(),
            placeholder_email: "john.doe@domain.xyz".to_string(),
        }
    }

    /// Set the name written in place of real names.
    pub fn with_placeholder_name(mut self, name: impl Into<String>) -> Self {
        self.placeholder_name = name.into();
        self
    }

    /// Set the email written in place of real emails.
    pub fn with_placeholder_email(mut self, email: impl Into<String>) -> Self {
        self.placeholder_email = email.into();
        self
    }

    /// Whether a record is kept in the output.
    pub fn accepts(&self, person: &Person) -> bool {
        person.revenue > 0.0
    }

    /// Replace personal fields with placeholders.
    pub fn anonymize(&self, mut person: Person) -> Person {
        person.name.clone_from(&self.placeholder_name);
        person.email.clone_from(&self.placeholder_email);
        person.birthday = None;
        person
    }

    /// Apply filtering and, when requested, anonymization.
    pub fn transform(&self, persons: Vec<Person>, anonymize: bool) -> Vec<Person> {
        persons
            .into_iter()
            .filter(|p| self.accepts(p))
            .map(|p| if anonymize { self.anonymize(p) } else { p })
            .collect()
    }
}

impl Default for PersonAnonymizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for PersonAnonymizer {
    fn name(&self) -> &str {
        "person-anonymizer"
    }

    async fn process(
        &self,
        input: &[u8],
        params: &RunParameters,
    ) -> std::result::Result<Vec<u8>, ProcessorError> {
        let value: serde_json::Value = serde_json::from_slice(input)?;
        if !value.is_array() {
            return Err(ProcessorError::InvalidInput(
                "expected a JSON array of person records".to_string(),
            ));
        }
        let persons: Vec<Person> = serde_json::from_value(value)?;
        let total = persons.len();

        let output = self.transform(persons, params.anonymize);
        debug!(
            "Kept {} of {} records (anonymize: {})",
            output.len(),
            total,
            params.anonymize
        );

        Ok(serde_json::to_vec_pretty(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PERSONS: &str = r#"[
        {"name": "Wei Lang", "email": "Wei.Lang@domain.xyz",
         "birthday": "1985-04-12", "revenue": 10.0},
        {"name": "Daliah Shah", "email": "Daliah.Shah@domain.xyz", "revenue": 0, "vip": true}
    ]"#;

    #[tokio::test]
    async fn test_filters_without_anonymizing() {
        let output = PersonAnonymizer::new()
            .process(PERSONS.as_bytes(), &RunParameters::new())
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Wei Lang"));
        assert!(text.contains("1985-04-12"));
        assert!(!text.contains("Daliah Shah"));
    }

    #[tokio::test]
    async fn test_anonymizes_personal_fields() {
        let params = RunParameters::new().with_anonymize(true);
        let output = PersonAnonymizer::new()
            .process(PERSONS.as_bytes(), &params)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("John Doe"));
        assert!(!text.contains("Wei Lang"));
        assert!(!text.contains("Wei.Lang@domain.xyz"));
        assert!(!text.contains("1985-04-12"));
        assert!(!text.contains("Daliah"));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let persons: Vec<Person> = serde_json::from_str(
            r#"[{"name": "A", "email": "a@b.c", "revenue": 1, "customerId": "C-1"}]"#,
        )
        .unwrap();
        let output = PersonAnonymizer::new().transform(persons, true);

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].extra["customerId"], "C-1");
        assert_eq!(output[0].name, "John Doe");
    }

    #[tokio::test]
    async fn test_rejects_non_array_input() {
        let result = PersonAnonymizer::new()
            .process(br#"{"name": "Wei Lang"}"#, &RunParameters::new())
            .await;
        assert!(matches!(result, Err(ProcessorError::InvalidInput(_))));

        let result = PersonAnonymizer::new()
            .process(b"not json", &RunParameters::new())
            .await;
        assert!(matches!(result, Err(ProcessorError::Serialization(_))));
    }

    #[test]
    fn test_custom_placeholders() {
        let anonymizer = PersonAnonymizer::new()
            .with_placeholder_name("Jane Roe")
            .with_placeholder_email("jane.roe@example.org");
        let person = Person {
            name: "Wei Lang".to_string(),
            email: "Wei.Lang@domain.xyz".to_string(),
            birthday: Some("1985-04-12".to_string()),
            revenue: 1.0,
            extra: serde_json::Map::new(),
        };

        let anonymized = anonymizer.anonymize(person);
        assert_eq!(anonymized.name, "Jane Roe");
        assert_eq!(anonymized.email, "jane.roe@example.org");
        assert_eq!(anonymized.birthday, None);
    }
}
