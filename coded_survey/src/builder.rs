pub use crate::config::*;

use std::sync::Arc;

/// A builder for code schemes.
///
/// Codes keep the order in which they are added, which is the order of every
/// table keyed by this scheme.
///
/// ```
/// use coded_survey::builder::{RecordBuilder, SchemeBuilder};
/// use coded_survey::ControlCode;
///
/// let gender = SchemeBuilder::new("Scheme-gender", "gender")
///     .normal("code-male", "male", &["male"])
///     .normal("code-female", "female", &["female"])
///     .control("code-stop", "STOP", ControlCode::Stop)
///     .build();
/// assert_eq!(gender.codes().len(), 3);
///
/// let individual = RecordBuilder::new()
///     .consent_withdrawn("consent_withdrawn", false)
///     .label("gender_coded", "code-male")
///     .build();
/// assert!(!individual.is_consent_withdrawn("consent_withdrawn"));
/// ```
pub struct SchemeBuilder {
    id: String,
    name: String,
    version: String,
    codes: Vec<Code>,
}

impl SchemeBuilder {
    pub fn new(id: &str, name: &str) -> SchemeBuilder {
        SchemeBuilder {
            id: id.to_string(),
            name: name.to_string(),
            version: "0.0.0".to_string(),
            codes: Vec::new(),
        }
    }

    pub fn version(self, version: &str) -> SchemeBuilder {
        SchemeBuilder {
            version: version.to_string(),
            ..self
        }
    }

    pub fn code(mut self, code: Code) -> SchemeBuilder {
        self.codes.push(code);
        self
    }

    pub fn normal(self, code_id: &str, string_value: &str, match_values: &[&str]) -> SchemeBuilder {
        self.code(Code {
            code_id: code_id.to_string(),
            code_type: CodeType::Normal,
            control_code: None,
            string_value: string_value.to_string(),
            display_text: string_value.to_string(),
            match_values: match_values.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Adds a control code. Its string value doubles as its only match value.
    pub fn control(self, code_id: &str, string_value: &str, control_code: ControlCode) -> SchemeBuilder {
        self.code(Code {
            code_id: code_id.to_string(),
            code_type: CodeType::Control,
            control_code: Some(control_code),
            string_value: string_value.to_string(),
            display_text: string_value.to_string(),
            match_values: vec![string_value.to_string()],
        })
    }

    pub fn meta(self, code_id: &str, string_value: &str) -> SchemeBuilder {
        self.code(Code {
            code_id: code_id.to_string(),
            code_type: CodeType::Meta,
            control_code: None,
            string_value: string_value.to_string(),
            display_text: string_value.to_string(),
            match_values: Vec::new(),
        })
    }

    pub fn build(self) -> CodeScheme {
        CodeScheme::new(&self.id, &self.name, &self.version, self.codes)
    }

    pub fn build_shared(self) -> Arc<CodeScheme> {
        Arc::new(self.build())
    }
}

/// A builder for records, mostly useful to assemble fixtures.
#[derive(Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    pub fn new() -> RecordBuilder {
        RecordBuilder::default()
    }

    pub fn text(mut self, key: &str, value: &str) -> RecordBuilder {
        self.record.insert(key, FieldValue::Text(value.to_string()));
        self
    }

    pub fn label(mut self, key: &str, code_id: &str) -> RecordBuilder {
        self.record.insert(key, FieldValue::Label(Label::new(code_id)));
        self
    }

    pub fn labels(mut self, key: &str, code_ids: &[&str]) -> RecordBuilder {
        self.record.insert(
            key,
            FieldValue::Labels(code_ids.iter().map(|id| Label::new(id)).collect()),
        );
        self
    }

    pub fn consent_withdrawn(self, key: &str, withdrawn: bool) -> RecordBuilder {
        self.text(key, if withdrawn { "true" } else { "false" })
    }

    pub fn build(self) -> Record {
        self.record
    }
}
