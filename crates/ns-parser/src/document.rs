use ns_core::{NarrativeError, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_file_name(file_name: &str) -> Self {
        if file_name.to_ascii_lowercase().ends_with(".json") {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

/// Loads script text into a document value tree. JSON is picked by file
/// extension; everything else is read as YAML, which also accepts JSON.
pub fn load_document(source: &str, file_name: &str) -> Result<serde_json::Value, NarrativeError> {
    match DocumentFormat::from_file_name(file_name) {
        DocumentFormat::Json => serde_json::from_str(source).map_err(|error| {
            NarrativeError::parse(
                format!("Invalid JSON document: {}", error),
                SourceLocation::new(file_name, error.line(), ""),
            )
        }),
        DocumentFormat::Yaml => serde_yaml::from_str(source).map_err(|error| {
            let line = error.location().map(|location| location.line()).unwrap_or(0);
            NarrativeError::parse(
                format!("Invalid YAML document: {}", error),
                SourceLocation::new(file_name, line, ""),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_document_reads_yaml_mapping_in_document_order() {
        let document = load_document(
            "zeta:\n  - Hello\nalpha:\n  - goto: zeta\n",
            "story.yaml",
        )
        .expect("yaml should load");
        let keys = document
            .as_object()
            .expect("mapping")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["zeta".to_string(), "alpha".to_string()]);
        assert_eq!(document["alpha"][0], json!({ "goto": "zeta" }));
    }

    #[test]
    fn load_document_reads_json_by_extension() {
        let document =
            load_document(r#"{"start": ["Hi"]}"#, "story.json").expect("json should load");
        assert_eq!(document, json!({ "start": ["Hi"] }));
    }

    #[test]
    fn load_document_reports_yaml_syntax_errors_with_file() {
        let error = load_document("start:\n  - [unclosed\n", "broken.yaml")
            .expect_err("broken yaml should fail");
        assert_eq!(error.code(), "SCRIPT_PARSE_ERROR");
        let location = error.location().expect("location");
        assert_eq!(location.file, "broken.yaml");
        assert!(location.scene.is_empty());
    }

    #[test]
    fn load_document_reports_json_syntax_errors() {
        let error = load_document("{", "broken.json").expect_err("broken json should fail");
        assert_eq!(error.location().map(|l| l.file.as_str()), Some("broken.json"));
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_file_name("A.JSON"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_file_name("a.yml"), DocumentFormat::Yaml);
    }
}
