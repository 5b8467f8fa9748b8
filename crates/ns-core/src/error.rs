use crate::types::SourceLocation;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NarrativeError {
    #[error("{message} (at {location})")]
    ScriptParse {
        message: String,
        location: SourceLocation,
    },
    #[error("Invalid action \"{action}\": {message}")]
    ActionValidation { action: String, message: String },
    #[error("Template render failed for \"{template}\": {message}")]
    TemplateRender { template: String, message: String },
    #[error("{code}: {message}")]
    Runtime { code: String, message: String },
}

impl NarrativeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::ScriptParse {
            message: message.into(),
            location,
        }
    }

    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionValidation {
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            template: template.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ScriptParse { .. } => "SCRIPT_PARSE_ERROR",
            Self::ActionValidation { .. } => "ACTION_VALIDATION_ERROR",
            Self::TemplateRender { .. } => "TEMPLATE_RENDER_ERROR",
            Self::Runtime { code, .. } => code.as_str(),
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::ScriptParse { location, .. } => Some(location),
            _ => None,
        }
    }
}
