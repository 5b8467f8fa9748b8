use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NarrativeError;
use crate::value::NsValue;

pub const STATE_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub scene: String,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, scene: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            scene: scene.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} in scene \"{}\"", self.file, self.line, self.scene)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    pub target: Option<String>,
    pub condition: Option<String>,
    pub actions: Vec<serde_json::Value>,
}

impl ChoiceOption {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: None,
            condition: None,
            actions: Vec::new(),
        }
    }
}

/// Action descriptors stay as raw document values until they are dispatched,
/// so an unknown action kind is reported at the step that runs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScriptInstruction {
    Dialogue {
        speaker: Option<String>,
        text: String,
        actions: Vec<serde_json::Value>,
        choices: Option<Vec<ChoiceOption>>,
        location: SourceLocation,
    },
    Action {
        actions: Vec<serde_json::Value>,
        location: SourceLocation,
    },
    #[serde(rename_all = "camelCase")]
    Conditional {
        condition: String,
        then_branch: Vec<ScriptInstruction>,
        else_branch: Option<Vec<ScriptInstruction>>,
        location: SourceLocation,
    },
    Jump {
        target: String,
        location: SourceLocation,
    },
}

impl ScriptInstruction {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::Dialogue { location, .. }
            | Self::Action { location, .. }
            | Self::Conditional { location, .. }
            | Self::Jump { location, .. } => location,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Dialogue { .. } => "dialogue",
            Self::Action { .. } => "action",
            Self::Conditional { .. } => "conditional",
            Self::Jump { .. } => "jump",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedScene {
    pub name: String,
    pub instructions: Vec<ScriptInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedChoice {
    pub index: usize,
    pub text: String,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionStep {
    #[serde(rename_all = "camelCase")]
    DisplayDialogue {
        content: String,
        speaker: Option<String>,
        can_continue: bool,
    },
    #[serde(rename_all = "camelCase")]
    PresentingChoices {
        content: String,
        speaker: Option<String>,
        choices: Vec<PresentedChoice>,
        can_continue: bool,
    },
    SceneComplete,
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl ExecutionStep {
    pub fn step_type(&self) -> &'static str {
        match self {
            Self::DisplayDialogue { .. } => "display_dialogue",
            Self::PresentingChoices { .. } => "presenting_choices",
            Self::SceneComplete => "scene_complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn can_continue(&self) -> bool {
        match self {
            Self::DisplayDialogue { can_continue, .. }
            | Self::PresentingChoices { can_continue, .. } => *can_continue,
            Self::SceneComplete | Self::Error { .. } => false,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn from_error(error: &NarrativeError) -> Self {
        Self::Error {
            message: error.to_string(),
            code: Some(error.code().to_string()),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    pub choice_text: String,
    pub scene: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub current_scene: Option<String>,
    pub current_instruction_index: usize,
    pub variables: BTreeMap<String, NsValue>,
    pub story_flags: BTreeSet<String>,
    pub choice_history: Vec<ChoiceRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializableGameState {
    pub schema_version: String,
    pub save_date: String,
    pub variables: Vec<(String, NsValue)>,
    pub story_flags: Vec<String>,
    pub choice_history: Vec<ChoiceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_scene: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_instruction_index: Option<usize>,
    /// Open conditional branches below the scene cursor, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branch_stack: Vec<BranchCursor>,
}

/// Position inside one conditional branch. `conditional_index` points at the
/// conditional in the enclosing sequence; `index` at the next instruction of
/// the chosen branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchCursor {
    pub conditional_index: usize,
    #[serde(default)]
    pub else_branch: bool,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub data: Option<String>,
    pub url: Option<String>,
    pub src: Option<String>,
    pub size: Option<f64>,
}
