use std::collections::BTreeMap;

use ns_core::{ExecutionStep, SerializableGameState};
use serde::{Deserialize, Serialize};

pub(crate) const PLAYER_STATE_SCHEMA: &str = "player-state.v1";
pub(crate) const DEFAULT_ENTRY_SCENE: &str = "start";

#[derive(Debug, Clone)]
pub(crate) struct LoadedScenario {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) sources: BTreeMap<String, String>,
    pub(crate) entry_scene: String,
}

/// Agent save file. `game_state` carries the scene cursor and any open
/// branches, so a pending choice is found again by continuing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerState {
    pub(crate) schema_version: String,
    pub(crate) scenario_id: String,
    pub(crate) entry_scene: String,
    pub(crate) game_state: SerializableGameState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryEvent {
    Choices,
    End,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundaryResult {
    pub(crate) event: BoundaryEvent,
    pub(crate) texts: Vec<String>,
    pub(crate) choices: Vec<(usize, String)>,
    pub(crate) choice_prompt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlayCommandAction {
    NotHandled,
    Continue,
    /// The session was replaced; play on from this step.
    Refresh(ExecutionStep),
    Quit,
}

pub(crate) struct PlayCommandContext<'a> {
    pub(crate) state_file: &'a str,
    pub(crate) scenario: &'a LoadedScenario,
}
