use std::collections::BTreeMap;

use ns_core::{
    AssetRecord, BranchCursor, ChoiceOption, ExecutionStep, ParsedScene, ScriptInstruction,
    SerializableGameState,
};
use serde::{Deserialize, Serialize};

use crate::state::GameStateManager;
use crate::template::{HelperRegistry, TemplateBridge};

mod boundary;
mod frame_stack;
mod lifecycle;
mod step;


/// Instructions one `continue_` may run before it reports a runaway loop.
pub const MAX_STEP_ITERATIONS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    SceneActive,
    AwaitingChoice,
    SceneComplete,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct NarrativeEngineOptions {
    pub scenes: Vec<ParsedScene>,
    pub assets: Vec<AssetRecord>,
    pub initial_state: Option<SerializableGameState>,
    /// Custom helpers, layered over the builtin set.
    pub helpers: HelperRegistry,
}

#[derive(Debug, Clone)]
struct BranchFrame {
    instructions: Vec<ScriptInstruction>,
    index: usize,
    conditional_index: usize,
    else_branch: bool,
}

#[derive(Debug, Clone)]
struct PendingChoice {
    options: Vec<ChoiceOption>,
    step: ExecutionStep,
}

#[derive(Debug)]
pub struct NarrativeEngine {
    scenes: BTreeMap<String, Vec<ScriptInstruction>>,
    scene_order: Vec<String>,
    assets: Vec<AssetRecord>,
    state: GameStateManager,
    bridge: TemplateBridge,

    frames: Vec<BranchFrame>,
    /// Saved branch cursors waiting for their scene to be loaded.
    unplaced_branches: Vec<BranchCursor>,
    pending_choice: Option<PendingChoice>,
    status: EngineStatus,
}
