use std::collections::BTreeMap;

use ns_core::{
    AssetRecord, ExecutionStep, GameState, NarrativeError, ParsedScene, SerializableGameState,
};

use super::{EngineStatus, NarrativeEngine, NarrativeEngineOptions};
use crate::state::GameStateManager;
use crate::template::{HelperRegistry, TemplateBridge};

impl NarrativeEngine {
    pub fn new(options: NarrativeEngineOptions) -> Self {
        let mut registry = HelperRegistry::with_builtins();
        registry.extend_from(&options.helpers);
        let bridge = TemplateBridge::new(registry);
        bridge.set_assets(options.assets.clone());

        let branch_stack = options
            .initial_state
            .as_ref()
            .map(|data| data.branch_stack.clone())
            .unwrap_or_default();
        let state = options
            .initial_state
            .map(GameStateManager::from_serialized)
            .unwrap_or_default();

        let mut engine = Self {
            scenes: BTreeMap::new(),
            scene_order: Vec::new(),
            assets: options.assets,
            state,
            bridge,
            frames: Vec::new(),
            unplaced_branches: Vec::new(),
            pending_choice: None,
            status: EngineStatus::Idle,
        };
        engine.set_scenes(options.scenes);
        engine.restore_frames(&branch_stack);
        engine
    }

    /// Replaces the scene table. A repeated name keeps its first position in
    /// `scene_names` and the body of its last definition. Game state is kept.
    pub fn set_scenes(&mut self, scenes: Vec<ParsedScene>) {
        self.scenes.clear();
        self.scene_order.clear();
        for scene in scenes {
            if !self.scenes.contains_key(&scene.name) {
                self.scene_order.push(scene.name.clone());
            }
            self.scenes.insert(scene.name, scene.instructions);
        }
        self.frames.clear();
        self.pending_choice = None;
        self.status = EngineStatus::Idle;

        let unplaced = std::mem::take(&mut self.unplaced_branches);
        if !unplaced.is_empty() {
            self.restore_frames(&unplaced);
        }
    }

    pub fn set_assets(&mut self, assets: Vec<AssetRecord>) {
        self.bridge.set_assets(assets.clone());
        self.assets = assets;
    }

    pub fn assets(&self) -> &[AssetRecord] {
        &self.assets
    }

    pub fn scene_names(&self) -> Vec<String> {
        self.scene_order.clone()
    }

    pub fn has_scene(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn game_state(&self) -> GameState {
        self.state.snapshot()
    }

    pub fn state_manager(&self) -> &GameStateManager {
        &self.state
    }

    /// Direct state access for hosts. Any in-flight choice or branch is
    /// dropped because it may no longer match the new state.
    pub fn state_manager_mut(&mut self) -> &mut GameStateManager {
        self.frames.clear();
        self.unplaced_branches.clear();
        self.pending_choice = None;
        if self.status == EngineStatus::AwaitingChoice {
            self.status = EngineStatus::Idle;
        }
        &mut self.state
    }

    /// Replaces the game state, including a saved position if present. The
    /// engine goes idle; `continue_` resumes from the restored position.
    pub fn restore_state(&mut self, mut data: SerializableGameState) {
        let branch_stack = std::mem::take(&mut data.branch_stack);
        self.state.restore(data);
        self.pending_choice = None;
        self.status = EngineStatus::Idle;
        self.restore_frames(&branch_stack);
    }

    /// Serializable state including the open branch positions, so a save
    /// taken inside a conditional resumes inside it.
    pub fn save_state(&self) -> SerializableGameState {
        let mut data = self.state.serialize();
        data.branch_stack = if self.frames.is_empty() {
            self.unplaced_branches.clone()
        } else {
            self.branch_stack()
        };
        data
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.frames.clear();
        self.unplaced_branches.clear();
        self.pending_choice = None;
        self.status = EngineStatus::Idle;
    }

    pub fn parse_template(&self, template: &str) -> Result<String, NarrativeError> {
        self.render(template)
    }

    pub fn start_scene(&mut self, name: &str) -> ExecutionStep {
        if !self.has_scene(name) {
            let error = NarrativeError::new(
                "ENGINE_SCENE_NOT_FOUND",
                format!("Scene \"{}\" not found.", name),
            );
            log::warn!("start_scene rejected: {}", error);
            return ExecutionStep::from_error(&error);
        }

        log::debug!("starting scene \"{}\"", name);
        self.state.set_position(name, 0);
        self.frames.clear();
        self.unplaced_branches.clear();
        self.pending_choice = None;
        self.status = EngineStatus::SceneActive;
        let result = self.run_until_boundary();
        self.finish(result)
    }

    pub(super) fn finish(&mut self, result: Result<ExecutionStep, NarrativeError>) -> ExecutionStep {
        match result {
            Ok(step) => step,
            Err(error) => {
                log::warn!("step failed: {}", error);
                self.status = EngineStatus::Error;
                self.pending_choice = None;
                ExecutionStep::from_error(&error)
            }
        }
    }

    pub(super) fn render(&self, template: &str) -> Result<String, NarrativeError> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }
        self.bridge.set_state(self.state.clone());
        self.bridge.render(template)
    }

    pub(super) fn evaluate_condition(&self, expression: &str) -> Result<bool, NarrativeError> {
        self.bridge.set_state(self.state.clone());
        self.bridge.evaluate_condition(expression)
    }
}
