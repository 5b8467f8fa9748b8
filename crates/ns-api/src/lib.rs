use std::collections::BTreeMap;

use ns_core::{
    AssetRecord, BranchCursor, ExecutionStep, GameState, NarrativeError, ParsedScene,
    SerializableGameState,
};
use ns_parser::{merge_scenes, parse_script};
use ns_runtime::{
    EngineStatus, GameStateManager, HelperRegistry, NarrativeEngine, NarrativeEngineOptions,
};

#[derive(Debug, Clone, Default)]
pub struct InterpreterOptions {
    pub assets: Vec<AssetRecord>,
    pub helpers: HelperRegistry,
    pub initial_state: Option<SerializableGameState>,
}

/// Parses every `file name -> source` entry into one scene table. Files are
/// read in name order; a scene defined twice fails at its second definition.
pub fn parse_sources(sources: &BTreeMap<String, String>) -> Result<Vec<ParsedScene>, NarrativeError> {
    let mut scenes = Vec::new();
    for (file_name, source) in sources {
        let parsed = parse_script(source, file_name)?;
        merge_scenes(&mut scenes, parsed, file_name)?;
    }
    Ok(scenes)
}

/// Host-facing entry point: load scripts, drive the step protocol, save and
/// restore state. Load failures are kept in `last_error` instead of being
/// returned, so a host can poll them from its own loop.
#[derive(Debug)]
pub struct Interpreter {
    engine: NarrativeEngine,
    last_error: Option<NarrativeError>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterOptions::default())
    }
}

impl Interpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        let engine = NarrativeEngine::new(NarrativeEngineOptions {
            scenes: Vec::new(),
            assets: options.assets,
            initial_state: options.initial_state,
            helpers: options.helpers,
        });
        Self {
            engine,
            last_error: None,
        }
    }

    /// Replaces the scene table with the scenes of one document. On failure
    /// the previous table stays loaded and `last_error` holds the cause.
    pub fn load_script(&mut self, source: &str, file_name: &str) -> bool {
        let result = parse_script(source, file_name);
        self.install_scenes(result)
    }

    pub fn load_scripts(&mut self, sources: &BTreeMap<String, String>) -> bool {
        let result = parse_sources(sources);
        self.install_scenes(result)
    }

    pub fn last_error(&self) -> Option<&NarrativeError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn set_assets(&mut self, assets: Vec<AssetRecord>) {
        self.engine.set_assets(assets);
    }

    pub fn scene_names(&self) -> Vec<String> {
        self.engine.scene_names()
    }

    pub fn has_scene(&self, name: &str) -> bool {
        self.engine.has_scene(name)
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn can_continue(&self) -> bool {
        self.engine.can_continue()
    }

    pub fn start_scene(&mut self, name: &str) -> ExecutionStep {
        self.engine.start_scene(name)
    }

    pub fn continue_(&mut self) -> ExecutionStep {
        self.engine.continue_()
    }

    pub fn choose(&mut self, index: usize) -> ExecutionStep {
        self.engine.choose(index)
    }

    pub fn game_state(&self) -> GameState {
        self.engine.game_state()
    }

    pub fn parse_template(&self, template: &str) -> Result<String, NarrativeError> {
        self.engine.parse_template(template)
    }

    pub fn save_state(&self) -> SerializableGameState {
        self.engine.save_state()
    }

    pub fn save_state_json(&self) -> Result<String, NarrativeError> {
        serde_json::to_string_pretty(&self.save_state()).map_err(|error| {
            NarrativeError::new(
                "API_STATE_SERIALIZE",
                format!("Failed to serialize game state: {}", error),
            )
        })
    }

    /// Restores a saved state, including its position when one was saved;
    /// `continue_` then resumes from there.
    pub fn load_state(&mut self, data: SerializableGameState) {
        self.engine.restore_state(data);
    }

    /// Best-effort restore from JSON text. Only unparsable text fails;
    /// missing or malformed fields fall back to empty values.
    pub fn load_state_json(&mut self, text: &str) -> bool {
        let value = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => value,
            Err(error) => {
                self.last_error = Some(NarrativeError::new(
                    "API_STATE_PARSE",
                    format!("Game state is not valid JSON: {}", error),
                ));
                return false;
            }
        };
        let mut manager = GameStateManager::new();
        manager.deserialize(&value);
        let mut data = manager.serialize();
        data.branch_stack = value
            .get("branchStack")
            .and_then(|stack| serde_json::from_value::<Vec<BranchCursor>>(stack.clone()).ok())
            .unwrap_or_default();
        self.engine.restore_state(data);
        true
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    pub fn engine(&self) -> &NarrativeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut NarrativeEngine {
        &mut self.engine
    }

    fn install_scenes(&mut self, result: Result<Vec<ParsedScene>, NarrativeError>) -> bool {
        match result {
            Ok(scenes) => {
                self.engine.set_scenes(scenes);
                self.last_error = None;
                true
            }
            Err(error) => {
                self.last_error = Some(error);
                false
            }
        }
    }
}
