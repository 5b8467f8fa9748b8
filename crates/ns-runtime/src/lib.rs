mod helpers {
    pub(crate) mod builtins;
    pub(crate) mod rhai_bridge;
    pub(crate) mod value_path;
}

pub mod actions;
pub mod assets;
pub mod engine;
pub mod state;
pub mod template;

pub use actions::{apply_actions, Action};
pub use assets::{asset_source, find_asset, normalize_key};
pub use engine::{EngineStatus, NarrativeEngine, NarrativeEngineOptions, MAX_STEP_ITERATIONS};
pub use state::{GameStateManager, GAME_TIME_KEY, LEGACY_TIME_KEY};
pub use template::{HelperFn, HelperRegistry, HelperResult, RenderContext, TemplateBridge};
