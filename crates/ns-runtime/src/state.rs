use std::collections::{BTreeMap, BTreeSet};

use ns_core::{ChoiceRecord, GameState, NsValue, SerializableGameState, STATE_SCHEMA_VERSION};

use crate::helpers::value_path::{add_at_nested_path, parse_ref_path, PATH_SEPARATOR};

pub const GAME_TIME_KEY: &str = "gameTime";
pub const LEGACY_TIME_KEY: &str = "currentTime";

/// Sole owner of the mutable interpreter state. Every accessor hands out
/// owned copies; callers never hold references into the live containers.
#[derive(Debug, Clone, Default)]
pub struct GameStateManager {
    state: GameState,
}

impl GameStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_serialized(data: SerializableGameState) -> Self {
        let mut manager = Self::new();
        manager.restore(data);
        manager
    }

    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    pub fn reset(&mut self) {
        self.state = GameState::default();
    }

    pub fn current_scene(&self) -> Option<String> {
        self.state.current_scene.clone()
    }

    pub fn current_instruction_index(&self) -> usize {
        self.state.current_instruction_index
    }

    pub(crate) fn set_position(&mut self, scene: &str, index: usize) {
        self.state.current_scene = Some(scene.to_string());
        self.state.current_instruction_index = index;
    }

    pub(crate) fn advance_instruction(&mut self) {
        self.state.current_instruction_index += 1;
    }

    pub fn set_variable(&mut self, key: &str, value: NsValue) {
        self.state.variables.insert(key.to_string(), value);
    }

    pub fn get_variable(&self, key: &str) -> Option<NsValue> {
        self.state.variables.get(key).cloned()
    }

    pub fn has_variable(&self, key: &str) -> bool {
        self.state.variables.contains_key(key)
    }

    pub fn variables(&self) -> BTreeMap<String, NsValue> {
        self.state.variables.clone()
    }

    /// Adds `delta` to a number. A dotted key such as `player.level` addresses
    /// a field nested inside the `player` variable, which becomes a map if it
    /// is absent or not a map. Returns the new value.
    pub fn add_to_variable(&mut self, key: &str, delta: f64) -> f64 {
        let parts = parse_ref_path(key);
        if key.contains(PATH_SEPARATOR) {
            if let Some((root_name, nested)) = parts.split_first() {
                if !nested.is_empty() {
                    let mut root = match self.get_variable(root_name) {
                        Some(value @ NsValue::Map(_)) => value,
                        _ => NsValue::Map(BTreeMap::new()),
                    };
                    let next = add_at_nested_path(&mut root, nested, delta);
                    self.set_variable(root_name, root);
                    return next;
                }
            }
        }

        let current = self
            .state
            .variables
            .get(key)
            .and_then(NsValue::as_number)
            .unwrap_or(0.0);
        let next = current + delta;
        self.set_variable(key, NsValue::Number(next));
        next
    }

    pub fn set_story_flag(&mut self, flag: &str) {
        self.state.story_flags.insert(flag.to_string());
    }

    pub fn clear_story_flag(&mut self, flag: &str) {
        self.state.story_flags.remove(flag);
    }

    pub fn has_story_flag(&self, flag: &str) -> bool {
        self.state.story_flags.contains(flag)
    }

    pub fn story_flags(&self) -> BTreeSet<String> {
        self.state.story_flags.clone()
    }

    pub fn add_choice(&mut self, record: ChoiceRecord) {
        self.state.choice_history.push(record);
    }

    pub fn choice_history(&self) -> Vec<ChoiceRecord> {
        self.state.choice_history.clone()
    }

    pub fn player_chose(&self, choice_text: &str, scene: Option<&str>) -> bool {
        self.state.choice_history.iter().any(|record| {
            record.choice_text == choice_text
                && scene.map_or(true, |scene| record.scene == scene)
        })
    }

    /// Returns the list stored under `name`, or an empty list when the
    /// variable is absent or holds something else.
    pub fn get_list(&self, name: &str) -> Vec<NsValue> {
        match self.state.variables.get(name) {
            Some(NsValue::Array(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    pub fn set_list(&mut self, name: &str, values: Vec<NsValue>) {
        self.set_variable(name, NsValue::Array(values));
    }

    pub fn add_to_list(&mut self, name: &str, value: NsValue) {
        let mut values = self.get_list(name);
        values.push(value);
        self.set_list(name, values);
    }

    /// Advances the clock, keeping the legacy time key equal to the canonical one.
    pub fn add_time(&mut self, minutes: f64) -> f64 {
        let next = self.get_current_time() + minutes;
        self.set_variable(GAME_TIME_KEY, NsValue::Number(next));
        self.set_variable(LEGACY_TIME_KEY, NsValue::Number(next));
        next
    }

    pub fn get_current_time(&self) -> f64 {
        self.state
            .variables
            .get(GAME_TIME_KEY)
            .and_then(NsValue::as_number)
            .or_else(|| {
                self.state
                    .variables
                    .get(LEGACY_TIME_KEY)
                    .and_then(NsValue::as_number)
            })
            .unwrap_or(0.0)
    }

    pub fn serialize(&self) -> SerializableGameState {
        SerializableGameState {
            schema_version: STATE_SCHEMA_VERSION.to_string(),
            save_date: chrono::Utc::now().to_rfc3339(),
            variables: self
                .state
                .variables
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            story_flags: self.state.story_flags.iter().cloned().collect(),
            choice_history: self.state.choice_history.clone(),
            current_scene: self.state.current_scene.clone(),
            current_instruction_index: self
                .state
                .current_scene
                .as_ref()
                .map(|_| self.state.current_instruction_index),
            branch_stack: Vec::new(),
        }
    }

    pub fn restore(&mut self, data: SerializableGameState) {
        if !data.schema_version.is_empty() && data.schema_version != STATE_SCHEMA_VERSION {
            log::warn!(
                "restoring game state saved with schema {} (expected {})",
                data.schema_version,
                STATE_SCHEMA_VERSION
            );
        }
        self.state = GameState {
            current_scene: data.current_scene,
            current_instruction_index: data.current_instruction_index.unwrap_or(0),
            variables: data.variables.into_iter().collect(),
            story_flags: data.story_flags.into_iter().collect(),
            choice_history: data.choice_history,
        };
    }

    /// Best-effort restore from an untyped payload. Never fails: fields that
    /// are missing or malformed fall back to empty values.
    pub fn deserialize(&mut self, data: &serde_json::Value) {
        let mut state = GameState::default();
        let Some(object) = data.as_object() else {
            log::warn!("game state payload is not an object; starting from an empty state");
            self.state = state;
            return;
        };

        if let Some(version) = object.get("schemaVersion").and_then(|v| v.as_str()) {
            if version != STATE_SCHEMA_VERSION {
                log::warn!("reading game state schema {} by field matching", version);
            }
        }

        match object.get("variables") {
            Some(serde_json::Value::Array(pairs)) => {
                for pair in pairs {
                    match read_variable_pair(pair) {
                        Some((key, value)) => {
                            state.variables.insert(key, value);
                        }
                        None => log::warn!("dropping malformed variable entry {}", pair),
                    }
                }
            }
            Some(serde_json::Value::Object(entries)) => {
                for (key, value) in entries {
                    if let Some(value) = NsValue::from_json(value) {
                        state.variables.insert(key.clone(), value);
                    }
                }
            }
            _ => {}
        }

        if let Some(flags) = object.get("storyFlags").and_then(|v| v.as_array()) {
            state.story_flags = flags
                .iter()
                .filter_map(|flag| flag.as_str().map(ToString::to_string))
                .collect();
        }

        if let Some(history) = object.get("choiceHistory").and_then(|v| v.as_array()) {
            state.choice_history = history
                .iter()
                .filter_map(|entry| serde_json::from_value::<ChoiceRecord>(entry.clone()).ok())
                .collect();
        }

        state.current_scene = object
            .get("currentScene")
            .and_then(|v| v.as_str())
            .map(ToString::to_string);
        state.current_instruction_index = object
            .get("currentInstructionIndex")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        self.state = state;
    }
}

fn read_variable_pair(pair: &serde_json::Value) -> Option<(String, NsValue)> {
    let [key, value] = pair.as_array()?.as_slice() else {
        return None;
    };
    Some((key.as_str()?.to_string(), NsValue::from_json(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(manager: &GameStateManager, key: &str) -> Option<f64> {
        manager.get_variable(key).and_then(|value| value.as_number())
    }

    #[test]
    fn add_to_variable_starts_from_zero_and_accumulates() {
        let mut manager = GameStateManager::new();
        assert_eq!(manager.add_to_variable("gold", 7.0), 7.0);
        assert_eq!(number(&manager, "gold"), Some(7.0));
        manager.add_to_variable("gold", -2.5);
        assert_eq!(number(&manager, "gold"), Some(4.5));
    }

    #[test]
    fn add_to_variable_treats_non_numeric_values_as_zero() {
        let mut manager = GameStateManager::new();
        manager.set_variable("gold", NsValue::String("lots".to_string()));
        manager.add_to_variable("gold", 3.0);
        assert_eq!(number(&manager, "gold"), Some(3.0));
    }

    #[test]
    fn add_to_variable_walks_dotted_paths() {
        let mut manager = GameStateManager::new();
        manager.add_to_variable("player.level", 5.0);
        let player = manager.get_variable("player").expect("player should exist");
        assert_eq!(
            player.as_map().and_then(|m| m.get("level")),
            Some(&NsValue::Number(5.0))
        );

        manager.add_to_variable("player.level", 3.0);
        let player = manager.get_variable("player").expect("player should exist");
        assert_eq!(
            player.as_map().and_then(|m| m.get("level")),
            Some(&NsValue::Number(8.0))
        );
    }

    #[test]
    fn add_to_variable_coerces_non_map_root() {
        let mut manager = GameStateManager::new();
        manager.set_variable("player", NsValue::Number(1.0));
        manager.add_to_variable("player.stats.hp", 10.0);
        let player = manager.get_variable("player").expect("player");
        let stats = player.as_map().and_then(|m| m.get("stats")).expect("stats");
        assert_eq!(
            stats.as_map().and_then(|m| m.get("hp")),
            Some(&NsValue::Number(10.0))
        );
    }

    #[test]
    fn story_flags_are_idempotent() {
        let mut manager = GameStateManager::new();
        manager.set_story_flag("met_guard");
        manager.set_story_flag("met_guard");
        assert_eq!(manager.story_flags().len(), 1);
        assert!(manager.has_story_flag("met_guard"));
        manager.clear_story_flag("met_guard");
        manager.clear_story_flag("met_guard");
        assert!(!manager.has_story_flag("met_guard"));
    }

    #[test]
    fn player_chose_matches_text_and_optional_scene() {
        let mut manager = GameStateManager::new();
        manager.add_choice(ChoiceRecord {
            choice_text: "Open the door".to_string(),
            scene: "hall".to_string(),
            timestamp: None,
        });
        assert!(manager.player_chose("Open the door", None));
        assert!(manager.player_chose("Open the door", Some("hall")));
        assert!(!manager.player_chose("Open the door", Some("cellar")));
        assert!(!manager.player_chose("Leave", None));
    }

    #[test]
    fn returned_containers_are_independent_copies() {
        let mut manager = GameStateManager::new();
        manager.add_to_list("inventory", NsValue::String("key".to_string()));
        let mut copy = manager.get_list("inventory");
        copy.push(NsValue::String("sword".to_string()));
        assert_eq!(manager.get_list("inventory").len(), 1);

        let mut history = manager.choice_history();
        history.push(ChoiceRecord {
            choice_text: "x".to_string(),
            scene: "y".to_string(),
            timestamp: None,
        });
        assert!(manager.choice_history().is_empty());
    }

    #[test]
    fn get_list_defaults_to_empty_for_non_lists() {
        let mut manager = GameStateManager::new();
        assert!(manager.get_list("missing").is_empty());
        manager.set_variable("gold", NsValue::Number(1.0));
        assert!(manager.get_list("gold").is_empty());
        manager.add_to_list("gold", NsValue::Number(2.0));
        assert_eq!(manager.get_list("gold"), vec![NsValue::Number(2.0)]);
    }

    #[test]
    fn add_time_keeps_both_time_keys_in_sync() {
        let mut manager = GameStateManager::new();
        assert_eq!(manager.get_current_time(), 0.0);
        manager.add_time(30.0);
        assert_eq!(number(&manager, GAME_TIME_KEY), Some(30.0));
        assert_eq!(number(&manager, LEGACY_TIME_KEY), Some(30.0));
        manager.add_time(15.0);
        assert_eq!(number(&manager, GAME_TIME_KEY), Some(45.0));
        assert_eq!(number(&manager, LEGACY_TIME_KEY), Some(45.0));
        assert_eq!(manager.get_current_time(), 45.0);
    }

    #[test]
    fn get_current_time_falls_back_to_legacy_key() {
        let mut manager = GameStateManager::new();
        manager.set_variable(LEGACY_TIME_KEY, NsValue::Number(12.0));
        assert_eq!(manager.get_current_time(), 12.0);
        manager.add_time(3.0);
        assert_eq!(number(&manager, GAME_TIME_KEY), Some(15.0));
    }

    #[test]
    fn serialize_round_trip_preserves_variables_and_flags() {
        let mut manager = GameStateManager::new();
        manager.set_variable("name", NsValue::String("Ada".to_string()));
        manager.add_to_variable("player.level", 2.0);
        manager.add_to_list("items", NsValue::String("lamp".to_string()));
        manager.set_story_flag("intro_done");
        manager.set_position("hall", 3);

        let saved = manager.serialize();
        assert_eq!(saved.schema_version, STATE_SCHEMA_VERSION);
        assert!(!saved.save_date.is_empty());

        let restored = GameStateManager::from_serialized(saved.clone());
        assert_eq!(restored.variables(), manager.variables());
        assert_eq!(restored.story_flags(), manager.story_flags());
        assert_eq!(restored.current_scene().as_deref(), Some("hall"));
        assert_eq!(restored.current_instruction_index(), 3);

        let payload = serde_json::to_value(&saved).expect("state should serialize");
        let mut from_json = GameStateManager::new();
        from_json.deserialize(&payload);
        assert_eq!(from_json.variables(), manager.variables());
        assert_eq!(from_json.story_flags(), manager.story_flags());
    }

    #[test]
    fn deserialize_never_fails_on_partial_or_malformed_payloads() {
        let mut manager = GameStateManager::new();
        manager.set_story_flag("stale");
        manager.deserialize(&json!("not an object"));
        assert!(manager.story_flags().is_empty());

        manager.deserialize(&json!({
            "schemaVersion": "9.9.9",
            "variables": [["gold", 4], ["broken"], [1, 2], ["nothing", null]],
            "storyFlags": ["a", 3],
            "choiceHistory": [{ "choiceText": "Go", "scene": "s" }, { "bad": true }],
            "futureField": { "ignored": true },
        }));
        assert_eq!(number(&manager, "gold"), Some(4.0));
        assert_eq!(manager.variables().len(), 1);
        assert_eq!(manager.story_flags().len(), 1);
        assert_eq!(manager.choice_history().len(), 1);
        assert!(manager.current_scene().is_none());
        assert_eq!(manager.current_instruction_index(), 0);
    }
}
