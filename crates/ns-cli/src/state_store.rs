use std::fs;
use std::path::Path;

use ns_core::NarrativeError;

use crate::{
    map_cli_state_encode, map_cli_state_invalid, map_cli_state_read, map_cli_state_write,
    PlayerState, PLAYER_STATE_SCHEMA,
};

pub(crate) fn save_player_state(path: &Path, state: &PlayerState) -> Result<(), NarrativeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(map_cli_state_write)?;

    let payload = serde_json::to_string_pretty(state).map_err(map_cli_state_encode)?;
    fs::write(path, payload).map_err(map_cli_state_write)
}

pub(crate) fn load_player_state(path: &Path) -> Result<PlayerState, NarrativeError> {
    if !path.exists() {
        return Err(NarrativeError::new(
            "CLI_STATE_NOT_FOUND",
            format!("State file does not exist: {}", path.display()),
        ));
    }

    let raw = fs::read_to_string(path).map_err(map_cli_state_read)?;

    let state: PlayerState = serde_json::from_str(&raw).map_err(map_cli_state_invalid)?;

    if state.schema_version != PLAYER_STATE_SCHEMA {
        return Err(NarrativeError::new(
            "CLI_STATE_SCHEMA",
            format!("Unsupported player state schema: {}", state.schema_version),
        ));
    }

    Ok(state)
}

#[cfg(test)]
mod state_store_tests {
    use super::*;
    use crate::cli_test_support::*;
    use ns_core::{NsValue, SerializableGameState};

    fn sample_state() -> PlayerState {
        PlayerState {
            schema_version: PLAYER_STATE_SCHEMA.to_string(),
            scenario_id: "scripts:/tmp/demo".to_string(),
            entry_scene: "start".to_string(),
            game_state: SerializableGameState {
                schema_version: "1.0.0".to_string(),
                variables: vec![("gold".to_string(), NsValue::Number(5.0))],
                current_scene: Some("start".to_string()),
                current_instruction_index: Some(2),
                ..SerializableGameState::default()
            },
        }
    }

    #[test]
    fn save_and_load_player_state_roundtrip() {
        let state_path = temp_path("player-state.json");
        let state = sample_state();
        save_player_state(&state_path, &state).expect("save should pass");

        let loaded = load_player_state(&state_path).expect("load should pass");
        assert_eq!(loaded.schema_version, PLAYER_STATE_SCHEMA);
        assert_eq!(loaded.scenario_id, state.scenario_id);
        assert_eq!(loaded.game_state, state.game_state);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&state_path).expect("read state"))
                .expect("state json should parse");
        assert_eq!(raw["gameState"]["currentInstructionIndex"], 2);
        assert_eq!(raw["entryScene"], "start");
    }

    #[test]
    fn load_player_state_validates_file_and_schema() {
        let state_path = temp_path("player-state-schema.json");
        let mut bad = serde_json::to_value(sample_state()).expect("state should serialize");
        bad["schemaVersion"] = serde_json::Value::String("player-state.bad".to_string());
        write_file(
            &state_path,
            &serde_json::to_string(&bad).expect("json should serialize"),
        );
        let error = load_player_state(&state_path).expect_err("bad schema should fail");
        assert_eq!(error.code(), "CLI_STATE_SCHEMA");

        let garbage = temp_path("player-state-garbage.json");
        write_file(&garbage, "{ not json");
        let error = load_player_state(&garbage).expect_err("garbage should fail");
        assert_eq!(error.code(), "CLI_STATE_INVALID");

        let not_found = temp_path("missing-player-state.json");
        let error = load_player_state(&not_found).expect_err("missing file should fail");
        assert_eq!(error.code(), "CLI_STATE_NOT_FOUND");

        let write_root_error =
            save_player_state(Path::new("/"), &sample_state()).expect_err("writing root should fail");
        assert_eq!(write_root_error.code(), "CLI_STATE_WRITE");
    }
}
