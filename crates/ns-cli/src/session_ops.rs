use std::path::Path;

use ns_api::Interpreter;
use ns_core::{ExecutionStep, NarrativeError};

use crate::{
    emit_boundary, load_player_state, load_source_by_ref, map_step_error, save_player_state,
    BoundaryEvent, BoundaryResult, LoadedScenario, PlayerState, PLAYER_STATE_SCHEMA,
};

pub(crate) fn create_interpreter_for_scenario(
    scenario: &LoadedScenario,
) -> Result<Interpreter, NarrativeError> {
    let mut interpreter = Interpreter::default();
    if !interpreter.load_scripts(&scenario.sources) {
        return Err(interpreter.last_error().cloned().unwrap_or_else(|| {
            NarrativeError::new("CLI_SOURCE_LOAD", "Scripts failed to load.")
        }));
    }
    Ok(interpreter)
}

pub(crate) fn resume_interpreter_for_state(
    scenario: &LoadedScenario,
    state: &PlayerState,
) -> Result<Interpreter, NarrativeError> {
    let mut interpreter = create_interpreter_for_scenario(scenario)?;
    interpreter.load_state(state.game_state.clone());
    Ok(interpreter)
}

/// Re-enters a restored session at its pending choice.
pub(crate) fn resume_pending_choice(
    interpreter: &mut Interpreter,
) -> Result<ExecutionStep, NarrativeError> {
    match interpreter.continue_() {
        step @ ExecutionStep::PresentingChoices { .. } => Ok(step),
        ExecutionStep::Error { message, code } => {
            Err(map_step_error(&message, code.as_deref()))
        }
        other => Err(NarrativeError::new(
            "CLI_STATE_NO_CHOICE",
            format!(
                "Saved state does not resume at a choice (got {}).",
                other.step_type()
            ),
        )),
    }
}

pub(crate) fn save_interpreter_state(
    path: &Path,
    interpreter: &Interpreter,
    scenario: &LoadedScenario,
) -> Result<(), NarrativeError> {
    let state = PlayerState {
        schema_version: PLAYER_STATE_SCHEMA.to_string(),
        scenario_id: scenario.id.clone(),
        entry_scene: scenario.entry_scene.clone(),
        game_state: interpreter.save_state(),
    };
    save_player_state(path, &state)
}

pub(crate) fn load_interpreter_from_state_for_ref(
    path: &Path,
) -> Result<(LoadedScenario, PlayerState, Interpreter), NarrativeError> {
    let state = load_player_state(path)?;
    let scenario = load_source_by_ref(&state.scenario_id, &state.entry_scene)?;
    let interpreter = resume_interpreter_for_state(&scenario, &state)?;
    Ok((scenario, state, interpreter))
}

pub(crate) fn load_interpreter_from_state_for_scenario(
    path: &Path,
    scenario: &LoadedScenario,
) -> Result<(PlayerState, Interpreter), NarrativeError> {
    let state = load_player_state(path)?;
    if state.scenario_id != scenario.id {
        return Err(NarrativeError::new(
            "CLI_STATE_SCENARIO_MISMATCH",
            format!(
                "State scenario mismatch. expected={} actual={}",
                scenario.id, state.scenario_id
            ),
        ));
    }
    let interpreter = resume_interpreter_for_state(scenario, &state)?;
    Ok((state, interpreter))
}

pub(crate) fn emit_boundary_with_saved_state(
    interpreter: &Interpreter,
    boundary: BoundaryResult,
    state_out: &str,
    scenario: &LoadedScenario,
) -> Result<i32, NarrativeError> {
    if boundary.event == BoundaryEvent::Choices {
        save_interpreter_state(Path::new(state_out), interpreter, scenario)?;
        emit_boundary(boundary, Some(state_out.to_string()));
        return Ok(0);
    }

    emit_boundary(boundary, None);
    Ok(0)
}

#[cfg(test)]
mod session_ops_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::{load_source_by_scripts_path, run_to_boundary};

    #[test]
    fn session_helpers_cover_create_save_load_and_emit_paths() {
        let scenario = load_source_by_scripts_path(&demo_scripts_dir("02-crossroads"), "start")
            .expect("scenario should load");

        let mut interpreter =
            create_interpreter_for_scenario(&scenario).expect("interpreter should build");
        let first = interpreter.start_scene("start");
        let boundary = run_to_boundary(&mut interpreter, first).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::Choices);

        let state_file = temp_path("session-ops-state.json");
        save_interpreter_state(&state_file, &interpreter, &scenario)
            .expect("state save should pass");

        let (_loaded, state, mut resumed) =
            load_interpreter_from_state_for_ref(&state_file).expect("state ref load should pass");
        assert_eq!(state.scenario_id, scenario.id);
        let pending = resume_pending_choice(&mut resumed).expect("choice should be pending");
        assert_eq!(pending.step_type(), "presenting_choices");

        let (_state, mut resumed_for_scenario) =
            load_interpreter_from_state_for_scenario(&state_file, &scenario)
                .expect("state scenario load should pass");
        assert!(resume_pending_choice(&mut resumed_for_scenario).is_ok());

        let emit_code = emit_boundary_with_saved_state(
            &interpreter,
            boundary,
            state_file.to_string_lossy().as_ref(),
            &scenario,
        )
        .expect("emit with save should pass");
        assert_eq!(emit_code, 0);
    }

    #[test]
    fn load_interpreter_from_state_for_scenario_rejects_mismatch() {
        let scenario = load_source_by_scripts_path(&demo_scripts_dir("02-crossroads"), "start")
            .expect("scenario load");
        let other = load_source_by_scripts_path(&demo_scripts_dir("03-market-day"), "start")
            .expect("other load");

        let interpreter = create_interpreter_for_scenario(&other).expect("interpreter build");
        let state_file = temp_path("session-ops-mismatch-state.json");
        save_interpreter_state(&state_file, &interpreter, &other).expect("state save");

        let error = match load_interpreter_from_state_for_scenario(&state_file, &scenario) {
            Ok(_) => panic!("mismatch should fail"),
            Err(error) => error,
        };
        assert_eq!(error.code(), "CLI_STATE_SCENARIO_MISMATCH");
    }

    #[test]
    fn broken_scripts_surface_the_parse_error() {
        let file = temp_path("broken.yaml");
        write_file(&file, "start:\n  - 42\n");
        let scenario = load_source_by_scripts_path(&file.to_string_lossy(), "start")
            .expect("source should load");
        let error = create_interpreter_for_scenario(&scenario).expect_err("parse should fail");
        assert_eq!(error.code(), "SCRIPT_PARSE_ERROR");
    }

    #[test]
    fn finished_state_does_not_resume_at_a_choice() {
        let file = temp_path("linear.yaml");
        write_file(&file, "start:\n  - Only line.\n");
        let scenario = load_source_by_scripts_path(&file.to_string_lossy(), "start")
            .expect("source should load");
        let mut interpreter = create_interpreter_for_scenario(&scenario).expect("build");
        interpreter.start_scene("start");
        interpreter.continue_();

        let error = resume_pending_choice(&mut interpreter).expect_err("no choice pending");
        assert_eq!(error.code(), "CLI_STATE_NO_CHOICE");
    }
}
