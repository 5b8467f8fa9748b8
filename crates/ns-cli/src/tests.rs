use super::*;
use crate::cli_test_support::*;

#[test]
fn agent_start_and_choose_run_through_dispatch() {
    let start_state = temp_path("run-start-state.json");
    let choose_state = temp_path("run-choose-state.json");

    let start_code = run(Cli {
        command: Mode::Agent(AgentArgs {
            command: AgentCommand::Start(StartArgs {
                scripts: demo_scripts_dir("02-crossroads"),
                scene: Some("start".to_string()),
                state_out: start_state.to_string_lossy().to_string(),
            }),
        }),
    })
    .expect("agent start should pass");
    assert_eq!(start_code, 0);

    let saved = load_player_state(&start_state).expect("start should save state");
    assert_eq!(saved.entry_scene, "start");
    assert!(saved.game_state.current_scene.is_some());

    let choose_code = agent::run_agent(AgentArgs {
        command: AgentCommand::Choose(ChooseArgs {
            state_in: start_state.to_string_lossy().to_string(),
            choice: 0,
            state_out: choose_state.to_string_lossy().to_string(),
        }),
    })
    .expect("agent choose should pass");
    assert_eq!(choose_code, 0);
}

#[test]
fn agent_choose_rejects_out_of_range_index() {
    let state = temp_path("run-bad-choice-state.json");
    agent::run_start(StartArgs {
        scripts: demo_scripts_dir("02-crossroads"),
        scene: None,
        state_out: state.to_string_lossy().to_string(),
    })
    .expect("start should pass");

    let error = agent::run_choose(ChooseArgs {
        state_in: state.to_string_lossy().to_string(),
        choice: 99,
        state_out: temp_path("unreachable.json").to_string_lossy().to_string(),
    })
    .expect_err("bad index should fail");
    assert_eq!(error.code(), "ENGINE_CHOICE_INDEX");
}

#[test]
fn agent_start_with_unknown_scene_is_an_error() {
    let error = agent::run_start(StartArgs {
        scripts: demo_scripts_dir("01-greeting"),
        scene: Some("missing".to_string()),
        state_out: temp_path("never.json").to_string_lossy().to_string(),
    })
    .expect_err("missing scene should fail");
    assert_eq!(error.code(), "ENGINE_SCENE_NOT_FOUND");
}

#[test]
fn play_rejects_unknown_entry_scene_before_prompting() {
    let error = run_play(PlayArgs {
        scripts: demo_scripts_dir("01-greeting"),
        scene: Some("missing".to_string()),
        state_file: None,
    })
    .expect_err("missing scene should fail");
    assert_eq!(error.code(), "ENGINE_SCENE_NOT_FOUND");
}

#[test]
fn parse_errors_exit_non_zero() {
    let parse_code = run_cli_from_args(["ns-cli", "agent", "unknown"]);
    assert_ne!(parse_code, 0);

    let missing = run_cli_from_args([
        "ns-cli",
        "agent",
        "start",
        "--scripts",
        "/path/does/not/exist",
        "--state-out",
        "/tmp/none.json",
    ]);
    assert_eq!(missing, 1);
}
