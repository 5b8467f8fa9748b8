use std::ffi::OsString;

use clap::Parser;
use ns_core::NarrativeError;

mod agent;
mod boundary_runner;
mod cli_args;
mod error_map;
mod line_play;
mod models;
mod session_ops;
mod source_loader;
mod state_store;

pub(crate) use boundary_runner::{emit_boundary, format_line, run_to_boundary};
pub(crate) use cli_args::{AgentArgs, AgentCommand, ChooseArgs, Cli, Mode, PlayArgs, StartArgs};
pub(crate) use error_map::{
    emit_error, json_string, map_cli_source_path, map_cli_source_read, map_cli_source_scan,
    map_cli_state_encode, map_cli_state_invalid, map_cli_state_read, map_cli_state_write,
    map_play_io, map_step_error,
};
pub(crate) use line_play::run_play_line_mode;
pub(crate) use models::{
    BoundaryEvent, BoundaryResult, LoadedScenario, PlayCommandAction, PlayCommandContext,
    PlayerState, DEFAULT_ENTRY_SCENE, PLAYER_STATE_SCHEMA,
};
pub(crate) use session_ops::{
    create_interpreter_for_scenario, emit_boundary_with_saved_state,
    load_interpreter_from_state_for_ref, load_interpreter_from_state_for_scenario,
    resume_pending_choice, save_interpreter_state,
};
pub(crate) use source_loader::{load_source_by_ref, load_source_by_scripts_path};
pub(crate) use state_store::{load_player_state, save_player_state};

const DEFAULT_STATE_FILE: &str = ".narrative/save.json";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, NarrativeError> {
    match cli.command {
        Mode::Agent(args) => agent::run_agent(args),
        Mode::Play(args) => run_play(args),
    }
}

fn run_play(args: PlayArgs) -> Result<i32, NarrativeError> {
    let entry_scene = args.scene.as_deref().unwrap_or(DEFAULT_ENTRY_SCENE);
    let state_file = args
        .state_file
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    let scenario = load_source_by_scripts_path(&args.scripts, entry_scene)?;
    let mut interpreter = create_interpreter_for_scenario(&scenario)?;
    if !interpreter.has_scene(entry_scene) {
        return Err(NarrativeError::new(
            "ENGINE_SCENE_NOT_FOUND",
            format!("Scene \"{}\" not found.", entry_scene),
        ));
    }

    run_play_line_mode(&state_file, &scenario, &mut interpreter)
}

#[cfg(test)]
mod cli_test_support;
#[cfg(test)]
mod tests;
