use std::path::Path;

use ns_core::{ExecutionStep, NarrativeError};

use crate::{
    create_interpreter_for_scenario, emit_boundary_with_saved_state,
    load_interpreter_from_state_for_ref, load_source_by_scripts_path, map_step_error,
    resume_pending_choice, run_to_boundary, AgentArgs, AgentCommand, ChooseArgs, StartArgs,
    DEFAULT_ENTRY_SCENE,
};

pub(super) fn run_agent(args: AgentArgs) -> Result<i32, NarrativeError> {
    match args.command {
        AgentCommand::Start(args) => run_start(args),
        AgentCommand::Choose(args) => run_choose(args),
    }
}

pub(super) fn run_start(args: StartArgs) -> Result<i32, NarrativeError> {
    let scenario = load_source_by_scripts_path(
        &args.scripts,
        args.scene.as_deref().unwrap_or(DEFAULT_ENTRY_SCENE),
    )?;
    let mut interpreter = create_interpreter_for_scenario(&scenario)?;

    let first = interpreter.start_scene(&scenario.entry_scene);
    let boundary = run_to_boundary(&mut interpreter, first)?;
    emit_boundary_with_saved_state(&interpreter, boundary, &args.state_out, &scenario)
}

pub(super) fn run_choose(args: ChooseArgs) -> Result<i32, NarrativeError> {
    let (scenario, _state, mut interpreter) =
        load_interpreter_from_state_for_ref(Path::new(&args.state_in))?;
    resume_pending_choice(&mut interpreter)?;

    let next = interpreter.choose(args.choice);
    if let ExecutionStep::Error { message, code } = &next {
        return Err(map_step_error(message, code.as_deref()));
    }
    let boundary = run_to_boundary(&mut interpreter, next)?;
    emit_boundary_with_saved_state(&interpreter, boundary, &args.state_out, &scenario)
}
