use std::io::{self, BufRead, Write};
use std::path::Path;

use ns_api::Interpreter;
use ns_core::{ExecutionStep, NarrativeError};

use crate::{
    create_interpreter_for_scenario, format_line, load_interpreter_from_state_for_scenario,
    map_play_io, map_step_error, resume_pending_choice, save_interpreter_state, LoadedScenario,
    PlayCommandAction, PlayCommandContext,
};

const COMMANDS_LINE: &str = "commands: :help :save :load :restart :quit";

pub(crate) fn run_play_line_mode(
    state_file: &str,
    scenario: &LoadedScenario,
    interpreter: &mut Interpreter,
) -> Result<i32, NarrativeError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(state_file, scenario, interpreter, &mut reader, &mut writer)
}

pub(crate) fn run_play_line_mode_with_io(
    state_file: &str,
    scenario: &LoadedScenario,
    interpreter: &mut Interpreter,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, NarrativeError> {
    writeln!(writer, "Narrative Player - {}", scenario.title).map_err(map_play_io)?;
    writeln!(writer, "{}", COMMANDS_LINE).map_err(map_play_io)?;
    let context = PlayCommandContext {
        state_file,
        scenario,
    };

    let mut step = interpreter.start_scene(&scenario.entry_scene);
    loop {
        match step {
            ExecutionStep::DisplayDialogue {
                content, speaker, ..
            } => {
                writeln!(writer).map_err(map_play_io)?;
                writeln!(writer, "{}", format_line(speaker.as_deref(), &content))
                    .map_err(map_play_io)?;
                step = interpreter.continue_();
            }
            ExecutionStep::PresentingChoices {
                content,
                speaker,
                choices,
                ..
            } => {
                writeln!(writer).map_err(map_play_io)?;
                writeln!(writer, "{}", format_line(speaker.as_deref(), &content))
                    .map_err(map_play_io)?;
                for choice in &choices {
                    writeln!(writer, "  [{}] {}", choice.index, choice.text)
                        .map_err(map_play_io)?;
                }
                step = loop {
                    let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                        return Ok(0);
                    };
                    let mut lines = Vec::new();
                    let action = {
                        let mut emit = |line: String| lines.push(line);
                        handle_play_command(raw.as_str(), &context, interpreter, &mut emit)?
                    };
                    for line in lines {
                        writeln!(writer, "{}", line).map_err(map_play_io)?;
                    }
                    match action {
                        PlayCommandAction::Continue => continue,
                        PlayCommandAction::Refresh(next) => break next,
                        PlayCommandAction::Quit => return Ok(0),
                        PlayCommandAction::NotHandled => {}
                    }
                    let choice = raw.trim().parse::<usize>().map_err(|_| {
                        NarrativeError::new(
                            "PLAY_CHOICE_PARSE",
                            format!("Invalid choice index: {}", raw),
                        )
                    })?;
                    break interpreter.choose(choice);
                };
            }
            ExecutionStep::SceneComplete => {
                writeln!(writer).map_err(map_play_io)?;
                writeln!(writer, "[END]").map_err(map_play_io)?;
                return Ok(0);
            }
            ExecutionStep::Error { message, code } => {
                return Err(map_step_error(&message, code.as_deref()))
            }
        }
    }
}

/// Handles `:`-commands typed at a choice prompt. Anything else is left to
/// the caller as a choice index.
pub(crate) fn handle_play_command(
    raw: &str,
    context: &PlayCommandContext<'_>,
    interpreter: &mut Interpreter,
    emit: &mut dyn FnMut(String),
) -> Result<PlayCommandAction, NarrativeError> {
    match raw.trim() {
        ":help" => {
            emit(COMMANDS_LINE.to_string());
            Ok(PlayCommandAction::Continue)
        }
        ":save" => {
            save_interpreter_state(Path::new(context.state_file), interpreter, context.scenario)?;
            emit(format!("saved: {}", context.state_file));
            Ok(PlayCommandAction::Continue)
        }
        ":load" => {
            let (_, mut resumed) =
                load_interpreter_from_state_for_scenario(Path::new(context.state_file), context.scenario)?;
            let next = resume_pending_choice(&mut resumed)?;
            *interpreter = resumed;
            emit(format!("loaded: {}", context.state_file));
            Ok(PlayCommandAction::Refresh(next))
        }
        ":restart" => {
            let mut restarted = create_interpreter_for_scenario(context.scenario)?;
            let next = restarted.start_scene(&context.scenario.entry_scene);
            *interpreter = restarted;
            emit("restarted".to_string());
            Ok(PlayCommandAction::Refresh(next))
        }
        ":quit" => {
            emit("bye".to_string());
            Ok(PlayCommandAction::Quit)
        }
        _ => Ok(PlayCommandAction::NotHandled),
    }
}

/// Reads one line after printing `prefix`. `None` once the input is closed.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, NarrativeError> {
    write!(writer, "{}", prefix).map_err(map_play_io)?;
    writer.flush().map_err(map_play_io)?;
    let mut input = String::new();
    let read = reader.read_line(&mut input).map_err(map_play_io)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
