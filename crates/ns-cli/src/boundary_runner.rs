use ns_api::Interpreter;
use ns_core::{ExecutionStep, NarrativeError};

use crate::{json_string, map_step_error, BoundaryEvent, BoundaryResult};

/// Dialogue lines one boundary run may collect before giving up on a story
/// that never reaches a choice or an end.
const MAX_BOUNDARY_LINES: usize = 10_000;

pub(crate) fn format_line(speaker: Option<&str>, content: &str) -> String {
    match speaker {
        Some(speaker) if !speaker.is_empty() => format!("{}: {}", speaker, content),
        _ => content.to_string(),
    }
}

/// Plays from `first` until a choice or the end of the scene, collecting the
/// dialogue shown on the way.
pub(crate) fn run_to_boundary(
    interpreter: &mut Interpreter,
    first: ExecutionStep,
) -> Result<BoundaryResult, NarrativeError> {
    let mut texts = Vec::new();
    let mut step = first;

    for _ in 0..MAX_BOUNDARY_LINES {
        match step {
            ExecutionStep::DisplayDialogue {
                content, speaker, ..
            } => texts.push(format_line(speaker.as_deref(), &content)),
            ExecutionStep::PresentingChoices {
                content,
                speaker,
                choices,
                ..
            } => {
                return Ok(BoundaryResult {
                    event: BoundaryEvent::Choices,
                    texts,
                    choices: choices
                        .into_iter()
                        .map(|choice| (choice.index, choice.text))
                        .collect(),
                    choice_prompt_text: Some(format_line(speaker.as_deref(), &content)),
                })
            }
            ExecutionStep::SceneComplete => {
                return Ok(BoundaryResult {
                    event: BoundaryEvent::End,
                    texts,
                    choices: Vec::new(),
                    choice_prompt_text: None,
                })
            }
            ExecutionStep::Error { message, code } => {
                return Err(map_step_error(&message, code.as_deref()))
            }
        }
        step = interpreter.continue_();
    }

    Err(NarrativeError::new(
        "CLI_BOUNDARY_GUARD",
        format!(
            "No choice or end within {} dialogue lines.",
            MAX_BOUNDARY_LINES
        ),
    ))
}

pub(crate) fn emit_boundary(boundary: BoundaryResult, state_out: Option<String>) {
    println!("RESULT:OK");
    match boundary.event {
        BoundaryEvent::Choices => println!("EVENT:CHOICES"),
        BoundaryEvent::End => println!("EVENT:END"),
    }

    for text in boundary.texts {
        println!("TEXT_JSON:{}", json_string(&text));
    }

    if let Some(prompt) = boundary.choice_prompt_text {
        println!("PROMPT_JSON:{}", json_string(&prompt));
    }

    for (index, text) in boundary.choices {
        println!("CHOICE:{}|{}", index, json_string(&text));
    }

    println!(
        "STATE_OUT:{}",
        state_out.unwrap_or_else(|| "NONE".to_string())
    );
}

#[cfg(test)]
mod boundary_runner_tests {
    use super::*;

    fn interpreter_for(source: &str) -> Interpreter {
        let mut interpreter = Interpreter::default();
        assert!(interpreter.load_script(source, "story.yaml"));
        interpreter
    }

    #[test]
    fn run_to_boundary_collects_lines_until_choices() {
        let mut interpreter = interpreter_for(
            r#"
start:
  - speaker: Guide
    say: Welcome.
  - The road forks.
  - say: Which way?
    choices:
      - text: North
        goto: north
      - South
north:
  - Cold wind.
"#,
        );
        let first = interpreter.start_scene("start");
        let boundary = run_to_boundary(&mut interpreter, first).expect("boundary");
        assert_eq!(boundary.event, BoundaryEvent::Choices);
        assert_eq!(boundary.texts, vec!["Guide: Welcome.", "The road forks."]);
        assert_eq!(boundary.choice_prompt_text.as_deref(), Some("Which way?"));
        assert_eq!(
            boundary.choices,
            vec![(0, "North".to_string()), (1, "South".to_string())]
        );

        let next = interpreter.choose(0);
        let boundary = run_to_boundary(&mut interpreter, next).expect("boundary");
        assert_eq!(boundary.event, BoundaryEvent::End);
        assert_eq!(boundary.texts, vec!["Cold wind."]);
    }

    #[test]
    fn error_steps_become_errors() {
        let mut interpreter = interpreter_for("start:\n  - goto: nowhere\n");
        let first = interpreter.start_scene("start");
        let error = run_to_boundary(&mut interpreter, first).expect_err("jump should fail");
        assert_eq!(error.code(), "ENGINE_JUMP_TARGET_NOT_FOUND");
    }

    #[test]
    fn endless_dialogue_hits_the_boundary_guard() {
        let mut interpreter = interpreter_for("start:\n  - Again.\n  - goto: start\n");
        let first = interpreter.start_scene("start");
        let error = run_to_boundary(&mut interpreter, first).expect_err("loop should stop");
        assert_eq!(error.code(), "CLI_BOUNDARY_GUARD");
    }

    #[test]
    fn format_line_prefixes_speaker() {
        assert_eq!(format_line(Some("Ann"), "Hi"), "Ann: Hi");
        assert_eq!(format_line(Some(""), "Hi"), "Hi");
        assert_eq!(format_line(None, "Hi"), "Hi");
    }
}
