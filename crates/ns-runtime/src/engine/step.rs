use ns_core::{ChoiceOption, ExecutionStep, NarrativeError, PresentedChoice, ScriptInstruction};

use super::{EngineStatus, NarrativeEngine, PendingChoice, MAX_STEP_ITERATIONS};
use crate::actions::apply_actions;

impl NarrativeEngine {
    /// Advances to the next host-visible step. While a choice is pending the
    /// same choices are returned again; after the scene ends every call
    /// reports `scene_complete`.
    pub fn continue_(&mut self) -> ExecutionStep {
        match self.status {
            EngineStatus::AwaitingChoice => {
                if let Some(pending) = &self.pending_choice {
                    return pending.step.clone();
                }
            }
            EngineStatus::SceneComplete => return ExecutionStep::SceneComplete,
            EngineStatus::Idle | EngineStatus::SceneActive | EngineStatus::Error => {}
        }

        if self.state.current_scene().is_none() {
            let error = NarrativeError::new("ENGINE_NO_ACTIVE_SCENE", "No scene is active.");
            log::warn!("continue rejected: {}", error);
            return ExecutionStep::from_error(&error);
        }

        self.status = EngineStatus::SceneActive;
        let result = self.run_until_boundary();
        self.finish(result)
    }

    pub(super) fn run_until_boundary(&mut self) -> Result<ExecutionStep, NarrativeError> {
        for _ in 0..MAX_STEP_ITERATIONS {
            let Some(instruction) = self.current_instruction()? else {
                self.frames.clear();
                self.status = EngineStatus::SceneComplete;
                log::debug!("scene {:?} complete", self.state.current_scene());
                return Ok(ExecutionStep::SceneComplete);
            };

            match instruction {
                ScriptInstruction::Action { actions, .. } => {
                    apply_actions(&actions, &mut self.state)?;
                    self.bump_cursor();
                }
                ScriptInstruction::Dialogue {
                    speaker,
                    text,
                    actions,
                    choices,
                    ..
                } => {
                    apply_actions(&actions, &mut self.state)?;
                    let speaker = speaker
                        .map(|speaker| self.render(&speaker))
                        .transpose()?;
                    let content = self.render(&text)?;

                    if let Some(options) = choices {
                        let visible = self.visible_choices(options)?;
                        if !visible.is_empty() {
                            return self.present_choices(content, speaker, visible);
                        }
                    }

                    self.bump_cursor();
                    return Ok(ExecutionStep::DisplayDialogue {
                        content,
                        speaker,
                        can_continue: self.can_continue(),
                    });
                }
                ScriptInstruction::Conditional {
                    condition,
                    then_branch,
                    else_branch,
                    ..
                } => {
                    let matched = self.evaluate_condition(&condition)?;
                    let origin = self.cursor_index();
                    self.bump_cursor();
                    if matched {
                        self.push_branch(then_branch, origin, false);
                    } else if let Some(else_branch) = else_branch {
                        self.push_branch(else_branch, origin, true);
                    }
                }
                ScriptInstruction::Jump { target, .. } => {
                    self.jump_to(&target)?;
                }
            }
        }

        Err(NarrativeError::new(
            "ENGINE_GUARD_EXCEEDED",
            format!(
                "Execution guard exceeded {} instructions without reaching a step.",
                MAX_STEP_ITERATIONS
            ),
        ))
    }

    fn visible_choices(
        &self,
        options: Vec<ChoiceOption>,
    ) -> Result<Vec<ChoiceOption>, NarrativeError> {
        let mut visible = Vec::with_capacity(options.len());
        for option in options {
            let shown = match &option.condition {
                Some(condition) => self.evaluate_condition(condition)?,
                None => true,
            };
            if shown {
                visible.push(option);
            }
        }
        Ok(visible)
    }

    fn present_choices(
        &mut self,
        content: String,
        speaker: Option<String>,
        options: Vec<ChoiceOption>,
    ) -> Result<ExecutionStep, NarrativeError> {
        let mut choices = Vec::with_capacity(options.len());
        for (index, option) in options.iter().enumerate() {
            choices.push(PresentedChoice {
                index,
                text: self.render(&option.text)?,
                target: option.target.clone(),
            });
        }

        let step = ExecutionStep::PresentingChoices {
            content,
            speaker,
            choices,
            can_continue: false,
        };
        self.pending_choice = Some(PendingChoice {
            options,
            step: step.clone(),
        });
        self.status = EngineStatus::AwaitingChoice;
        Ok(step)
    }
}
