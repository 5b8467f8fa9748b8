use ns_core::{ChoiceOption, ChoiceRecord, ExecutionStep, NarrativeError, PresentedChoice};

use super::{EngineStatus, NarrativeEngine};
use crate::actions::Action;

impl NarrativeEngine {
    /// Picks one of the presented choices by its index in the presented list.
    /// Calls without a pending choice, with an out-of-range index, or for an
    /// option whose actions or target are invalid return an `error` step and
    /// leave the engine awaiting the same choice.
    pub fn choose(&mut self, index: usize) -> ExecutionStep {
        let option = match (&self.status, &self.pending_choice) {
            (EngineStatus::AwaitingChoice, Some(pending)) => match pending.options.get(index) {
                Some(option) => option.clone(),
                None => {
                    return rejected(NarrativeError::new(
                        "ENGINE_CHOICE_INDEX",
                        format!(
                            "Choice index \"{}\" is out of range (0..{}).",
                            index,
                            pending.options.len()
                        ),
                    ))
                }
            },
            _ => {
                return rejected(NarrativeError::new(
                    "ENGINE_NO_PENDING_CHOICE",
                    "No pending choice is available.",
                ))
            }
        };
        let actions = match self.validate_choice(&option) {
            Ok(actions) => actions,
            Err(error) => return rejected(error),
        };

        let result = self.resolve_choice(index, option, actions);
        self.finish(result)
    }

    /// The choices currently awaiting an answer, if any.
    pub fn pending_choices(&self) -> Option<Vec<PresentedChoice>> {
        match &self.pending_choice.as_ref()?.step {
            ExecutionStep::PresentingChoices { choices, .. } => Some(choices.clone()),
            _ => None,
        }
    }

    fn validate_choice(&self, option: &ChoiceOption) -> Result<Vec<Action>, NarrativeError> {
        let actions = option
            .actions
            .iter()
            .map(Action::from_descriptor)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(target) = &option.target {
            if !self.has_scene(target) {
                return Err(NarrativeError::new(
                    "ENGINE_JUMP_TARGET_NOT_FOUND",
                    format!("Jump target scene \"{}\" not found.", target),
                ));
            }
        }
        Ok(actions)
    }

    fn resolve_choice(
        &mut self,
        index: usize,
        option: ChoiceOption,
        actions: Vec<Action>,
    ) -> Result<ExecutionStep, NarrativeError> {
        let pending = self.pending_choice.take().ok_or_else(|| {
            NarrativeError::new("ENGINE_NO_PENDING_CHOICE", "No pending choice is available.")
        })?;
        let choice_text = match &pending.step {
            ExecutionStep::PresentingChoices { choices, .. } => choices
                .get(index)
                .map(|choice| choice.text.clone())
                .unwrap_or_else(|| option.text.clone()),
            _ => option.text.clone(),
        };

        let scene = self.state.current_scene().unwrap_or_default();
        log::debug!("choice {} \"{}\" in scene \"{}\"", index, choice_text, scene);
        self.state.add_choice(ChoiceRecord {
            choice_text,
            scene,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        });

        self.bump_cursor();
        self.status = EngineStatus::SceneActive;
        for action in &actions {
            action.apply(&mut self.state);
        }
        if let Some(target) = &option.target {
            self.jump_to(target)?;
        }
        self.run_until_boundary()
    }
}

fn rejected(error: NarrativeError) -> ExecutionStep {
    log::warn!("choose rejected: {}", error);
    ExecutionStep::from_error(&error)
}
