use ns_core::{BranchCursor, NarrativeError, ScriptInstruction};

use super::{BranchFrame, NarrativeEngine};

impl NarrativeEngine {
    /// The instruction under the cursor. Exhausted branch frames are popped
    /// here, so a branch stays on the stack until the next fetch after its
    /// last instruction.
    pub(super) fn current_instruction(&mut self) -> Result<Option<ScriptInstruction>, NarrativeError> {
        while let Some(frame) = self.frames.last() {
            if let Some(instruction) = frame.instructions.get(frame.index) {
                return Ok(Some(instruction.clone()));
            }
            self.frames.pop();
        }

        let instructions = self.current_scene_instructions()?;
        Ok(instructions
            .get(self.state.current_instruction_index())
            .cloned())
    }

    pub(super) fn bump_cursor(&mut self) {
        match self.frames.last_mut() {
            Some(frame) => frame.index += 1,
            None => self.state.advance_instruction(),
        }
    }

    /// Index of the next instruction in the innermost open sequence.
    pub(super) fn cursor_index(&self) -> usize {
        match self.frames.last() {
            Some(frame) => frame.index,
            None => self.state.current_instruction_index(),
        }
    }

    pub(super) fn push_branch(
        &mut self,
        instructions: Vec<ScriptInstruction>,
        conditional_index: usize,
        else_branch: bool,
    ) {
        if instructions.is_empty() {
            return;
        }
        self.frames.push(BranchFrame {
            instructions,
            index: 0,
            conditional_index,
            else_branch,
        });
    }

    pub(super) fn branch_stack(&self) -> Vec<BranchCursor> {
        self.frames
            .iter()
            .map(|frame| BranchCursor {
                conditional_index: frame.conditional_index,
                else_branch: frame.else_branch,
                index: frame.index,
            })
            .collect()
    }

    /// Rebuilds branch frames from saved cursors by walking the current
    /// scene. Cursors that no longer land on a conditional are dropped along
    /// with everything nested below them. When the scene is not loaded yet
    /// the cursors are held until the next `set_scenes`.
    pub(super) fn restore_frames(&mut self, stack: &[BranchCursor]) {
        self.frames.clear();
        self.unplaced_branches.clear();
        if stack.is_empty() {
            return;
        }
        let mut parent = match self.current_scene_instructions() {
            Ok(instructions) => instructions.to_vec(),
            Err(error) => {
                log::debug!("holding saved branch position until scenes load: {}", error);
                self.unplaced_branches = stack.to_vec();
                return;
            }
        };

        for cursor in stack {
            let branch = match parent.get(cursor.conditional_index) {
                Some(ScriptInstruction::Conditional { then_branch, .. }) if !cursor.else_branch => {
                    Some(then_branch.clone())
                }
                Some(ScriptInstruction::Conditional { else_branch, .. }) => else_branch.clone(),
                _ => None,
            };
            let Some(instructions) = branch.filter(|branch| !branch.is_empty()) else {
                log::warn!(
                    "saved branch position does not match scene {:?}; resuming after the conditional",
                    self.state.current_scene()
                );
                break;
            };
            self.frames.push(BranchFrame {
                instructions: instructions.clone(),
                index: cursor.index.min(instructions.len()),
                conditional_index: cursor.conditional_index,
                else_branch: cursor.else_branch,
            });
            parent = instructions;
        }
    }

    /// True while any frame or the scene itself has an instruction left.
    pub fn can_continue(&self) -> bool {
        if self
            .frames
            .iter()
            .any(|frame| frame.index < frame.instructions.len())
        {
            return true;
        }
        self.state
            .current_scene()
            .and_then(|scene| self.scenes.get(&scene))
            .is_some_and(|instructions| self.state.current_instruction_index() < instructions.len())
    }

    /// Jumps replace the whole position: the branch stack is discarded and
    /// nothing returns to the jump site.
    pub(super) fn jump_to(&mut self, target: &str) -> Result<(), NarrativeError> {
        if !self.has_scene(target) {
            return Err(NarrativeError::new(
                "ENGINE_JUMP_TARGET_NOT_FOUND",
                format!("Jump target scene \"{}\" not found.", target),
            ));
        }
        log::debug!(
            "jumping from {:?} to \"{}\"",
            self.state.current_scene(),
            target
        );
        self.state.set_position(target, 0);
        self.frames.clear();
        self.unplaced_branches.clear();
        Ok(())
    }

    fn current_scene_instructions(&self) -> Result<&[ScriptInstruction], NarrativeError> {
        let scene = self.state.current_scene().ok_or_else(|| {
            NarrativeError::new("ENGINE_NO_ACTIVE_SCENE", "No scene is active.")
        })?;
        self.scenes
            .get(&scene)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                NarrativeError::new(
                    "ENGINE_SCENE_NOT_FOUND",
                    format!("Scene \"{}\" not found.", scene),
                )
            })
    }
}
