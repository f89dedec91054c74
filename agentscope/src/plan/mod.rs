//! Plan notebook: a hierarchical task list with an ordered state machine.
//!
//! The auto-context memory only reads this surface ([`PlanNotebook::current_plan`])
//! to build its plan-aware compression hint; the write operations below are the
//! notebook's own contract and enforce the ordering invariant: a subtask may
//! move to IN_PROGRESS only when every prior subtask is DONE or ABANDONED, and
//! finishing a subtask auto-activates the next TODO one.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// State of a plan or subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanState {
    Todo,
    InProgress,
    Done,
    Abandoned,
}

impl PlanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanState::Todo => "TODO",
            PlanState::InProgress => "IN_PROGRESS",
            PlanState::Done => "DONE",
            PlanState::Abandoned => "ABANDONED",
        }
    }

    /// Terminal states free the next subtask to start.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanState::Done | PlanState::Abandoned)
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ordered step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub name: String,
    pub description: String,
    pub expected_outcome: String,
    pub state: PlanState,
    /// Recorded when the subtask is finished.
    pub outcome: Option<String>,
}

impl SubTask {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_outcome: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_outcome: expected_outcome.into(),
            state: PlanState::Todo,
            outcome: None,
        }
    }
}

/// A plan with ordered subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub description: String,
    pub expected_outcome: String,
    pub state: PlanState,
    pub subtasks: Vec<SubTask>,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// The first IN_PROGRESS subtask, if any.
    pub fn in_progress_subtask(&self) -> Option<&SubTask> {
        self.subtasks.iter().find(|s| s.state == PlanState::InProgress)
    }
}

#[derive(Default)]
struct NotebookState {
    current: Option<Plan>,
    history: Vec<Plan>,
}

/// How [`PlanNotebook::revise_current_plan`] edits the subtask list.
#[derive(Debug, Clone)]
pub enum ReviseAction {
    /// Inserts a subtask at the index (index may equal the current length).
    Add(SubTask),
    /// Replaces the subtask at the index.
    Replace(SubTask),
    /// Deletes the subtask at the index.
    Delete,
}

/// Thread-safe notebook holding at most one active plan plus history.
#[derive(Default)]
pub struct PlanNotebook {
    state: Mutex<NotebookState>,
}

impl PlanNotebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read surface consumed by the auto-context memory.
    pub fn current_plan(&self) -> Option<Plan> {
        self.state.lock().expect("notebook lock").current.clone()
    }

    /// Creates and activates a plan; its first subtask becomes IN_PROGRESS.
    pub fn create_plan(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        expected_outcome: impl Into<String>,
        subtasks: Vec<SubTask>,
    ) -> Result<(), PlanError> {
        let mut state = self.state.lock().expect("notebook lock");
        if let Some(current) = &state.current {
            return Err(PlanError::PlanAlreadyActive(current.name.clone()));
        }
        let mut plan = Plan {
            name: name.into(),
            description: description.into(),
            expected_outcome: expected_outcome.into(),
            state: PlanState::InProgress,
            subtasks,
            created_at: Utc::now(),
        };
        Self::activate_next_todo(&mut plan);
        state.current = Some(plan);
        Ok(())
    }

    /// Updates the active plan's descriptive fields; `None` keeps a field.
    pub fn update_plan_info(
        &self,
        name: Option<String>,
        description: Option<String>,
        expected_outcome: Option<String>,
    ) -> Result<(), PlanError> {
        let mut state = self.state.lock().expect("notebook lock");
        let plan = state.current.as_mut().ok_or(PlanError::NoActivePlan)?;
        if let Some(name) = name {
            plan.name = name;
        }
        if let Some(description) = description {
            plan.description = description;
        }
        if let Some(expected_outcome) = expected_outcome {
            plan.expected_outcome = expected_outcome;
        }
        Ok(())
    }

    /// Edits the subtask list of the active plan.
    pub fn revise_current_plan(&self, index: usize, action: ReviseAction) -> Result<(), PlanError> {
        let mut state = self.state.lock().expect("notebook lock");
        let plan = state.current.as_mut().ok_or(PlanError::NoActivePlan)?;
        let len = plan.subtasks.len();
        match action {
            ReviseAction::Add(subtask) => {
                if index > len {
                    return Err(PlanError::IndexOutOfRange { index, len });
                }
                plan.subtasks.insert(index, subtask);
            }
            ReviseAction::Replace(subtask) => {
                if index >= len {
                    return Err(PlanError::IndexOutOfRange { index, len });
                }
                plan.subtasks[index] = subtask;
            }
            ReviseAction::Delete => {
                if index >= len {
                    return Err(PlanError::IndexOutOfRange { index, len });
                }
                plan.subtasks.remove(index);
            }
        }
        Ok(())
    }

    /// Transitions the subtask at `index` to `new_state`, enforcing the
    /// ordered state machine.
    pub fn update_subtask_state(&self, index: usize, new_state: PlanState) -> Result<(), PlanError> {
        let mut state = self.state.lock().expect("notebook lock");
        let plan = state.current.as_mut().ok_or(PlanError::NoActivePlan)?;
        let len = plan.subtasks.len();
        if index >= len {
            return Err(PlanError::IndexOutOfRange { index, len });
        }
        let current = plan.subtasks[index].state;
        if current == new_state {
            return Ok(());
        }
        let allowed = match (current, new_state) {
            (PlanState::Todo, PlanState::InProgress) => {
                plan.subtasks[..index].iter().all(|s| s.state.is_terminal())
            }
            (PlanState::Todo, PlanState::Abandoned) => true,
            (PlanState::InProgress, PlanState::Done) => true,
            (PlanState::InProgress, PlanState::Abandoned) => true,
            (PlanState::Abandoned, PlanState::Todo) => true,
            _ => false,
        };
        if !allowed {
            return Err(PlanError::InvalidTransition(format!(
                "subtask {} cannot move {} -> {}",
                index, current, new_state
            )));
        }
        plan.subtasks[index].state = new_state;
        if new_state.is_terminal() {
            Self::activate_next_todo(plan);
        }
        Ok(())
    }

    /// Finishes the subtask at `index` with an outcome and auto-activates the
    /// next TODO subtask.
    pub fn finish_subtask(&self, index: usize, outcome: impl Into<String>) -> Result<(), PlanError> {
        let mut state = self.state.lock().expect("notebook lock");
        let plan = state.current.as_mut().ok_or(PlanError::NoActivePlan)?;
        let len = plan.subtasks.len();
        if index >= len {
            return Err(PlanError::IndexOutOfRange { index, len });
        }
        let current = plan.subtasks[index].state;
        if current.is_terminal() {
            return Err(PlanError::InvalidTransition(format!(
                "subtask {} already {}",
                index, current
            )));
        }
        plan.subtasks[index].state = PlanState::Done;
        plan.subtasks[index].outcome = Some(outcome.into());
        Self::activate_next_todo(plan);
        Ok(())
    }

    /// Closes the active plan as DONE or ABANDONED and moves it to history.
    pub fn finish_plan(&self, final_state: PlanState) -> Result<(), PlanError> {
        if !final_state.is_terminal() {
            return Err(PlanError::InvalidTransition(format!(
                "a plan can only finish as DONE or ABANDONED, not {}",
                final_state
            )));
        }
        let mut state = self.state.lock().expect("notebook lock");
        let mut plan = state.current.take().ok_or(PlanError::NoActivePlan)?;
        plan.state = final_state;
        state.history.push(plan);
        Ok(())
    }

    /// Subtasks of the active plan.
    pub fn view_subtasks(&self) -> Result<Vec<SubTask>, PlanError> {
        let state = self.state.lock().expect("notebook lock");
        state
            .current
            .as_ref()
            .map(|p| p.subtasks.clone())
            .ok_or(PlanError::NoActivePlan)
    }

    /// Number of subtasks of the active plan (0 when none is active).
    pub fn subtask_count(&self) -> usize {
        let state = self.state.lock().expect("notebook lock");
        state.current.as_ref().map(|p| p.subtasks.len()).unwrap_or(0)
    }

    /// One-line progress hint for the active plan.
    pub fn current_hint(&self) -> Option<String> {
        let state = self.state.lock().expect("notebook lock");
        let plan = state.current.as_ref()?;
        match plan
            .subtasks
            .iter()
            .enumerate()
            .find(|(_, s)| s.state == PlanState::InProgress)
        {
            Some((i, subtask)) => Some(format!(
                "Executing plan \"{}\": subtask {}/{} \"{}\" is in progress. Expected outcome: {}",
                plan.name,
                i + 1,
                plan.subtasks.len(),
                subtask.name,
                subtask.expected_outcome,
            )),
            None => Some(format!(
                "Executing plan \"{}\": no subtask is currently in progress.",
                plan.name
            )),
        }
    }

    /// Finished and abandoned plans, oldest first.
    pub fn view_historical_plans(&self) -> Vec<Plan> {
        self.state.lock().expect("notebook lock").history.clone()
    }

    /// Re-activates a historical plan by index; fails if a plan is active.
    pub fn recover_historical_plan(&self, index: usize) -> Result<(), PlanError> {
        let mut state = self.state.lock().expect("notebook lock");
        if let Some(current) = &state.current {
            return Err(PlanError::PlanAlreadyActive(current.name.clone()));
        }
        let len = state.history.len();
        if index >= len {
            return Err(PlanError::IndexOutOfRange { index, len });
        }
        let mut plan = state.history.remove(index);
        plan.state = PlanState::InProgress;
        state.current = Some(plan);
        Ok(())
    }

    /// Moves the first TODO subtask to IN_PROGRESS when its predecessors are
    /// all terminal and nothing is already in progress.
    fn activate_next_todo(plan: &mut Plan) {
        if plan.subtasks.iter().any(|s| s.state == PlanState::InProgress) {
            return;
        }
        if let Some(index) = plan.subtasks.iter().position(|s| s.state == PlanState::Todo) {
            if plan.subtasks[..index].iter().all(|s| s.state.is_terminal()) {
                plan.subtasks[index].state = PlanState::InProgress;
            }
        }
    }
}
