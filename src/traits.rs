use crate::action::Action;
use crate::env::StepOutcome;
use crate::error::Result;

pub trait Environment {
    type Obs;

    fn reset(&mut self) -> Self::Obs;
    fn step(&mut self, action: Action) -> Result<StepOutcome<Self::Obs>>;
}

/// Frozen state-index -> action lookup.
pub trait Policy {
    /// `None` when the state was never assigned an action.
    fn action_for(&self, state_index: usize) -> Option<Action>;
}
