use rand::Rng;

use crate::action::{Action, NUM_ACTIONS};
use crate::config::TrainingConfig;
use crate::policy::{argmax, QTable};

/// Tabular epsilon-greedy Q-learning agent.
///
/// Randomness is always supplied by the caller, so a seeded generator
/// reproduces a run exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct QAgent {
    pub alpha: f64,
    pub gamma: f64,
    pub eps: f64,
    q: QTable,
}

impl QAgent {
    pub fn new(alpha: f64, gamma: f64, eps: f64) -> Self {
        Self {
            alpha,
            gamma,
            eps,
            q: QTable::new(),
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.alpha, config.gamma, config.eps_start)
    }

    pub fn with_table(mut self, q: QTable) -> Self {
        self.q = q;
        self
    }

    pub fn q_table(&self) -> &QTable {
        &self.q
    }

    pub fn into_q_table(self) -> QTable {
        self.q
    }

    /// Epsilon-greedy action for `state`.
    ///
    /// One uniform draw decides exploration; exploring takes a second draw
    /// for the action. The row is materialized on first access.
    pub fn choose_action<R: Rng + ?Sized>(&mut self, state: usize, rng: &mut R) -> Action {
        let row = *self.q.row_mut(state);
        let index = if rng.gen::<f64>() < self.eps {
            rng.gen_range(0..NUM_ACTIONS)
        } else {
            argmax(&row)
        };
        Action::ALL[index]
    }

    /// Greedy action without exploration or mutation.
    pub fn greedy_action(&self, state: usize) -> Action {
        self.q.best_action(state)
    }

    /// One-step Q-learning update.
    ///
    /// # Arguments
    /// * `next` - Next state index, `None` when terminal
    /// * `done` - Terminal flag; the target is then the reward alone
    ///
    /// # Invariants
    /// * `Q[s][a] += alpha * (target - Q[s][a])`
    /// * Target bootstraps from the max over next-state actions (off-policy)
    pub fn update(&mut self, state: usize, action: Action, reward: f64, next: Option<usize>, done: bool) {
        let target = match next {
            Some(next) if !done => reward + self.gamma * self.q.max_value(next),
            _ => reward,
        };
        let q = &mut self.q.row_mut(state)[action.index()];
        *q += self.alpha * (target - *q);
    }

    /// `eps <- max(eps_end, eps * eps_decay)`.
    pub fn decay_epsilon(&mut self, eps_end: f64, eps_decay: f64) -> f64 {
        self.eps = eps_end.max(self.eps * eps_decay);
        self.eps
    }
}
