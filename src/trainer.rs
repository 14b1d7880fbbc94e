use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    agent::QAgent,
    config::{EnvConfig, TrainingConfig},
    env::MicroEnv,
    error::Result,
    indexer::StateIndexer,
    series::PriceSeries,
    state::DiscreteState,
    traits::Environment,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EpisodeStats {
    /// 1-based, counted across every call on the same trainer.
    pub episode: usize,
    pub total_reward: f64,
    pub steps: usize,
    /// Exploration rate after this episode's decay.
    pub epsilon: f64,
    pub states: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub episodes: Vec<EpisodeStats>,
}

impl TrainingSummary {
    pub fn last(&self) -> Option<&EpisodeStats> {
        self.episodes.last()
    }

    pub fn mean_reward(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        self.episodes.iter().map(|e| e.total_reward).sum::<f64>() / self.episodes.len() as f64
    }
}

/// Q-learning trainer over one price series.
///
/// The agent's table and the indexer are shared by every episode; each
/// episode only gets a fresh environment.
pub struct QTrainer<'a> {
    pub config: TrainingConfig,
    prices: &'a PriceSeries,
    env_config: EnvConfig,
    agent: QAgent,
    indexer: StateIndexer,
    episodes_run: usize,
}

impl<'a> QTrainer<'a> {
    /// Create a trainer, failing fast if the series is too short for the windows.
    pub fn new(prices: &'a PriceSeries, env_config: EnvConfig, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        MicroEnv::new(prices, env_config.clone())?;
        Ok(Self {
            agent: QAgent::from_config(&config),
            config,
            prices,
            env_config,
            indexer: StateIndexer::new(),
            episodes_run: 0,
        })
    }

    pub fn agent(&self) -> &QAgent {
        &self.agent
    }

    pub fn indexer(&self) -> &StateIndexer {
        &self.indexer
    }

    pub fn into_parts(self) -> (QAgent, StateIndexer) {
        (self.agent, self.indexer)
    }

    /// Train for `config.episodes` episodes.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TrainingSummary> {
        self.run_episodes(self.config.episodes, rng)
    }

    /// Train `episodes` more episodes, continuing from the current table,
    /// indexer and exploration rate.
    pub fn run_episodes<R: Rng + ?Sized>(&mut self, episodes: usize, rng: &mut R) -> Result<TrainingSummary> {
        let log_every = (episodes / 10).max(1);
        let mut summary = TrainingSummary {
            episodes: Vec::with_capacity(episodes),
        };
        for i in 0..episodes {
            let stats = self.train_episode(rng)?;
            if (i + 1) % log_every == 0 {
                info!(
                    episode = stats.episode,
                    total_reward = stats.total_reward,
                    epsilon = stats.epsilon,
                    states = stats.states,
                    "training progress"
                );
            }
            summary.episodes.push(stats);
        }
        Ok(summary)
    }

    fn train_episode<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<EpisodeStats> {
        let mut env = MicroEnv::new(self.prices, self.env_config.clone())?;
        let (total_reward, steps) = run_episode(&mut env, &mut self.agent, &mut self.indexer, rng)?;
        let epsilon = self
            .agent
            .decay_epsilon(self.config.eps_end, self.config.eps_decay);
        self.episodes_run += 1;
        debug!(episode = self.episodes_run, steps, total_reward, "episode finished");
        Ok(EpisodeStats {
            episode: self.episodes_run,
            total_reward,
            steps,
            epsilon,
            states: self.indexer.len(),
        })
    }
}

/// Play one episode from reset to done, updating the agent after every step.
///
/// # Returns
/// Tuple of (total_reward, steps)
pub fn run_episode<E, R>(
    env: &mut E,
    agent: &mut QAgent,
    indexer: &mut StateIndexer,
    rng: &mut R,
) -> Result<(f64, usize)>
where
    E: Environment<Obs = DiscreteState>,
    R: Rng + ?Sized,
{
    let mut state = indexer.encode(env.reset());
    let mut total_reward = 0.0;
    let mut steps = 0;
    loop {
        let action = agent.choose_action(state, rng);
        let outcome = env.step(action)?;
        total_reward += outcome.reward;
        steps += 1;
        let next = outcome.next_state.map(|s| indexer.encode(s));
        agent.update(state, action, outcome.reward, next, outcome.done);
        match next {
            Some(next) if !outcome.done => state = next,
            _ => break,
        }
    }
    Ok((total_reward, steps))
}

/// Train a fresh agent and indexer on `prices`.
pub fn train<R: Rng + ?Sized>(
    prices: &PriceSeries,
    env_config: &EnvConfig,
    config: &TrainingConfig,
    rng: &mut R,
) -> Result<(QAgent, StateIndexer)> {
    let mut trainer = QTrainer::new(prices, env_config.clone(), config.clone())?;
    trainer.run(rng)?;
    Ok(trainer.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainingError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prices() -> PriceSeries {
        let closes = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.05)
            .collect();
        PriceSeries::new(closes).unwrap()
    }

    #[test]
    fn each_episode_walks_the_whole_series() {
        let prices = prices();
        let env_config = EnvConfig::default();
        let config = TrainingConfig {
            episodes: 3,
            ..TrainingConfig::default()
        };
        let mut trainer = QTrainer::new(&prices, env_config.clone(), config).unwrap();
        let summary = trainer.run(&mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(summary.episodes.len(), 3);
        for stats in &summary.episodes {
            assert_eq!(stats.steps, prices.len() - env_config.warmup());
        }
        assert_eq!(summary.last().unwrap().episode, 3);
        assert!(trainer.indexer().len() <= 81);
    }

    #[test]
    fn epsilon_decays_per_episode() {
        let prices = prices();
        let config = TrainingConfig {
            episodes: 4,
            eps_start: 0.4,
            eps_end: 0.1,
            eps_decay: 0.5,
            ..TrainingConfig::default()
        };
        let mut trainer = QTrainer::new(&prices, EnvConfig::default(), config).unwrap();
        let summary = trainer.run(&mut StdRng::seed_from_u64(1)).unwrap();
        let eps: Vec<f64> = summary.episodes.iter().map(|e| e.epsilon).collect();
        assert_eq!(eps, vec![0.2, 0.1, 0.1, 0.1]);
        assert_eq!(trainer.agent().eps, 0.1);
    }

    #[test]
    fn short_series_fails_before_training() {
        let prices = PriceSeries::new(vec![100.0; 20]).unwrap();
        let result = QTrainer::new(&prices, EnvConfig::default(), TrainingConfig::default());
        assert!(matches!(
            result,
            Err(TrainingError::InsufficientHistory {
                len: 20,
                required: 21
            })
        ));
    }
}
