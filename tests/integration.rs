use micro_qlearn::{
    action::Action,
    backtest::replay,
    config::{EnvConfig, GbmConfig, TrainingConfig},
    env::MicroEnv,
    gbm::generate_gbm,
    indexer::StateIndexer,
    policy::GreedyPolicy,
    series::PriceSeries,
    snapshot::ModelSnapshot,
    traits::Environment,
    trainer::{train, QTrainer},
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn synthetic(n: usize, seed: u64) -> PriceSeries {
    let params = GbmConfig {
        n,
        sigma: 0.3,
        seed,
        ..GbmConfig::default()
    };
    generate_gbm(&params, &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn quick_training(episodes: usize) -> TrainingConfig {
    TrainingConfig {
        episodes,
        eps_start: 0.5,
        eps_end: 0.05,
        eps_decay: 0.9,
        ..TrainingConfig::default()
    }
}

#[test]
fn identical_seeds_give_identical_tables() {
    let prices = synthetic(300, 9);
    let env = EnvConfig::default();
    let config = quick_training(10);

    let (agent_a, indexer_a) = train(&prices, &env, &config, &mut StdRng::seed_from_u64(42)).unwrap();
    let (agent_b, indexer_b) = train(&prices, &env, &config, &mut StdRng::seed_from_u64(42)).unwrap();

    assert_eq!(agent_a, agent_b);
    assert_eq!(indexer_a, indexer_b);
    assert!(!indexer_a.is_empty());
}

#[test]
fn continuing_training_matches_single_run() {
    let prices = synthetic(200, 3);
    let env = EnvConfig::default();

    let mut split = QTrainer::new(&prices, env.clone(), quick_training(2)).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    split.run_episodes(1, &mut rng).unwrap();
    split.run_episodes(1, &mut rng).unwrap();

    let mut whole = QTrainer::new(&prices, env, quick_training(2)).unwrap();
    whole.run(&mut StdRng::seed_from_u64(17)).unwrap();

    assert_eq!(split.agent(), whole.agent());
    assert_eq!(split.indexer(), whole.indexer());
}

#[test]
fn holding_a_position_earns_price_change_without_costs() {
    let prices = PriceSeries::new(vec![100.0, 101.0, 99.0, 99.0, 102.0, 101.5, 103.0]).unwrap();
    let config = EnvConfig {
        window_short: 2,
        window_long: 3,
        ..EnvConfig::default()
    };
    let mut env = MicroEnv::new(&prices, config).unwrap();
    env.reset();
    env.step(Action::Short).unwrap();

    let p = prices.as_slice();
    for t in 4..p.len() {
        let out = env.step(Action::Short).unwrap();
        assert_eq!(out.reward, (p[t] - p[t - 1]) * -1.0);
    }
    assert!(env.is_done());
}

#[test]
fn worked_example_from_flat_to_long() {
    let prices = PriceSeries::new(vec![100.0, 101.0, 99.0, 99.0, 102.0]).unwrap();
    let config = EnvConfig {
        window_short: 2,
        window_long: 3,
        ..EnvConfig::default()
    };
    let mut env = MicroEnv::new(&prices, config.clone()).unwrap();
    env.reset();
    assert_eq!(env.cursor(), 3);

    let out = env.step_value(1).unwrap();
    let costs = config.transaction_cost * 99.0 + config.slippage_penalty * 99.0;
    assert!((out.reward - (0.0 - costs)).abs() < 1e-12);
    assert_eq!(env.position(), 1);
}

#[test]
fn empty_policy_stays_flat() {
    let prices = synthetic(120, 5);
    let env = EnvConfig::default();
    let (_, indexer) = train(&prices, &env, &quick_training(2), &mut StdRng::seed_from_u64(1)).unwrap();

    let report = replay(&prices, &GreedyPolicy::default(), &indexer, &env).unwrap();
    assert!(report.positions.iter().all(|&p| p == 0));
    assert_eq!(report.total_pnl, 0.0);
    assert_eq!(report.trades, 0);
    assert_eq!(report.sharpe_like, 0.0);
    assert_eq!(report.steps(), prices.len() - env.warmup());
}

#[test]
fn states_missing_from_indexer_fall_back_to_flat() {
    let prices = synthetic(200, 13);
    let env = EnvConfig::default();
    let (agent, indexer) = train(&prices, &env, &quick_training(5), &mut StdRng::seed_from_u64(6)).unwrap();
    let policy = GreedyPolicy::extract(&agent, &indexer);
    assert!(!policy.is_empty());

    let empty = StateIndexer::new();
    let report = replay(&prices, &policy, &empty, &env).unwrap();
    assert!(empty.is_empty());
    assert!(report.positions.iter().all(|&p| p == 0));
    assert_eq!(report.total_pnl, 0.0);
    assert_eq!(report.trades, 0);
    assert_eq!(report.steps(), prices.len() - env.warmup());
}

#[test]
fn greedy_replay_is_deterministic_and_leaves_indexer_alone() {
    let prices = synthetic(400, 21);
    let env = EnvConfig::default();
    let (agent, indexer) = train(&prices, &env, &quick_training(15), &mut StdRng::seed_from_u64(8)).unwrap();
    let frozen = indexer.clone();

    let policy = GreedyPolicy::extract(&agent, &indexer);
    assert_eq!(policy.len(), indexer.len());

    let first = replay(&prices, &policy, &indexer, &env).unwrap();
    let second = replay(&prices, &policy, &indexer, &env).unwrap();
    assert_eq!(first, second);
    assert_eq!(indexer, frozen);

    let steps = prices.len() - env.warmup();
    assert_eq!(first.per_step_pnl.len(), steps);
    assert_eq!(first.cumulative_pnl.len(), steps);
    assert_eq!(first.positions.len(), steps);
    assert_eq!(first.cursor_trace.last(), Some(&prices.len()));
    let summed: f64 = first.per_step_pnl.iter().sum();
    assert!((summed - first.total_pnl).abs() < 1e-9);
    assert_eq!(first.cumulative_pnl.last(), Some(&first.total_pnl));
    assert!(first.positions.iter().all(|p| (-1..=1).contains(p)));
}

#[test]
fn snapshot_restores_an_equivalent_policy() {
    let prices = synthetic(250, 2);
    let env = EnvConfig::default();
    let (agent, indexer) = train(&prices, &env, &quick_training(5), &mut StdRng::seed_from_u64(4)).unwrap();

    let (restored_indexer, table) = ModelSnapshot::capture(&agent, &indexer, &env).into_parts().unwrap();
    let restored = micro_qlearn::QAgent::new(agent.alpha, agent.gamma, agent.eps).with_table(table);

    assert_eq!(
        GreedyPolicy::extract(&restored, &restored_indexer),
        GreedyPolicy::extract(&agent, &indexer)
    );
}
