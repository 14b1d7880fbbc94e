use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use micro_qlearn::{
    backtest::replay,
    config::Config,
    gbm::generate_gbm,
    policy::GreedyPolicy,
    snapshot::{write_state_mapping_csv, ModelSnapshot},
    trace::write_ticks_csv,
    trainer::QTrainer,
    PriceSeries, QAgent,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Tabular Q-learning micro-strategy trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CSV with Date,Close columns; a synthetic GBM series is used when absent
    #[arg(long, global = true)]
    prices: Option<PathBuf>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    #[arg(long, global = true)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Train {
        #[arg(long)]
        episodes: Option<usize>,
    },
    Backtest {
        #[arg(long)]
        model: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::from_file(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(Config::default()),
    }
}

fn load_prices(path: Option<&PathBuf>, config: &Config) -> anyhow::Result<PriceSeries> {
    match path {
        Some(p) => {
            let series = PriceSeries::from_csv(p)
                .with_context(|| format!("reading prices from {}", p.display()))?;
            info!(path = %p.display(), len = series.len(), "loaded prices");
            Ok(series)
        }
        None => {
            info!(n = config.gbm.n, "no price file given, generating synthetic GBM series");
            let mut rng = StdRng::seed_from_u64(config.gbm.seed);
            Ok(generate_gbm(&config.gbm, &mut rng)?)
        }
    }
}

fn write_backtest(out_dir: &Path, report: &micro_qlearn::BacktestReport) -> anyhow::Result<PathBuf> {
    let path = out_dir.join("backtest.csv");
    write_ticks_csv(&report.ticks(), File::create(&path)?)?;
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
        config.gbm.seed = seed;
    }
    let prices = load_prices(cli.prices.as_ref(), &config)?;
    let out_dir = cli.out.unwrap_or_else(|| PathBuf::from("outputs"));
    fs::create_dir_all(&out_dir)?;

    match cli.command {
        Commands::Train { episodes } => {
            if let Some(eps) = episodes {
                config.training.episodes = eps;
            }
            info!(config = ?config, "starting training");

            let mut rng = StdRng::seed_from_u64(config.training.seed);
            let mut trainer = QTrainer::new(&prices, config.env.clone(), config.training.clone())?;
            trainer.run(&mut rng)?;
            let (agent, indexer) = trainer.into_parts();

            let policy = GreedyPolicy::extract(&agent, &indexer);
            let report = replay(&prices, &policy, &indexer, &config.env)?;
            info!(
                total_pnl = report.total_pnl,
                sharpe_like = report.sharpe_like,
                max_drawdown = report.max_drawdown,
                trades = report.trades,
                "backtest complete"
            );

            let model_path = out_dir.join("model.json");
            ModelSnapshot::capture(&agent, &indexer, &config.env).save_json(&model_path)?;
            let mapping_path = out_dir.join("state_mapping.csv");
            write_state_mapping_csv(&indexer, File::create(&mapping_path)?)?;
            let backtest_path = write_backtest(&out_dir, &report)?;
            info!(
                model = %model_path.display(),
                mapping = %mapping_path.display(),
                backtest = %backtest_path.display(),
                "outputs written"
            );
        }
        Commands::Backtest { model } => {
            let snapshot = ModelSnapshot::load_json(&model)
                .with_context(|| format!("reading model {}", model.display()))?;
            let epsilon = snapshot.epsilon;
            let env = snapshot.env.clone();
            if env != config.env {
                warn!(
                    model_env = ?env,
                    config_env = ?config.env,
                    "environment config differs from the model's; replaying with the model's"
                );
            }
            let (indexer, table) = snapshot.into_parts()?;
            let agent = QAgent::new(config.training.alpha, config.training.gamma, epsilon).with_table(table);

            let policy = GreedyPolicy::extract(&agent, &indexer);
            let report = replay(&prices, &policy, &indexer, &env)?;
            let backtest_path = write_backtest(&out_dir, &report)?;
            info!(
                total_pnl = report.total_pnl,
                sharpe_like = report.sharpe_like,
                states = indexer.len(),
                backtest = %backtest_path.display(),
                "backtest complete"
            );
        }
    }

    Ok(())
}
