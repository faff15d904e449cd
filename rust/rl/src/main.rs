//! Samples Zika intervention trajectories from a gymnasium-served simulator under
//! fixed baseline policies and writes them out for plotting.

mod config;
mod envs;
mod export;
mod policies;
mod sampler;

use anyhow::{Context, Result};
use clap::Parser;
use config::{OutputFormat, RolloutConfig};
use envs::zika;
use epigym::policy::{Policy, UniformRandomPolicy};
use epigym::{Environment, ObsActSpace};
use export::TrajectoryRecord;
use policies::{ConstantTreatment, NoTreatment};
use sampler::Trajectory;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "zika-rollouts", version, about)]
struct Cli {
    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    api_url: Option<String>,

    #[arg(long)]
    env_id: Option<String>,

    /// Step cap. An episode ends once the step count exceeds it.
    #[arg(long)]
    max_episode_length: Option<usize>,

    /// Episodes to sample per policy.
    #[arg(long)]
    episodes: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = PolicyChoice::All)]
    policy: PolicyChoice,

    #[arg(long)]
    treatment_level: Option<f64>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum PolicyChoice {
    /// Always the zero intervention.
    None,
    /// Every control held at `treatment_level`.
    Constant,
    /// Uniform over the action space bounds.
    Random,
    /// No treatment, then constant treatment.
    All,
}

impl Cli {
    fn apply(&self, mut config: RolloutConfig) -> RolloutConfig {
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(env_id) = &self.env_id {
            config.env_id = env_id.clone();
        }
        if let Some(max_episode_length) = self.max_episode_length {
            config.max_episode_length = max_episode_length;
        }
        if let Some(episodes) = self.episodes {
            config.episodes = episodes;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(level) = self.treatment_level {
            config.treatment_level = level;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }

        config
    }
}

fn build_policies(
    choice: PolicyChoice,
    config: &RolloutConfig,
    act_space: &ObsActSpace,
) -> Result<Vec<(&'static str, Box<dyn Policy>)>> {
    let no_treatment = || ("no_treatment", Box::new(NoTreatment::zika()) as Box<dyn Policy>);
    let constant = || {
        (
            "constant_treatment",
            Box::new(ConstantTreatment::zika(config.treatment_level)) as Box<dyn Policy>,
        )
    };

    Ok(match choice {
        PolicyChoice::None => vec![no_treatment()],
        PolicyChoice::Constant => vec![constant()],
        PolicyChoice::All => vec![no_treatment(), constant()],
        PolicyChoice::Random => {
            let pi = UniformRandomPolicy::new(act_space, config.seed.unwrap_or_default())?;
            vec![("random", Box::new(pi) as Box<dyn Policy>)]
        }
    })
}

fn write_episode(
    config: &RolloutConfig,
    policy: &str,
    episode: usize,
    t: Trajectory,
) -> Result<PathBuf> {
    let steps = t.len();
    let total_reward = t.total_reward();
    let record = TrajectoryRecord::new(policy, episode, &zika::INTERVENTIONS, t);
    let path = export::write(&config.output_dir, config.format, &record)?;
    tracing::info!(
        policy,
        episode,
        steps,
        total_reward,
        path = %path.display(),
        "wrote trajectory"
    );

    Ok(path)
}

fn run_policies(
    env: &mut Environment,
    policies: Vec<(&'static str, Box<dyn Policy>)>,
    config: &RolloutConfig,
) -> Result<()> {
    for (name, mut policy) in policies {
        // Same initial state for every policy, so the runs are comparable.
        env.set_reset_seed(config.seed);

        let trajectories = sampler::sample_trajectories(
            env,
            policy.as_mut(),
            config.max_episode_length,
            config.episodes,
        )
        .with_context(|| format!("Sampling under policy '{name}' failed"))?;

        for (episode, t) in trajectories.into_iter().enumerate() {
            write_episode(config, name, episode, t)?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.apply(RolloutConfig::load(cli.config.as_deref())?);
    tracing::debug!(?config, "resolved config");

    let mut env = zika::connect(&config)
        .with_context(|| format!("Failed to connect to {} at {}", config.env_id, config.api_url))?;

    let outcome = build_policies(cli.policy, &config, env.action_space())
        .and_then(|policies| run_policies(&mut env, policies, &config));

    // The server-side instance is released whether or not sampling succeeded.
    let closed = env.close();
    if let (Err(_), Err(e)) = (&outcome, &closed) {
        tracing::warn!(error = %e, "failed to close environment");
    }
    outcome?;
    closed.context("Failed to close environment")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::toy::DecayEnv;
    use assertor::*;
    use rstest::*;

    fn zika_actions() -> ObsActSpace {
        ObsActSpace::Box {
            shape: vec![4],
            high: vec![1.; 4],
            low: vec![0.; 4],
        }
    }

    #[rstest]
    #[case(PolicyChoice::None, vec!["no_treatment"])]
    #[case(PolicyChoice::Constant, vec!["constant_treatment"])]
    #[case(PolicyChoice::All, vec!["no_treatment", "constant_treatment"])]
    #[case(PolicyChoice::Random, vec!["random"])]
    fn policy_choice_selects_runs(#[case] choice: PolicyChoice, #[case] names: Vec<&str>) {
        let policies = build_policies(choice, &RolloutConfig::default(), &zika_actions()).unwrap();

        assert_eq!(policies.iter().map(|(n, _)| *n).collect::<Vec<_>>(), names);
    }

    #[test]
    fn constant_policy_uses_configured_level() {
        let config = RolloutConfig {
            treatment_level: 0.75,
            ..RolloutConfig::default()
        };

        let mut policies = build_policies(PolicyChoice::Constant, &config, &zika_actions()).unwrap();

        assert_eq!(policies[0].1.sample_action(&[0.; 14]).unwrap(), vec![0.75; 4]);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "zika-rollouts",
            "--max-episode-length",
            "10",
            "--seed",
            "1",
            "--format",
            "csv",
        ]);

        let config = cli.apply(RolloutConfig::default());

        assert_eq!(config.max_episode_length, 10);
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.format, OutputFormat::Csv);
        assert_eq!(config.env_id, "Zika-v0");
        assert_eq!(cli.policy, PolicyChoice::All);
    }

    #[test]
    fn written_csv_uses_positional_action_columns() {
        let dir = std::env::temp_dir().join(format!("zika-rollouts-cli-{}", std::process::id()));
        let config = RolloutConfig {
            output_dir: dir.clone(),
            format: OutputFormat::Csv,
            ..RolloutConfig::default()
        };
        let mut env = DecayEnv::zika_like();
        let t = sampler::sample_trajectory(&mut env, &mut NoTreatment::zika(), 0).unwrap();

        let path = write_episode(&config, "no_treatment", 0, t).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        let header = csv.lines().next().unwrap();
        assert_that!(header).starts_with("step,obs_0,");
        assert_that!(header).contains("obs_13,act_0,act_1,act_2,act_3,reward,terminal");
        assert_that!(header).does_not_contain(zika::INTERVENTIONS[0]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
