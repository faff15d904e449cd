use epigym::{common::defs::*, policy::Policy, Env, GymResult, StepInfo};
use ndarray::{Array2, ShapeError};
use serde::{Deserialize, Serialize};

/// One episode, stored as five parallel sequences indexed by step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    observations: Vec<Observation>,
    actions: Vec<Action>,
    rewards: Vec<Continous>,
    next_observations: Vec<Observation>,
    terminals: Vec<u8>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    #[allow(dead_code)]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    #[allow(dead_code)]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn rewards(&self) -> &[Continous] {
        &self.rewards
    }

    #[allow(dead_code)]
    pub fn next_observations(&self) -> &[Observation] {
        &self.next_observations
    }

    pub fn terminals(&self) -> &[u8] {
        &self.terminals
    }

    pub fn total_reward(&self) -> Continous {
        self.rewards.iter().sum()
    }

    #[allow(dead_code)]
    pub fn discounted_return(&self, gamma: Continous) -> Continous {
        self.rewards.iter().rev().fold(0., |g, r| r + gamma * g)
    }

    /// `len x obs_dim`, one row per step.
    pub fn observation_matrix(&self) -> Result<Array2<Continous>, ShapeError> {
        to_matrix(&self.observations)
    }

    pub fn action_matrix(&self) -> Result<Array2<Continous>, ShapeError> {
        to_matrix(&self.actions)
    }
}

fn to_matrix(rows: &[Vec<Continous>]) -> Result<Array2<Continous>, ShapeError> {
    let n_cols = rows.first().map_or(0, Vec::len);
    Array2::from_shape_vec((rows.len(), n_cols), rows.concat())
}

/// Runs one episode from `reset` until the environment says done or the step count exceeds
/// `max_episode_length`.
///
/// NOTE: the cap is `steps > max_episode_length`, so an episode the environment never ends
/// runs `max_episode_length + 1` steps, and `max_episode_length == 0` still takes one step.
pub fn sample_trajectory<E, P>(
    env: &mut E,
    policy: &mut P,
    max_episode_length: usize,
) -> GymResult<Trajectory>
where
    E: Env + ?Sized,
    P: Policy + ?Sized,
{
    let mut obs = env.reset()?;
    let mut t = Trajectory::default();
    let mut steps = 0;

    loop {
        t.observations.push(obs.clone());
        let action = policy.sample_action(&obs)?;

        let si = env.step(&action)?;
        t.actions.push(action);
        steps += 1;

        let terminal = si.done() || steps > max_episode_length;
        let StepInfo {
            observation: next_obs,
            reward,
            ..
        } = si;

        t.next_observations.push(next_obs.clone());
        t.rewards.push(reward);
        t.terminals.push(terminal as u8);
        tracing::debug!(step = steps, reward, terminal, "sampled transition");

        obs = next_obs;
        if terminal {
            break;
        }
    }

    Ok(t)
}

/// Samples `episodes` trajectories one after the other on the same environment.
pub fn sample_trajectories<E, P>(
    env: &mut E,
    policy: &mut P,
    max_episode_length: usize,
    episodes: usize,
) -> GymResult<Vec<Trajectory>>
where
    E: Env + ?Sized,
    P: Policy + ?Sized,
{
    let mut trajectories = Vec::with_capacity(episodes);

    for ep in 0..episodes {
        let t = sample_trajectory(env, policy, max_episode_length)?;
        tracing::info!(
            episode = ep,
            steps = t.len(),
            total_reward = t.total_reward(),
            "sampled episode"
        );
        trajectories.push(t);
    }

    Ok(trajectories)
}
