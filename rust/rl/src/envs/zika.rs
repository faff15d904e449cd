use crate::config::RolloutConfig;
use epigym::{Environment, GymError, GymResult, ObsActSpace};

pub const OBSERVATION_DIM: usize = 14;
pub const ACTION_DIM: usize = 4;

/// Controls of the Zika intervention vector, in action order. Each is a usage level in `[0, 1]`.
pub const INTERVENTIONS: [&str; ACTION_DIM] = [
    "treated_bednet_use",
    "condom_use",
    "treatment_of_infected",
    "indoor_spray_use",
];

/// Creates the simulator instance on the gymnasium server and checks it is the Zika model we expect.
pub fn connect(config: &RolloutConfig) -> GymResult<Environment> {
    let env = Environment::new(&config.api_url, &config.env_id, None, None, None, &[])?
        .with_seed(config.seed);
    check_spaces(env.observation_space(), env.action_space())?;

    tracing::info!(
        env = %config.env_id,
        instance_id = env.instance_id(),
        seed = ?config.seed,
        "connected to zika simulator"
    );
    Ok(env)
}

pub fn check_spaces(obs_space: &ObsActSpace, act_space: &ObsActSpace) -> GymResult<()> {
    check_box(obs_space, OBSERVATION_DIM)?;
    check_box(act_space, ACTION_DIM)
}

fn check_box(space: &ObsActSpace, dim: usize) -> GymResult<()> {
    match space {
        ObsActSpace::Box { .. } if space.flat_dim() == dim => Ok(()),
        ObsActSpace::Box { .. } => Err(GymError::ShapeMismatch {
            expected: dim,
            actual: space.flat_dim(),
        }),
        _ => Err(GymError::UnsupportedSpace(format!(
            "zika spaces are Box spaces, got {space:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(n: usize) -> ObsActSpace {
        ObsActSpace::Box {
            shape: vec![n as i32],
            high: vec![1.; n],
            low: vec![0.; n],
        }
    }

    #[test]
    fn accepts_zika_spaces() {
        assert!(check_spaces(&unit_box(14), &unit_box(4)).is_ok());
    }

    #[test]
    fn rejects_wrong_observation_dim() {
        let err = check_spaces(&unit_box(8), &unit_box(4)).unwrap_err();

        assert!(matches!(
            err,
            GymError::ShapeMismatch {
                expected: 14,
                actual: 8
            }
        ));
    }

    #[test]
    fn rejects_discrete_actions() {
        let err = check_spaces(&unit_box(14), &ObsActSpace::Discrete { n: 4 }).unwrap_err();

        assert!(matches!(err, GymError::UnsupportedSpace(_)));
    }
}
