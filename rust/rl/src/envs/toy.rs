use epigym::{common::defs::*, Env, GymError, GymResult, StepInfo};
use serde_json::Value;

/// Deterministic stand-in for the simulator: every compartment halves each step.
///
/// Reward is minus the remaining population minus the total intervention applied.
pub struct DecayEnv {
    initial: Observation,
    state: Observation,
    act_dim: usize,
    t: usize,
    done_at: Option<usize>,
    fail_at: Option<usize>,
    resets: usize,
}

impl DecayEnv {
    pub fn new(initial: Observation, act_dim: usize) -> Self {
        Self {
            state: initial.clone(),
            initial,
            act_dim,
            t: 0,
            done_at: None,
            fail_at: None,
            resets: 0,
        }
    }

    pub fn zika_like() -> Self {
        Self::new((1..=14).map(|i| 100. * i as Continous).collect(), 4)
    }

    /// Report `terminated` on step `k` (1-based).
    pub fn done_at(mut self, k: usize) -> Self {
        self.done_at = Some(k);
        self
    }

    /// Fail the `k`th step (1-based) with a protocol error.
    pub fn fail_at(mut self, k: usize) -> Self {
        self.fail_at = Some(k);
        self
    }

    pub fn initial_state(&self) -> &[Continous] {
        &self.initial
    }

    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Env for DecayEnv {
    fn reset(&mut self) -> GymResult<Observation> {
        self.state = self.initial.clone();
        self.t = 0;
        self.resets += 1;
        Ok(self.state.clone())
    }

    fn step(&mut self, action: &[Continous]) -> GymResult<StepInfo> {
        if action.len() != self.act_dim {
            return Err(GymError::ShapeMismatch {
                expected: self.act_dim,
                actual: action.len(),
            });
        }

        self.t += 1;
        if self.fail_at == Some(self.t) {
            return Err(GymError::protocol(format!("simulator blew up at step {}", self.t)));
        }

        self.state.iter_mut().for_each(|x| *x /= 2.);
        let reward = -self.state.iter().sum::<Continous>() - action.iter().sum::<Continous>();

        Ok(StepInfo {
            observation: self.state.clone(),
            reward,
            truncated: false,
            terminated: self.done_at == Some(self.t),
            info: Value::Null,
        })
    }
}
