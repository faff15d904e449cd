use crate::envs::zika;
use epigym::{common::defs::*, policy::Policy, GymResult};

/// Baseline: never intervene.
#[derive(Debug, Clone)]
pub struct NoTreatment {
    dim: usize,
}

impl NoTreatment {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn zika() -> Self {
        Self::new(zika::ACTION_DIM)
    }
}

impl Policy for NoTreatment {
    fn sample_action(&mut self, _observation: &[Continous]) -> GymResult<Action> {
        Ok(vec![0.; self.dim])
    }
}

/// Baseline: apply the same intervention vector at every step.
#[derive(Debug, Clone)]
pub struct ConstantTreatment {
    action: Action,
}

impl ConstantTreatment {
    pub fn new(action: Action) -> Self {
        Self { action }
    }

    /// Every Zika control set to `level`.
    pub fn zika(level: Continous) -> Self {
        Self::new(vec![level; zika::ACTION_DIM])
    }
}

impl Policy for ConstantTreatment {
    fn sample_action(&mut self, _observation: &[Continous]) -> GymResult<Action> {
        Ok(self.action.clone())
    }
}
