use super::*;
use rand::prelude::*;
use std::iter::zip;

pub trait Policy {
    fn sample_action(&mut self, observation: &[Continous]) -> GymResult<Action>;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn sample_action(&mut self, observation: &[Continous]) -> GymResult<Action> {
        (**self).sample_action(observation)
    }
}

/// Ignores the observation and draws every component uniformly from the bounds of a Box action space.
#[derive(Debug, Clone)]
pub struct UniformRandomPolicy {
    low: Vec<Continous>,
    high: Vec<Continous>,
    rng: StdRng,
}

impl UniformRandomPolicy {
    pub fn new(act_space: &ObsActSpace, seed: u64) -> GymResult<Self> {
        let ObsActSpace::Box { low, high, .. } = act_space else {
            return Err(GymError::UnsupportedSpace(format!(
                "uniform sampling needs a Box action space, got {act_space:?}"
            )));
        };

        if low.len() != high.len() {
            return Err(GymError::ShapeMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }

        if low.iter().chain(high).any(|x| !x.is_finite()) || zip(low, high).any(|(l, h)| l > h) {
            return Err(GymError::UnsupportedSpace(
                "uniform sampling needs finite, ordered bounds".to_string(),
            ));
        }

        Ok(Self {
            low: low.clone(),
            high: high.clone(),
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Policy for UniformRandomPolicy {
    fn sample_action(&mut self, _observation: &[Continous]) -> GymResult<Action> {
        let rng = &mut self.rng;
        Ok(zip(&self.low, &self.high)
            .map(|(&l, &h)| rng.gen_range(l..=h))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertor::*;

    fn unit_box(n: usize) -> ObsActSpace {
        ObsActSpace::Box {
            shape: vec![n as Discrete],
            high: vec![1.; n],
            low: vec![0.; n],
        }
    }

    #[test]
    fn samples_stay_inside_bounds() {
        let space = ObsActSpace::Box {
            shape: vec![2],
            high: vec![1., -1.],
            low: vec![0.5, -3.],
        };
        let mut pi = UniformRandomPolicy::new(&space, 2718).unwrap();

        for _ in 0..1000 {
            let a = pi.sample_action(&[]).unwrap();
            assert_that!(a.len()).is_equal_to(2);
            assert!((0.5..=1.).contains(&a[0]));
            assert!((-3. ..=-1.).contains(&a[1]));
        }
    }

    #[test]
    fn same_seed_same_actions() {
        let mut p1 = UniformRandomPolicy::new(&unit_box(4), 7).unwrap();
        let mut p2 = UniformRandomPolicy::new(&unit_box(4), 7).unwrap();

        let a1 = (0..10)
            .map(|_| p1.sample_action(&[]).unwrap())
            .collect::<Vec<_>>();
        let a2 = (0..10)
            .map(|_| p2.sample_action(&[]).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(a1, a2);
    }

    #[test]
    fn discrete_space_is_unsupported() {
        let err = UniformRandomPolicy::new(&ObsActSpace::Discrete { n: 4 }, 0).unwrap_err();

        assert!(matches!(err, GymError::UnsupportedSpace(_)));
    }

    #[test]
    fn unbounded_space_is_unsupported() {
        let space = ObsActSpace::Box {
            shape: vec![1],
            high: vec![f64::INFINITY],
            low: vec![0.],
        };

        assert!(UniformRandomPolicy::new(&space, 0).is_err());
    }

    #[test]
    fn boxed_policy_delegates() {
        let mut pi: Box<dyn Policy> = Box::new(UniformRandomPolicy::new(&unit_box(3), 1).unwrap());

        assert_that!(pi.sample_action(&[]).unwrap().len()).is_equal_to(3);
    }
}
