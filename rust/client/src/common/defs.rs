pub type Discrete = i32;
pub type Continous = f64;

/// Flat observation vector, as returned by `reset` and `step`.
pub type Observation = Vec<Continous>;

/// Flat action vector, as consumed by `step`.
pub type Action = Vec<Continous>;
