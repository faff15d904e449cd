use crate::config::OutputFormat;
use crate::sampler::Trajectory;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::iter::once;
use std::path::{Path, PathBuf};

/// A trajectory plus where it came from, as written to `.json` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub policy: String,
    pub episode: usize,
    pub recorded_at: DateTime<Utc>,
    /// Name of each action component, in action order.
    pub action_names: Vec<String>,
    #[serde(flatten)]
    pub trajectory: Trajectory,
}

impl TrajectoryRecord {
    pub fn new(
        policy: &str,
        episode: usize,
        action_names: &[&str],
        trajectory: Trajectory,
    ) -> Self {
        Self {
            policy: policy.to_string(),
            episode,
            recorded_at: Utc::now(),
            action_names: action_names.iter().map(|n| n.to_string()).collect(),
            trajectory,
        }
    }
}

pub fn to_json(record: &TrajectoryRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// One row per step: `step`, the observation, the action, `reward`, `terminal`.
pub fn to_csv(t: &Trajectory) -> Result<String> {
    let obs = t.observation_matrix()?;
    let act = t.action_matrix()?;

    let obs_cols = (0..obs.ncols()).map(|i| format!("obs_{i}"));
    let act_cols = (0..act.ncols()).map(|i| format!("act_{i}"));
    let header = once("step".to_string())
        .chain(obs_cols)
        .chain(act_cols)
        .chain(["reward".to_string(), "terminal".to_string()])
        .join(",");

    let rows = obs
        .rows()
        .into_iter()
        .zip(act.rows())
        .zip(t.rewards().iter().zip(t.terminals()))
        .enumerate()
        .map(|(i, ((o, a), (r, d)))| {
            once(i.to_string())
                .chain(o.iter().map(|x| x.to_string()))
                .chain(a.iter().map(|x| x.to_string()))
                .chain([r.to_string(), d.to_string()])
                .join(",")
        });

    Ok(once(header).chain(rows).map(|l| l + "\n").collect())
}

/// Writes `<dir>/<policy>_ep<episode>.<ext>` and returns the path.
pub fn write(dir: &Path, format: OutputFormat, record: &TrajectoryRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!(
        "{}_ep{}.{}",
        record.policy,
        record.episode,
        format.extension()
    ));
    let contents = match format {
        OutputFormat::Json => to_json(record)?,
        OutputFormat::Csv => to_csv(&record.trajectory)?,
    };
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write trajectory to {}", path.display()))?;

    Ok(path)
}
