extern crate rand;
extern crate reqwest;
extern crate serde;
extern crate serde_json;

pub mod common;
pub mod error;
pub mod policy;

use common::defs::*;
pub use error::{GymError, GymResult};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::ser::Serialize;
use serde_json::{json, to_value, Map, Value};
use std::collections::HashMap;
use value_extensions::*;

#[derive(Debug, Clone, PartialEq)]
pub enum ObsActSpace {
    /// Refer: https://www.gymlibrary.dev/api/spaces/#discrete
    Discrete { n: Discrete },

    /// Refer: https://www.gymlibrary.dev/api/spaces/#box
    Box {
        shape: Vec<Discrete>,
        high: Vec<Continous>,
        low: Vec<Continous>,
    },
}

impl ObsActSpace {
    pub fn from_json(info: &Map<String, Value>) -> GymResult<Self> {
        let name = info
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GymError::protocol("space info has no name"))?;

        match name {
            "Discrete" => Ok(ObsActSpace::Discrete {
                n: as_discrete(field(info, "n")?)?,
            }),
            "Box" => Ok(ObsActSpace::Box {
                shape: as_discrete_item_vec(field(info, "shape")?)?,
                high: as_continous_item_vec(field(info, "high")?)?,
                low: as_continous_item_vec(field(info, "low")?)?,
            }),
            e => Err(GymError::UnsupportedSpace(e.to_string())),
        }
    }

    /// Number of scalars in one flattened element of this space.
    pub fn flat_dim(&self) -> usize {
        match self {
            ObsActSpace::Discrete { .. } => 1,
            ObsActSpace::Box { shape, .. } => shape.iter().map(|&d| d.max(0) as usize).product(),
        }
    }

    /// Decodes an observation as sent by the server. Nested Box observations are flattened row-major.
    pub fn items_from_json(&self, vals: &Value) -> GymResult<Vec<Continous>> {
        let items = match self {
            ObsActSpace::Discrete { .. } => vec![as_discrete(vals)? as Continous],
            ObsActSpace::Box { .. } => {
                let mut items = Vec::with_capacity(self.flat_dim());
                flatten_continous(vals, &mut items)?;
                items
            }
        };

        self.check_len(items.len())?;
        Ok(items)
    }

    /// Encodes an action the way the server's `step` route expects it.
    pub fn action_to_json(&self, action: &[Continous]) -> GymResult<Value> {
        self.check_len(action.len())?;

        let action = match self {
            ObsActSpace::Discrete { .. } => to_value(action[0].round() as Discrete),
            ObsActSpace::Box { .. } => to_value(action),
        };
        action.map_err(|e| GymError::protocol(e.to_string()))
    }

    fn check_len(&self, actual: usize) -> GymResult<()> {
        let expected = self.flat_dim();
        if expected != actual {
            return Err(GymError::ShapeMismatch { expected, actual });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub observation: Observation,
    pub reward: f64,
    pub truncated: bool,
    pub terminated: bool,
    pub info: Value,
}

impl StepInfo {
    pub fn from_json(obs_space: &ObsActSpace, obj: &Value) -> GymResult<Self> {
        Ok(StepInfo {
            observation: obs_space.items_from_json(field(obj, "observation")?)?,
            reward: as_continous(field(obj, "reward")?)?,
            truncated: as_bool(field(obj, "truncated")?)?,
            terminated: as_bool(field(obj, "terminated")?)?,
            info: obj.get("info").cloned().unwrap_or(Value::Null),
        })
    }

    /// Old gym `done`: the episode ended either way.
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Gym-style environment: `reset` then repeated `step` calls until done.
///
/// Refer: https://gymnasium.farama.org/api/env/
pub trait Env {
    fn reset(&mut self) -> GymResult<Observation>;

    fn step(&mut self, action: &[Continous]) -> GymResult<StepInfo>;
}

/// Create a gymnasium environment or get reference to an existing one.
/// NOTE: All APIs are sync for now as the server is expected to be local.
#[derive(Debug)]
pub struct Environment {
    client: Client,
    api_url: String,
    instance_id: String,
    obs_space: ObsActSpace,
    act_space: ObsActSpace,
    reset_seed: Option<u64>,
}

impl Environment {
    pub fn envs(api_url: &str) -> GymResult<HashMap<String, String>> {
        let client = Client::new(api_url)?;

        let url = client.make_api_url("");
        let val = client.http_get(&url)?;

        let obj = field(&val, "all_envs")?
            .as_object()
            .ok_or_else(|| GymError::protocol("all_envs is not an object"))?;

        obj.iter()
            .map(|(k, v)| Ok((k.clone(), as_str(v)?.to_string())))
            .collect()
    }

    pub fn new(
        api_url: &str,
        env_name: &str,
        max_episode_steps: Option<Discrete>,
        auto_reset: Option<bool>,
        disable_env_checker: Option<bool>,
        kwargs: &[(&str, Value)],
    ) -> GymResult<Self> {
        let mut body = HashMap::from([("env_id", json!(env_name))]);

        if let Some(max_episode_steps) = max_episode_steps {
            body.insert("max_episode_steps", json!(max_episode_steps));
        }

        if let Some(auto_reset) = auto_reset {
            body.insert("auto_reset", json!(auto_reset));
        }

        if let Some(disable_env_checker) = disable_env_checker {
            body.insert("disable_env_checker", json!(disable_env_checker));
        }

        let kwargs = kwargs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<Map<String, Value>>();
        body.insert("kwargs", Value::Object(kwargs));

        let c = Client::new(api_url)?;
        let base_url = c.make_api_url("");
        let obj = c.http_post(&base_url, &body)?;
        let inst_id = as_str(field(&obj, "instance_id")?)?;
        tracing::info!(env = env_name, instance_id = inst_id, "created environment");

        Self::reference(api_url, inst_id)
    }

    pub fn reference(api_url: &str, instance_id: &str) -> GymResult<Self> {
        let client = Client::new(api_url)?;

        let obs_space = client.space(instance_id, "observation_space")?;
        let act_space = client.space(instance_id, "action_space")?;

        let env_api_url = client.make_api_url(&format!("{instance_id}/"));
        Ok(Self {
            client,
            api_url: env_api_url,
            instance_id: instance_id.to_string(),
            obs_space,
            act_space,
            reset_seed: None,
        })
    }

    /// Seed used by the next `reset` only. Later resets continue the server's RNG stream.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.reset_seed = seed;
        self
    }

    pub fn set_reset_seed(&mut self, seed: Option<u64>) {
        self.reset_seed = seed;
    }

    pub fn client_base_url(&self) -> &str {
        &self.client.base_url
    }

    pub fn name(&self) -> GymResult<String> {
        let obj = self.client.http_get(&self.api_url)?;

        Ok(as_str(field(&obj, "id")?)?.to_string())
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The Space object corresponding to valid actions, all valid actions should be contained with the space.
    /// Refer: https://gymnasium.farama.org/api/env/#gymnasium.Env.action_space
    pub fn action_space(&self) -> &ObsActSpace {
        &self.act_space
    }

    /// The Space object corresponding to valid observations.
    /// Refer: https://gymnasium.farama.org/api/env/#gymnasium.Env.observation_space
    pub fn observation_space(&self) -> &ObsActSpace {
        &self.obs_space
    }

    pub fn close(&self) -> GymResult<()> {
        let url = self.make_api_url("close/");
        self.client.http_post(&url, &HashMap::<&str, Value>::new())?;
        tracing::info!(instance_id = %self.instance_id, "closed environment");

        Ok(())
    }

    fn make_api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn reset_body(&self) -> HashMap<&'static str, String> {
        let mut body = HashMap::new();
        if let Some(seed) = self.reset_seed {
            let _ = body.insert("seed", seed.to_string());
        }
        body
    }

    /// The seed is spent only once the server has answered the reset.
    fn finish_reset(&mut self, obj: &Value) -> GymResult<Observation> {
        self.reset_seed = None;
        self.obs_space.items_from_json(field(obj, "observation")?)
    }

    fn step_body(&self, action: &[Continous]) -> GymResult<HashMap<&'static str, Value>> {
        Ok(HashMap::from([(
            "action",
            self.act_space.action_to_json(action)?,
        )]))
    }
}

impl Env for Environment {
    fn reset(&mut self) -> GymResult<Observation> {
        let url = self.make_api_url("reset/");
        let obj = self.client.http_post(&url, &self.reset_body())?;
        self.finish_reset(&obj)
    }

    fn step(&mut self, action: &[Continous]) -> GymResult<StepInfo> {
        let req = self.step_body(action)?;

        let url = self.make_api_url("step/");
        let obj = self.client.http_post(&url, &req)?;
        StepInfo::from_json(&self.obs_space, &obj)
    }
}

#[derive(Debug)]
pub struct Client {
    base_url: String,
    api_url: String,
    client: reqwest::blocking::Client,
}

impl Client {
    pub fn new(base_url: &str) -> GymResult<Self> {
        let mut base_url = base_url.replace("//localhost:", "//127.0.0.1:");
        if base_url.ends_with('/') {
            _ = base_url.remove(base_url.len() - 1);
        }

        let api_url = format!("{base_url}/v1/envs/");

        Ok(Self {
            base_url,
            api_url,
            client: reqwest::blocking::Client::builder().build()?,
        })
    }

    pub fn make_api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn space(&self, instance_id: &str, which: &str) -> GymResult<ObsActSpace> {
        let url = self.make_api_url(&format!("{instance_id}/{which}/"));
        let obj = self.http_get(&url)?;
        let info = field(&obj, "info")?
            .as_object()
            .ok_or_else(|| GymError::protocol(format!("{which} info is not an object")))?;

        ObsActSpace::from_json(info)
    }

    fn http_get(&self, url: &str) -> GymResult<Value> {
        tracing::debug!(url, "GET");
        let res = self
            .client
            .get(url)
            .headers(Self::construct_common_headers())
            .send()?;
        Ok(res.error_for_status()?.json::<Value>()?)
    }

    fn http_post<T: Serialize>(&self, url: &str, body: &HashMap<&str, T>) -> GymResult<Value> {
        tracing::debug!(url, "POST");
        let res = self
            .client
            .post(url)
            .headers(Self::construct_common_headers())
            .json(body)
            .send()?;
        Ok(res.error_for_status()?.json::<Value>()?)
    }

    fn construct_common_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }
}

mod value_extensions {
    use super::*;

    pub trait Fields {
        fn get_field(&self, key: &str) -> Option<&Value>;
    }

    impl Fields for Value {
        fn get_field(&self, key: &str) -> Option<&Value> {
            self.get(key)
        }
    }

    impl Fields for Map<String, Value> {
        fn get_field(&self, key: &str) -> Option<&Value> {
            self.get(key)
        }
    }

    pub fn field<'a, F: Fields + ?Sized>(obj: &'a F, key: &str) -> GymResult<&'a Value> {
        obj.get_field(key)
            .ok_or_else(|| GymError::protocol(format!("missing field '{key}'")))
    }

    pub fn as_str(val: &Value) -> GymResult<&str> {
        val.as_str()
            .ok_or_else(|| GymError::protocol(format!("expected a string, got {val}")))
    }

    pub fn as_bool(val: &Value) -> GymResult<bool> {
        val.as_bool()
            .ok_or_else(|| GymError::protocol(format!("expected a bool, got {val}")))
    }

    pub fn as_discrete(val: &Value) -> GymResult<Discrete> {
        val.as_i64()
            .map(|x| x as Discrete)
            .ok_or_else(|| GymError::protocol(format!("expected an integer, got {val}")))
    }

    pub fn as_continous(val: &Value) -> GymResult<Continous> {
        val.as_f64()
            .ok_or_else(|| GymError::protocol(format!("expected a number, got {val}")))
    }

    pub fn as_discrete_item_vec(val: &Value) -> GymResult<Vec<Discrete>> {
        as_array(val)?.iter().map(as_discrete).collect()
    }

    pub fn as_continous_item_vec(val: &Value) -> GymResult<Vec<Continous>> {
        let mut items = vec![];
        flatten_continous(val, &mut items)?;
        Ok(items)
    }

    pub fn flatten_continous(val: &Value, out: &mut Vec<Continous>) -> GymResult<()> {
        match val {
            Value::Array(xs) => xs.iter().try_for_each(|x| flatten_continous(x, out)),
            x => {
                out.push(as_continous(x)?);
                Ok(())
            }
        }
    }

    fn as_array(val: &Value) -> GymResult<&Vec<Value>> {
        val.as_array()
            .ok_or_else(|| GymError::protocol(format!("expected an array, got {val}")))
    }
}
