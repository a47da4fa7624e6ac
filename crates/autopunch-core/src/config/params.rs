use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Runtime parameters passed to a config.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Create empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse from CLI args like "key=value".
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            params.values.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// Parameter definition in config.
///
/// Credentials are never written into the config file itself; they arrive
/// through a declared parameter, typically via its `env` binding.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamSpec {
    /// Whether this parameter is required.
    #[serde(default)]
    pub required: bool,

    /// Environment variable consulted when the parameter was not passed
    /// explicitly.
    pub env: Option<String>,

    /// Default value if not provided.
    pub default: Option<String>,

    /// Description for documentation.
    pub description: Option<String>,
}

/// Resolve one `${name}` reference: explicit param, then the declared env
/// binding, then an env var of the same name, then the default.
fn resolve(name: &str, params: &Params, specs: &HashMap<String, ParamSpec>) -> Result<Option<String>> {
    if let Some(v) = params.get(name) {
        return Ok(Some(v.to_string()));
    }
    let Some(spec) = specs.get(name) else {
        // Undeclared: env var or leave as-is (may be substituted elsewhere).
        return Ok(std::env::var(name).ok());
    };
    if let Some(ref env_name) = spec.env {
        if let Ok(v) = std::env::var(env_name) {
            return Ok(Some(v));
        }
    }
    if let Ok(v) = std::env::var(name) {
        return Ok(Some(v));
    }
    if let Some(ref default) = spec.default {
        return Ok(Some(default.clone()));
    }
    if spec.required {
        return Err(Error::Config(format!(
            "missing required parameter: {}",
            name
        )));
    }
    Ok(Some(String::new()))
}

/// Substitute `${var}` patterns in a string.
pub fn substitute(
    template: &str,
    params: &Params,
    specs: &HashMap<String, ParamSpec>,
) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let close = open + close;
        let name = &rest[open + 2..close];

        result.push_str(&rest[..open]);
        match resolve(name, params, specs)? {
            Some(value) => result.push_str(&value),
            None => result.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Recursively substitute params in a serde_yaml::Value.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    specs: &HashMap<String, ParamSpec>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => {
            *s = substitute(s, params, specs)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, specs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params, specs)?;
            }
        }
        _ => {}
    }
    Ok(())
}
