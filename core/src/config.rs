use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const BASE_URL_VAR: &str = "REMODEL_BASE_URL";
const TIMEOUT_VAR: &str = "REMODEL_TIMEOUT_SECS";

/// Connection settings shared by every model class in a schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Scheme, host and optional path prefix, e.g. `http://localhost:3000/api`
    pub base_url: String,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Whole-request timeout applied by the transport
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            headers: Vec::new(),
            timeout_secs: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Read `REMODEL_BASE_URL` (required) and `REMODEL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ModelError> {
        let base_url = std::env::var(BASE_URL_VAR)
            .map_err(|_| ModelError::Config(format!("{BASE_URL_VAR} is not set")))?;
        let mut config = Self::new(&base_url);
        if let Ok(raw) = std::env::var(TIMEOUT_VAR) {
            let secs = raw
                .parse()
                .map_err(|_| ModelError::Config(format!("{TIMEOUT_VAR} is not a number: {raw}")))?;
            config.timeout_secs = Some(secs);
        }
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ModelError::Config(format!("{}: {e}", path.display())))?;
        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| ModelError::Config(format!("{}: {e}", path.display())))?;
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
