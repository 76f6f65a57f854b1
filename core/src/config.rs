//! Page configuration: which resource to drive and with which verbs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::http::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One panel per verb, one visible at a time.
    #[default]
    Tabbed,
    /// Exactly one verb; schema fetched without a `method` query and stored
    /// under the bare resource path.
    Single,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageConfig {
    /// Absolute URL requests are sent to.
    pub resource_url: String,
    /// Resource path used in storage keys. Defaults to the path component of
    /// `resource_url`.
    #[serde(default)]
    pub resource_path: Option<String>,
    #[serde(default = "PageConfig::default_verbs")]
    pub verbs: Vec<HttpMethod>,
    #[serde(default)]
    pub layout: Layout,
    /// Read the resource once at load time for read-only display.
    #[serde(default = "PageConfig::default_initial_read")]
    pub initial_read: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("single layout needs exactly one verb, got {0}")]
    SingleLayoutVerbs(usize),

    #[error("no verbs configured")]
    NoVerbs,
}

impl PageConfig {
    pub fn new(resource_url: &str) -> Self {
        Self {
            resource_url: resource_url.to_string(),
            resource_path: None,
            verbs: Self::default_verbs(),
            layout: Layout::default(),
            initial_read: Self::default_initial_read(),
        }
    }

    /// Single-verb page for `verb`.
    pub fn single(resource_url: &str, verb: HttpMethod) -> Self {
        Self {
            verbs: vec![verb],
            layout: Layout::Single,
            ..Self::new(resource_url)
        }
    }

    fn default_verbs() -> Vec<HttpMethod> {
        vec![
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
        ]
    }

    fn default_initial_read() -> bool {
        true
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: PageConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verbs.is_empty() {
            return Err(ConfigError::NoVerbs);
        }
        if self.layout == Layout::Single && self.verbs.len() != 1 {
            return Err(ConfigError::SingleLayoutVerbs(self.verbs.len()));
        }
        Ok(())
    }

    /// Path used in storage keys.
    pub fn storage_path(&self) -> String {
        if let Some(path) = &self.resource_path {
            return path.clone();
        }
        let without_scheme = self
            .resource_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.resource_url);
        let path = match without_scheme.find('/') {
            Some(idx) => &without_scheme[idx..],
            None => "/",
        };
        let path = path.split(['?', '#']).next().unwrap_or("/");
        path.to_string()
    }
}
