use crate::error::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum OptimizationLevel {
    #[serde(rename = "none")]
    Disabled,
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "full")]
    Full,
}

impl Default for OptimizationLevel {
    fn default() -> Self {
        Self::Full
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Builder, Serialize, Deserialize)]
pub struct Environment {
    #[serde(rename = "optimization", default)]
    #[builder(default)]
    pub optimization_level: OptimizationLevel,
    #[serde(default = "enabled")]
    #[builder(default = "enabled()")]
    pub validate: bool,
    #[serde(default = "disabled")]
    #[builder(default = "disabled()")]
    pub debug: bool,
}

impl Environment {
    pub fn from_file(path: &Path) -> Result<Environment> {
        let file = File::open(path)
            .map_err(|_| format!("Environment file '{}' could not be loaded", path.display()))?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            optimization_level: OptimizationLevel::default(),
            validate: true,
            debug: false,
        }
    }
}

impl EnvironmentBuilder {
    /// Seeds the builder with the settings from the given environment file.
    pub fn from_file(&mut self, path: &Path) -> Result<&mut Self> {
        let env = Environment::from_file(path)?;
        self.optimization_level(env.optimization_level);
        self.validate(env.validate);
        self.debug(env.debug);
        Ok(self)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_yaml::to_string(self).unwrap())
    }
}

fn disabled() -> bool {
    false
}

fn enabled() -> bool {
    true
}
