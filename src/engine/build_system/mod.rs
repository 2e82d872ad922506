use crate::definition::settings::BuildSettings;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

mod cmake;
#[cfg(test)]
pub(crate) mod recording;

pub use cmake::CMakeBuilder;

/// Cache definitions handed to the build system on configure.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Definitions(BTreeMap<String, String>);

impl Definitions {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_args(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("-D{}={}", k, v)).collect()
    }
}

#[async_trait]
pub trait Configurable: Send {
    fn definitions_mut(&mut self) -> &mut Definitions;

    async fn configure(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Buildable: Send {
    async fn build(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Installable: Send {
    async fn install(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Testable: Send {
    async fn test(&mut self) -> anyhow::Result<()>;
}

pub trait BuildSystem: Configurable + Buildable + Installable + Testable + Debug {}

impl<T: Configurable + Buildable + Installable + Testable + Debug> BuildSystem for T {}

/// Where one build reads from and writes to.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub source_path: PathBuf,
    pub build_path: PathBuf,
    pub install_prefix: PathBuf,
    pub settings: BuildSettings,
}

pub trait BuildSystemBuilder: Send + Sync + Debug {
    fn create(&self, context: BuildContext) -> Box<dyn BuildSystem>;
}
