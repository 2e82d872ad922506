use crate::engine::build_system::{
    BuildContext, BuildSystem, BuildSystemBuilder, Buildable, Configurable, Definitions,
    Installable, Testable,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Configure(Definitions),
    Build,
    Install,
    Test,
}

/// Build system stand-in that only records what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub contexts: Arc<Mutex<Vec<BuildContext>>>,
    pub fail_on: Option<&'static str>,
}

impl Recorder {
    pub fn failing_on(step: &'static str) -> Self {
        Recorder {
            fail_on: Some(step),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<&'static str> {
        self.calls()
            .iter()
            .map(|call| match call {
                Call::Configure(_) => "configure",
                Call::Build => "build",
                Call::Install => "install",
                Call::Test => "test",
            })
            .collect()
    }

    pub fn configured_with(&self) -> Definitions {
        self.calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Configure(definitions) => Some(definitions),
                _ => None,
            })
            .unwrap_or_default()
    }
}

impl BuildSystemBuilder for Recorder {
    fn create(&self, context: BuildContext) -> Box<dyn BuildSystem> {
        self.contexts.lock().unwrap().push(context);

        Box::new(RecordingBuildSystem {
            recorder: self.clone(),
            definitions: Definitions::default(),
        })
    }
}

#[derive(Debug)]
pub struct RecordingBuildSystem {
    recorder: Recorder,
    definitions: Definitions,
}

impl RecordingBuildSystem {
    fn record(&self, step: &'static str, call: Call) -> anyhow::Result<()> {
        self.recorder.calls.lock().unwrap().push(call);

        if self.recorder.fail_on == Some(step) {
            anyhow::bail!("{} failed", step);
        }

        Ok(())
    }
}

#[async_trait]
impl Configurable for RecordingBuildSystem {
    fn definitions_mut(&mut self) -> &mut Definitions {
        &mut self.definitions
    }

    async fn configure(&mut self) -> anyhow::Result<()> {
        self.record("configure", Call::Configure(self.definitions.clone()))
    }
}

#[async_trait]
impl Buildable for RecordingBuildSystem {
    async fn build(&mut self) -> anyhow::Result<()> {
        self.record("build", Call::Build)
    }
}

#[async_trait]
impl Installable for RecordingBuildSystem {
    async fn install(&mut self) -> anyhow::Result<()> {
        self.record("install", Call::Install)
    }
}

#[async_trait]
impl Testable for RecordingBuildSystem {
    async fn test(&mut self) -> anyhow::Result<()> {
        self.record("test", Call::Test)
    }
}
