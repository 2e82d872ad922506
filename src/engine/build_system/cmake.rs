use crate::engine::build_system::{
    BuildContext, BuildSystem, BuildSystemBuilder, Buildable, Configurable, Definitions,
    Installable, Testable,
};
use crate::engine::error::DelegateFailure;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

const VISUAL_STUDIO: &str = "Visual Studio";

/// Drives a CMake project out of source: configure into the build folder, install into the
/// package folder.
#[derive(Debug)]
pub struct CMake {
    context: BuildContext,
    definitions: Definitions,
    program: String,
    jobs: usize,
}

impl CMake {
    pub fn new(context: BuildContext) -> Self {
        let mut definitions = Definitions::default();
        definitions
            .set("CMAKE_BUILD_TYPE", context.settings.build_type.as_str())
            .set(
                "CMAKE_INSTALL_PREFIX",
                context.install_prefix.to_string_lossy(),
            );

        CMake {
            context,
            definitions,
            program: "cmake".to_string(),
            jobs: num_cpus::get(),
        }
    }

    fn is_multi_config(&self) -> bool {
        self.context.settings.compiler.name == VISUAL_STUDIO
    }

    fn configure_args(&self) -> Vec<String> {
        let mut args = vec![self.context.source_path.to_string_lossy().into_owned()];
        args.extend(self.definitions.to_args());
        args
    }

    fn build_args(&self, target: Option<&str>) -> Vec<String> {
        let mut args = vec!["--build".to_string(), ".".to_string()];

        if self.is_multi_config() {
            args.push("--config".to_string());
            args.push(self.context.settings.build_type.clone());
        }

        if let Some(target) = target {
            args.push("--target".to_string());
            args.push(target.to_string());
        } else {
            args.push("--parallel".to_string());
            args.push(self.jobs.to_string());
        }

        args
    }

    fn test_target(&self) -> &'static str {
        if self.is_multi_config() {
            "RUN_TESTS"
        } else {
            "test"
        }
    }

    async fn run(&self, step: &'static str, args: Vec<String>) -> anyhow::Result<()> {
        info!("running cmake {}", step);
        debug!(program = %self.program, ?args, cwd = %self.context.build_path.display());

        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.context.build_path)
            .args(&args)
            .env("CTEST_OUTPUT_ON_FAILURE", "1")
            .kill_on_drop(true);

        let mut proc = cmd.spawn().map_err(|source| DelegateFailure::Spawn {
            step,
            program: self.program.clone(),
            source,
        })?;

        let status = proc.wait().await?;
        if !status.success() {
            return Err(DelegateFailure::Failed { step, status }.into());
        }

        Ok(())
    }
}

#[async_trait]
impl Configurable for CMake {
    fn definitions_mut(&mut self) -> &mut Definitions {
        &mut self.definitions
    }

    async fn configure(&mut self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.context.build_path).await?;
        self.run("configure", self.configure_args()).await
    }
}

#[async_trait]
impl Buildable for CMake {
    async fn build(&mut self) -> anyhow::Result<()> {
        self.run("build", self.build_args(None)).await
    }
}

#[async_trait]
impl Installable for CMake {
    async fn install(&mut self) -> anyhow::Result<()> {
        self.run("install", self.build_args(Some("install"))).await
    }
}

#[async_trait]
impl Testable for CMake {
    async fn test(&mut self) -> anyhow::Result<()> {
        let target = self.test_target();
        self.run("test", self.build_args(Some(target))).await
    }
}

#[derive(Debug, Default)]
pub struct CMakeBuilder;

impl BuildSystemBuilder for CMakeBuilder {
    fn create(&self, context: BuildContext) -> Box<dyn BuildSystem> {
        Box::new(CMake::new(context))
    }
}
