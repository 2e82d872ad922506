use crate::engine::build_state::BuildState;
use crate::engine::build_system::{BuildSystemBuilder, CMakeBuilder};
use crate::engine::hooks::SORTED_HOOKS;
use crate::engine::identity::PackageId;
use crate::engine::vcs::{GitVcsInfo, VcsInfoProvider};
use anyhow::{anyhow, bail};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

pub mod build_state;
pub mod build_system;
mod copier;
pub mod environment;
pub mod error;
mod hooks;
pub mod identity;
pub mod requirements;
pub mod vcs;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(u8)]
pub enum Stage {
    Export,
    Configure,
    Requirements,
    Build,
    Package,
    PackageId,
}

impl Stage {
    pub const fn all() -> [Stage; 6] {
        [
            Stage::Export,
            Stage::Configure,
            Stage::Requirements,
            Stage::Build,
            Stage::Package,
            Stage::PackageId,
        ]
    }

    /// Everything a full package creation runs, in order.
    pub const fn lifecycle() -> [Stage; 5] {
        [
            Stage::Configure,
            Stage::Requirements,
            Stage::Build,
            Stage::Package,
            Stage::PackageId,
        ]
    }

    /// Stages run when asking for `self` on its own. The compiler check always goes first.
    pub fn plan(self) -> Vec<Stage> {
        match self {
            Stage::Export => vec![Stage::Export],
            Stage::Configure => vec![Stage::Configure],
            Stage::Requirements => vec![Stage::Configure, Stage::Requirements],
            Stage::Build => vec![Stage::Configure, Stage::Requirements, Stage::Build],
            Stage::Package => vec![Stage::Configure, Stage::Package],
            Stage::PackageId => vec![Stage::Configure, Stage::Requirements, Stage::PackageId],
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    recipe_path: PathBuf,
    source_path: PathBuf,
    build_path: PathBuf,
    package_path: PathBuf,
    export_path: PathBuf,
}

impl EngineSettings {
    /// Folders given relative to the working directory. Child processes run inside the build
    /// folder, so every path is made absolute here.
    pub fn new(
        recipe_path: PathBuf,
        source_path: Option<PathBuf>,
        build_path: PathBuf,
        package_path: PathBuf,
        export_path: PathBuf,
    ) -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;

        Ok(Self::relative_to(
            &cwd,
            recipe_path,
            source_path,
            build_path,
            package_path,
            export_path,
        ))
    }

    /// Resolves every relative folder against `base`. The source folder defaults to the one
    /// holding the recipe.
    pub fn relative_to(
        base: &Path,
        recipe_path: PathBuf,
        source_path: Option<PathBuf>,
        build_path: PathBuf,
        package_path: PathBuf,
        export_path: PathBuf,
    ) -> Self {
        let recipe_path = base.join(recipe_path);
        let source_path = match source_path {
            Some(path) => base.join(path),
            None => recipe_path
                .parent()
                .map_or_else(|| base.to_path_buf(), Path::to_path_buf),
        };

        EngineSettings {
            recipe_path,
            source_path,
            build_path: base.join(build_path),
            package_path: base.join(package_path),
            export_path: base.join(export_path),
        }
    }

    /// Lays every folder out below `root`, with the recipe at its top.
    pub fn rooted_at(root: &Path) -> Self {
        EngineSettings {
            recipe_path: root.join("recipe.kdl"),
            source_path: root.to_path_buf(),
            build_path: root.join("build"),
            package_path: root.join("package"),
            export_path: root.join("export"),
        }
    }

    pub fn recipe_path(&self) -> &Path {
        self.recipe_path.as_path()
    }

    pub fn recipe_dir(&self) -> &Path {
        self.recipe_path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn source_path(&self) -> &Path {
        self.source_path.as_path()
    }

    pub fn build_path(&self) -> &Path {
        self.build_path.as_path()
    }

    /// Sources copied next to the build when the recipe does not build in place.
    pub fn copied_source_path(&self) -> PathBuf {
        self.build_path.join("source")
    }

    pub fn package_path(&self) -> &Path {
        self.package_path.as_path()
    }

    pub fn export_recipe_path(&self) -> PathBuf {
        self.export_path.join("export")
    }

    pub fn export_source_path(&self) -> PathBuf {
        self.export_path.join("export_source")
    }

    /// Output folders, never picked up when selecting sources.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        vec![
            self.build_path.clone(),
            self.package_path.clone(),
            self.export_path.clone(),
        ]
    }
}

/// Runs recipe stages. Holds no state between invocations besides its collaborators.
#[derive(Debug)]
pub struct Engine {
    pub settings: Arc<EngineSettings>,
    build_system: Box<dyn BuildSystemBuilder>,
    vcs: Box<dyn VcsInfoProvider>,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        let vcs = GitVcsInfo::new(settings.recipe_dir());
        Self::from_parts(settings, CMakeBuilder, vcs)
    }

    pub fn from_parts<B, V>(settings: EngineSettings, build_system: B, vcs: V) -> Self
    where
        B: BuildSystemBuilder + 'static,
        V: VcsInfoProvider + 'static,
    {
        Engine {
            settings: Arc::new(settings),
            build_system: Box::new(build_system),
            vcs: Box::new(vcs),
        }
    }

    pub fn build_system(&self) -> &dyn BuildSystemBuilder {
        self.build_system.as_ref()
    }

    pub fn vcs(&self) -> &dyn VcsInfoProvider {
        self.vcs.as_ref()
    }

    pub async fn run_stage(&self, state: &mut BuildState<'_>, stage: Stage) -> anyhow::Result<()> {
        if state.completed.contains(&stage) {
            bail!("stage {:?} already ran for this invocation", stage);
        }

        info!("running stage: {:?}", stage);
        state.stage = stage;

        for hook in SORTED_HOOKS.iter().copied() {
            if hook.stage() == stage {
                debug!("running hook: {:?}", hook);
                hook.trigger(state, self)
                    .instrument(info_span!("hook", stage = ?stage))
                    .await?;
            }
        }

        state.completed.insert(stage);
        Ok(())
    }

    pub async fn run(&self, state: &mut BuildState<'_>, target: Stage) -> anyhow::Result<()> {
        for stage in target.plan() {
            self.run_stage(state, stage).await?;
        }

        Ok(())
    }

    pub async fn create(&self, state: &mut BuildState<'_>) -> anyhow::Result<PackageId> {
        for stage in Stage::lifecycle() {
            self.run_stage(state, stage).await?;
        }

        state
            .package_id
            .ok_or_else(|| anyhow!("package id was not computed"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::definition::Recipe;
    use crate::engine::build_system::recording::Recorder;
    use crate::engine::vcs::VcsData;
    use crate::engine::{Engine, EngineSettings};
    use std::path::Path;

    pub const STS_TREE: &str = include_str!("../../demos/sts-tree/recipe.kdl");

    pub fn sts_tree() -> Recipe {
        Recipe::from_source(STS_TREE, "recipe.kdl").unwrap()
    }

    pub fn vcs() -> VcsData {
        VcsData {
            kind: Some("git".to_string()),
            revision: Some("c0ffee".to_string()),
            branch: Some("master".to_string()),
            url: Some("https://github.com/steptosky/sts-tree".to_string()),
        }
    }

    pub fn engine(root: &Path, recorder: &Recorder) -> Engine {
        Engine::from_parts(EngineSettings::rooted_at(root), recorder.clone(), vcs())
    }
}
