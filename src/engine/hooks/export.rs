use crate::definition::CopyRule;
use crate::engine::build_state::BuildState;
use crate::engine::copier::copy_matching;
use crate::engine::hooks::Hook;
use crate::engine::vcs::VCS_DATA_FILE;
use crate::engine::{Engine, Stage};
use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

/// Exported recipe folder gets the recipe and its `exports`, the source folder gets
/// `exports-sources` with their paths kept.
#[derive(Debug)]
pub struct ExportSources;

#[async_trait]
impl Hook for ExportSources {
    const PRIORITY: usize = 0;
    const STAGE: Stage = Stage::Export;

    async fn run(&self, state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()> {
        let settings = &engine.settings;
        let excludes = settings.output_paths();
        let recipe_target = settings.export_recipe_path();
        let source_target = settings.export_source_path();

        tokio::fs::create_dir_all(&recipe_target).await?;

        let recipe_path = settings.recipe_path();
        let file_name = recipe_path
            .file_name()
            .with_context(|| format!("recipe path {} has no file name", recipe_path.display()))?;
        tokio::fs::copy(recipe_path, recipe_target.join(file_name))
            .await
            .with_context(|| format!("failed exporting recipe {}", recipe_path.display()))?;

        let mut exported = 0;
        for pattern in &state.recipe.exports {
            let rule = CopyRule::exported(pattern.as_str());
            exported += copy_matching(&rule, settings.recipe_dir(), &recipe_target, &excludes)
                .await?
                .len();
        }

        for pattern in &state.recipe.exports_sources {
            let rule = CopyRule::exported(pattern.as_str());
            exported += copy_matching(&rule, settings.source_path(), &source_target, &excludes)
                .await?
                .len();
        }

        info!(count = exported, to = %settings.export_recipe_path().display(), "exported");
        Ok(())
    }
}

/// Freezes source control facts next to the exported recipe, so later builds from the
/// export do not need a checkout.
#[derive(Debug)]
pub struct SnapshotVcs;

#[async_trait]
impl Hook for SnapshotVcs {
    const PRIORITY: usize = 100;
    const STAGE: Stage = Stage::Export;

    async fn run(&self, _state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()> {
        let target = engine.settings.export_recipe_path().join(VCS_DATA_FILE);
        engine.vcs().metadata().await?.write(&target).await?;

        info!(path = %target.display(), "wrote vcs snapshot");
        Ok(())
    }
}
