use crate::definition::PackageIdMode;
use crate::engine::build_state::BuildState;
use crate::engine::hooks::Hook;
use crate::engine::identity::PackageInfo;
use crate::engine::{Engine, Stage};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug)]
pub struct ComputePackageId;

#[async_trait]
impl Hook for ComputePackageId {
    const PRIORITY: usize = 0;
    const STAGE: Stage = Stage::PackageId;

    async fn run(&self, state: &mut BuildState<'_>, _engine: &Engine) -> anyhow::Result<()> {
        let recipe = state.recipe;
        let mut info = PackageInfo::new(
            &recipe.metadata,
            &recipe.settings,
            state.settings,
            &state.requirements,
        );

        if recipe.package_id == PackageIdMode::HeaderOnly {
            info.header_only();
        }

        let id = info.package_id();
        info!(%id, mode = ?recipe.package_id, "package id");
        state.package_id = Some(id);

        Ok(())
    }
}
