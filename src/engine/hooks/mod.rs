pub mod build;
pub mod configure;
pub mod export;
pub mod package;
pub mod package_id;
pub mod requirements;

use crate::engine::build_state::BuildState;
use crate::engine::{Engine, Stage};
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::fmt::Debug;

#[async_trait]
pub trait HookVTable: Debug + Sync {
    fn prio(&self) -> usize;
    fn stage(&self) -> Stage;

    async fn trigger(&self, state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()>;
}

type HookRef = &'static dyn HookVTable;

const HOOKS: &[HookRef] = &[
    &export::ExportSources,
    &export::SnapshotVcs,
    &configure::CheckCompiler,
    &requirements::DeclareRequirements,
    &build::RunBuildSystem,
    &package::CopyArtifacts,
    &package_id::ComputePackageId,
];

lazy_static! {
    pub static ref SORTED_HOOKS: Vec<HookRef> = get_sorted_hooks();
}

fn get_sorted_hooks() -> Vec<HookRef> {
    let mut hooks = HOOKS.to_vec();
    hooks.sort_by_key(|v| (v.stage(), v.prio()));
    hooks
}

#[async_trait]
pub trait Hook: Debug {
    const PRIORITY: usize;
    const STAGE: Stage;

    async fn run(&self, state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: Hook + Sync> HookVTable for T {
    fn prio(&self) -> usize {
        Self::PRIORITY
    }

    fn stage(&self) -> Stage {
        Self::STAGE
    }

    async fn trigger(&self, state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()> {
        self.run(state, engine).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_a_hook_and_hooks_are_ordered() {
        for stage in Stage::all() {
            assert!(SORTED_HOOKS.iter().any(|h| h.stage() == stage), "{:?}", stage);
        }

        let keys: Vec<_> = SORTED_HOOKS.iter().map(|h| (h.stage(), h.prio())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
