use crate::engine::build_state::BuildState;
use crate::engine::copier::copy_matching;
use crate::engine::hooks::Hook;
use crate::engine::{Engine, Stage};
use async_trait::async_trait;
use tracing::info;

/// Applies the recipe's copy rules from the source folder into the package folder.
#[derive(Debug)]
pub struct CopyArtifacts;

#[async_trait]
impl Hook for CopyArtifacts {
    const PRIORITY: usize = 0;
    const STAGE: Stage = Stage::Package;

    async fn run(&self, state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()> {
        let settings = &engine.settings;
        let excludes = settings.output_paths();

        for rule in &state.recipe.package_rules {
            let copied = copy_matching(
                rule,
                settings.source_path(),
                settings.package_path(),
                &excludes,
            )
            .await?;

            info!(pattern = %rule.pattern, count = copied.len(), "packaged");
            state.packaged.extend(copied);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::settings::settings;
    use crate::engine::build_system::recording::Recorder;
    use crate::engine::copier::touch;
    use crate::engine::environment::flags;
    use crate::engine::testing::{engine, sts_tree};

    #[tokio::test]
    async fn headers_keep_their_layout_and_licenses_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "LICENSE");
        touch(dir.path(), "docs/license.txt");
        touch(dir.path(), "include/sts/tree/TreeItem.h");
        touch(dir.path(), "include/sts/tree/Tree.h");
        touch(dir.path(), "src/detail/TreeImpl.h");
        touch(dir.path(), "src-test/TestTree.cpp");
        touch(dir.path(), "build/include/generated.h");

        let engine = engine(dir.path(), &Recorder::default());
        let recipe = sts_tree();
        let settings = settings("gcc", "11", "Release", "x86_64");
        let mut state = BuildState::new(&recipe, &settings, flags("0", ""));

        engine.run_stage(&mut state, Stage::Package).await.unwrap();

        let package = dir.path().join("package");
        assert!(package.join("licenses/LICENSE").is_file());
        assert!(package.join("licenses/license.txt").is_file());
        assert!(package.join("include/sts/tree/TreeItem.h").is_file());
        assert!(package.join("include/sts/tree/Tree.h").is_file());
        assert!(package.join("src/detail/TreeImpl.h").is_file());
        assert!(!package.join("src-test").exists());
        assert!(!package.join("build").exists());
        assert!(!package.join("include/generated.h").exists());
        assert_eq!(state.packaged.len(), 5);
    }

    #[tokio::test]
    async fn a_second_run_does_not_repackage_its_own_output() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "LICENSE");
        touch(dir.path(), "include/a.h");

        let engine = engine(dir.path(), &Recorder::default());
        let recipe = sts_tree();
        let settings = settings("gcc", "11", "Release", "x86_64");

        for _ in 0..2 {
            let mut state = BuildState::new(&recipe, &settings, flags("0", ""));
            engine.run_stage(&mut state, Stage::Package).await.unwrap();
            assert_eq!(state.packaged.len(), 2);
        }
    }
}
