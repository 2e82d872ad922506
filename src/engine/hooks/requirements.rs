use crate::definition::reference::Reference;
use crate::definition::Condition;
use crate::engine::build_state::BuildState;
use crate::engine::hooks::Hook;
use crate::engine::{Engine, Stage};
use async_trait::async_trait;
use tracing::info;

/// Declares dependencies for the external dependency manager. Test-only ones appear only when
/// testing is switched on.
#[derive(Debug)]
pub struct DeclareRequirements;

#[async_trait]
impl Hook for DeclareRequirements {
    const PRIORITY: usize = 0;
    const STAGE: Stage = Stage::Requirements;

    async fn run(&self, state: &mut BuildState<'_>, _engine: &Engine) -> anyhow::Result<()> {
        let testing = state.flags.testing();

        for decl in &state.recipe.requires {
            let wanted = match decl.when {
                Condition::Always => true,
                Condition::Testing => testing,
            };

            if !wanted {
                continue;
            }

            let reference: Reference = decl.reference.parse()?;
            let options = state.recipe.options.for_dependency(&reference.name);

            info!(%reference, private = decl.private, "requires");
            state.requirements.requires(reference, decl.private, options);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::settings::settings;
    use crate::engine::build_system::recording::Recorder;
    use crate::engine::environment::{flags, EnvFlags};
    use crate::engine::testing::{engine, sts_tree};

    async fn declared(flags: EnvFlags) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), &Recorder::default());
        let recipe = sts_tree();
        let settings = settings("gcc", "11", "Release", "x86_64");
        let mut state = BuildState::new(&recipe, &settings, flags);

        engine.run_stage(&mut state, Stage::Requirements).await.unwrap();
        state.requirements.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn testing_declares_the_private_test_framework() {
        assert_eq!(
            declared(flags("1", "")).await,
            ["gtest/1.8.0@bincrafters/stable (private) gtest:build_gmock=true gtest:shared=false"]
        );
    }

    #[tokio::test]
    async fn anything_but_one_declares_nothing() {
        for value in ["0", "", "true", "yes", "on"] {
            assert!(declared(flags(value, "")).await.is_empty(), "{:?}", value);
        }

        assert!(declared(EnvFlags::default()).await.is_empty());
    }

    #[tokio::test]
    async fn unconditional_requirements_are_always_declared() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), &Recorder::default());
        let recipe = crate::definition::Recipe::from_source(
            r#"
            recipe "app" {
                version "1.0"
                requires "zlib/1.2.11"
                requires "gtest/1.8.0" when="testing"
            }
            "#,
            "recipe.kdl",
        )
        .unwrap();
        let settings = settings("gcc", "11", "Release", "x86_64");
        let mut state = BuildState::new(&recipe, &settings, flags("0", ""));

        engine.run_stage(&mut state, Stage::Requirements).await.unwrap();

        let names: Vec<_> = state.requirements.iter().map(|x| x.reference.name.clone()).collect();
        assert_eq!(names, ["zlib"]);
        assert!(!state.requirements.iter().next().unwrap().private);
    }
}
