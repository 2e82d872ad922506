use crate::definition::CopyRule;
use crate::engine::build_state::BuildState;
use crate::engine::build_system::BuildContext;
use crate::engine::copier::copy_matching;
use crate::engine::hooks::Hook;
use crate::engine::{Engine, Stage};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

pub const BUILD_TESTING: &str = "BUILD_TESTING";
pub const TESTING_REPORT_DIR: &str = "TESTING_REPORT_DIR";

/// configure, build, install and, when testing, test. The first failure ends the stage.
#[derive(Debug)]
pub struct RunBuildSystem;

#[async_trait]
impl Hook for RunBuildSystem {
    const PRIORITY: usize = 0;
    const STAGE: Stage = Stage::Build;

    async fn run(&self, state: &mut BuildState<'_>, engine: &Engine) -> anyhow::Result<()> {
        let source_path = prepare_sources(state, engine).await?;

        let mut system = engine.build_system().create(BuildContext {
            source_path,
            build_path: engine.settings.build_path().to_path_buf(),
            install_prefix: engine.settings.package_path().to_path_buf(),
            settings: state.settings.clone(),
        });

        engine.vcs().setup(system.definitions_mut()).await?;

        let testing = state.flags.testing();
        system
            .definitions_mut()
            .set(BUILD_TESTING, if testing { "ON" } else { "OFF" });

        if let Some(dir) = state.flags.report_dir() {
            system.definitions_mut().set(TESTING_REPORT_DIR, dir);
        }

        system.configure().await?;
        system.build().await?;
        system.install().await?;

        if testing {
            system.test().await?;
        }

        Ok(())
    }
}

/// Builds in place, or from a fresh copy of the exported sources.
async fn prepare_sources(state: &BuildState<'_>, engine: &Engine) -> anyhow::Result<PathBuf> {
    let settings = &engine.settings;
    if state.recipe.no_copy_source {
        return Ok(settings.source_path().to_path_buf());
    }

    let target = settings.copied_source_path();
    info!(to = %target.display(), "copying sources");

    for pattern in &state.recipe.exports_sources {
        copy_matching(
            &CopyRule::exported(pattern.as_str()),
            settings.source_path(),
            &target,
            &settings.output_paths(),
        )
        .await?;
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::settings::settings;
    use crate::definition::Recipe;
    use crate::engine::build_system::recording::Recorder;
    use crate::engine::copier::touch;
    use crate::engine::environment::{flags, EnvFlags};
    use crate::engine::testing::{engine, sts_tree, vcs};
    use crate::engine::EngineSettings;

    async fn build(recipe: &Recipe, flags: EnvFlags, recorder: &Recorder) -> anyhow::Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), recorder);
        let settings = settings("gcc", "11", "Release", "x86_64");
        let mut state = BuildState::new(recipe, &settings, flags);

        engine.run_stage(&mut state, Stage::Build).await
    }

    #[tokio::test]
    async fn testing_adds_the_test_run_after_install() {
        let recorder = Recorder::default();
        build(&sts_tree(), flags("1", ""), &recorder).await.unwrap();

        assert_eq!(recorder.steps(), ["configure", "build", "install", "test"]);
        assert_eq!(recorder.configured_with().get(BUILD_TESTING), Some("ON"));
    }

    #[tokio::test]
    async fn without_testing_the_test_run_is_skipped() {
        for value in ["0", "true", ""] {
            let recorder = Recorder::default();
            build(&sts_tree(), flags(value, ""), &recorder).await.unwrap();

            assert_eq!(recorder.steps(), ["configure", "build", "install"]);
            assert_eq!(recorder.configured_with().get(BUILD_TESTING), Some("OFF"));
        }
    }

    #[tokio::test]
    async fn report_dir_is_only_defined_when_given() {
        let recorder = Recorder::default();
        build(&sts_tree(), flags("1", ""), &recorder).await.unwrap();
        assert!(!recorder.configured_with().contains(TESTING_REPORT_DIR));

        let recorder = Recorder::default();
        build(&sts_tree(), flags("0", "/tmp/reports dir"), &recorder)
            .await
            .unwrap();
        assert_eq!(
            recorder.configured_with().get(TESTING_REPORT_DIR),
            Some("/tmp/reports dir")
        );
    }

    #[tokio::test]
    async fn vcs_metadata_reaches_configure() {
        let recorder = Recorder::default();
        build(&sts_tree(), flags("0", ""), &recorder).await.unwrap();

        let definitions = recorder.configured_with();
        assert_eq!(definitions.get("VCS_REVISION"), Some("c0ffee"));
        assert_eq!(definitions.get("VCS_BRANCH"), Some("master"));
    }

    #[tokio::test]
    async fn failures_stop_the_sequence() {
        let recorder = Recorder::failing_on("configure");
        assert!(build(&sts_tree(), flags("1", ""), &recorder).await.is_err());
        assert_eq!(recorder.steps(), ["configure"]);

        let recorder = Recorder::failing_on("install");
        assert!(build(&sts_tree(), flags("1", ""), &recorder).await.is_err());
        assert_eq!(recorder.steps(), ["configure", "build", "install"]);
    }

    #[tokio::test]
    async fn copied_sources_are_built_from_the_build_folder() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "CMakeLists.txt");
        touch(dir.path(), "include/sts/tree/TreeItem.h");
        touch(dir.path(), "notes.txt");

        let mut recipe = sts_tree();
        recipe.no_copy_source = false;

        let recorder = Recorder::default();
        let engine = engine(dir.path(), &recorder);
        let settings = settings("gcc", "11", "Release", "x86_64");
        let mut state = BuildState::new(&recipe, &settings, flags("0", ""));

        engine.run_stage(&mut state, Stage::Build).await.unwrap();

        let copied = dir.path().join("build/source");
        assert!(copied.join("CMakeLists.txt").is_file());
        assert!(copied.join("include/sts/tree/TreeItem.h").is_file());
        assert!(!copied.join("notes.txt").exists());

        let contexts = recorder.contexts.lock().unwrap();
        assert_eq!(contexts[0].source_path, copied);
        assert_eq!(contexts[0].install_prefix, dir.path().join("package"));
    }

    #[tokio::test]
    async fn relative_folders_reach_the_build_system_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let layout = EngineSettings::relative_to(
            dir.path(),
            PathBuf::from("recipe.kdl"),
            None,
            PathBuf::from("build"),
            PathBuf::from("package"),
            PathBuf::from("export"),
        );

        let recorder = Recorder::default();
        let engine = Engine::from_parts(layout, recorder.clone(), vcs());
        let recipe = sts_tree();
        let settings = settings("gcc", "11", "Release", "x86_64");
        let mut state = BuildState::new(&recipe, &settings, flags("0", ""));

        engine.run_stage(&mut state, Stage::Build).await.unwrap();

        let contexts = recorder.contexts.lock().unwrap();
        assert_eq!(contexts[0].source_path, dir.path());
        assert_eq!(contexts[0].build_path, dir.path().join("build"));
        assert_eq!(contexts[0].install_prefix, dir.path().join("package"));
        assert!(contexts[0].source_path.is_absolute());
    }
}
