use crate::definition::settings::BuildSettings;
use crate::definition::CompilerGuard;
use crate::engine::build_state::BuildState;
use crate::engine::error::ConfigurationError;
use crate::engine::hooks::Hook;
use crate::engine::{Engine, Stage};
use async_trait::async_trait;

#[derive(Debug)]
pub struct CheckCompiler;

#[async_trait]
impl Hook for CheckCompiler {
    const PRIORITY: usize = 0;
    const STAGE: Stage = Stage::Configure;

    async fn run(&self, state: &mut BuildState<'_>, _engine: &Engine) -> anyhow::Result<()> {
        for guard in &state.recipe.compiler_guards {
            check_guard(guard, state.settings)?;
        }

        Ok(())
    }
}

pub fn check_guard(guard: &CompilerGuard, settings: &BuildSettings) -> Result<(), ConfigurationError> {
    let compiler = &settings.compiler;
    if compiler.name != guard.compiler {
        return Ok(());
    }

    let version = compiler
        .numeric_version()
        .ok_or_else(|| ConfigurationError::InvalidCompilerVersion {
            compiler: compiler.name.clone(),
            version: compiler.version.clone(),
        })?;

    if version < guard.minimum {
        return Err(ConfigurationError::CompilerTooOld {
            compiler: compiler.name.clone(),
            version,
            minimum: guard.minimum,
            message: guard.message.clone().unwrap_or_else(|| {
                format!("{} {} or higher is required", guard.compiler, guard.minimum)
            }),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::settings::settings;

    fn visual_studio_14() -> CompilerGuard {
        CompilerGuard {
            compiler: "Visual Studio".to_string(),
            minimum: 14.0,
            message: None,
        }
    }

    #[test]
    fn rejects_guarded_compiler_below_minimum() {
        for version in ["13", "12", "8", "13.9", "0"] {
            let err = check_guard(&visual_studio_14(), &settings("Visual Studio", version, "Release", "x86"))
                .unwrap_err();
            assert!(matches!(err, ConfigurationError::CompilerTooOld { .. }), "{}", version);
        }
    }

    #[test]
    fn accepts_guarded_compiler_at_or_above_minimum() {
        for version in ["14", "14.0", "15", "16", "17"] {
            assert_eq!(
                check_guard(&visual_studio_14(), &settings("Visual Studio", version, "Release", "x86")),
                Ok(()),
                "{}",
                version
            );
        }
    }

    #[test]
    fn other_compilers_are_not_guarded() {
        let old_gcc = settings("gcc", "4", "Release", "x86_64");
        assert_eq!(check_guard(&visual_studio_14(), &old_gcc), Ok(()));

        let odd_clang = settings("clang", "trunk", "Release", "x86_64");
        assert_eq!(check_guard(&visual_studio_14(), &odd_clang), Ok(()));
    }

    #[test]
    fn non_numeric_guarded_version_is_a_configuration_error() {
        let year = check_guard(&visual_studio_14(), &settings("Visual Studio", "2015", "Debug", "x86"));
        assert_eq!(year, Ok(()));

        for version in ["latest", "nan", "NaN", "inf", "-inf", ""] {
            let err = check_guard(&visual_studio_14(), &settings("Visual Studio", version, "Debug", "x86"))
                .unwrap_err();
            assert!(
                matches!(err, ConfigurationError::InvalidCompilerVersion { .. }),
                "{:?}",
                version
            );
        }
    }

    #[test]
    fn message_defaults_to_compiler_and_minimum() {
        let err = check_guard(&visual_studio_14(), &settings("Visual Studio", "12", "Debug", "x86"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Visual Studio 14 or higher is required");
    }
}
