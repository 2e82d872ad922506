use crate::definition::TestingVars;
use tracing::debug;

/// Test-mode flags, read once per invocation and threaded through every stage.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct EnvFlags {
    pub test_enabled: String,
    pub test_report_dir: String,
}

impl EnvFlags {
    pub fn from_env(vars: &TestingVars) -> Self {
        Self::from_lookup(vars, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(vars: &TestingVars, lookup: F) -> Self {
        let flags = EnvFlags {
            test_enabled: lookup(&vars.enable_var).unwrap_or_else(|| "0".to_string()),
            test_report_dir: lookup(&vars.report_dir_var).unwrap_or_default(),
        };

        debug!(
            enable_var = %vars.enable_var,
            report_dir_var = %vars.report_dir_var,
            ?flags,
            "read testing flags"
        );

        flags
    }

    /// Only the literal `"1"` turns testing on.
    pub fn testing(&self) -> bool {
        self.test_enabled == "1"
    }

    pub fn report_dir(&self) -> Option<&str> {
        if self.test_report_dir.is_empty() {
            None
        } else {
            Some(&self.test_report_dir)
        }
    }
}

#[cfg(test)]
pub(crate) fn flags(test_enabled: &str, test_report_dir: &str) -> EnvFlags {
    EnvFlags {
        test_enabled: test_enabled.to_string(),
        test_report_dir: test_report_dir.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_the_variables_named_by_the_recipe() {
        let vars = TestingVars {
            enable_var: "MY_TESTS".to_string(),
            report_dir_var: "MY_REPORTS".to_string(),
        };
        let env: HashMap<&str, &str> = [("MY_TESTS", "1"), ("MY_REPORTS", "/tmp/reports")].into();

        let flags = EnvFlags::from_lookup(&vars, |k| env.get(k).map(|v| v.to_string()));

        assert!(flags.testing());
        assert_eq!(flags.report_dir(), Some("/tmp/reports"));
    }

    #[test]
    fn unset_variables_disable_testing() {
        let flags = EnvFlags::from_lookup(&TestingVars::default(), |_| None);

        assert_eq!(flags.test_enabled, "0");
        assert!(!flags.testing());
        assert_eq!(flags.report_dir(), None);
    }

    #[test]
    fn only_literal_one_enables_testing() {
        for value in ["0", "", "true", "yes", " 1", "1 ", "01"] {
            assert!(!flags(value, "").testing(), "{:?} should not enable testing", value);
        }
        assert!(flags("1", "").testing());
    }
}
