use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SettingsError {
    #[error("setting `{0}` should be given as key=value")]
    Malformed(String),
    #[error("required setting `{0}` is missing")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Compiler {
    pub name: String,
    pub version: String,
}

impl Compiler {
    /// The version as a number, the way compiler guards compare it. `nan` and `inf` are not
    /// versions.
    pub fn numeric_version(&self) -> Option<f64> {
        self.version.trim().parse::<f64>().ok().filter(|x| x.is_finite())
    }
}

/// Settings injected by whoever invokes the recipe. Never changed by the engine.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BuildSettings {
    pub os: String,
    pub compiler: Compiler,
    pub build_type: String,
    pub arch: String,
    pub extra: BTreeMap<String, String>,
}

impl BuildSettings {
    pub fn from_pairs<I, S>(pairs: I) -> Result<BuildSettings, SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = BTreeMap::new();

        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| SettingsError::Malformed(pair.to_string()))?;

            let key = key.trim();
            if key.is_empty() {
                return Err(SettingsError::Malformed(pair.to_string()));
            }

            values.insert(key.to_string(), value.trim().to_string());
        }

        let mut take = |key: &'static str| values.remove(key).ok_or(SettingsError::Missing(key));

        let os = take("os")?;
        let compiler = Compiler {
            name: take("compiler")?,
            version: take("compiler.version")?,
        };
        let build_type = take("build_type")?;
        let arch = take("arch")?;

        Ok(BuildSettings {
            os,
            compiler,
            build_type,
            arch,
            extra: values,
        })
    }

    /// Flattened `key -> value` view, sub-settings included.
    pub fn values(&self) -> BTreeMap<String, String> {
        let mut values = self.extra.clone();
        values.insert("os".to_string(), self.os.clone());
        values.insert("compiler".to_string(), self.compiler.name.clone());
        values.insert("compiler.version".to_string(), self.compiler.version.clone());
        values.insert("build_type".to_string(), self.build_type.clone());
        values.insert("arch".to_string(), self.arch.clone());
        values
    }
}

#[cfg(test)]
pub(crate) fn settings(compiler: &str, version: &str, build_type: &str, arch: &str) -> BuildSettings {
    BuildSettings::from_pairs([
        "os=Windows".to_string(),
        format!("compiler={}", compiler),
        format!("compiler.version={}", version),
        format!("build_type={}", build_type),
        format!("arch={}", arch),
    ])
    .unwrap()
}
