use crate::definition::settings::BuildSettings;
use crate::definition::RecipeMetadata;
use crate::engine::requirements::Requirements;
use ring::digest::{Context, SHA256};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PackageId([u8; 32]);

impl Display for PackageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The inputs that decide binary compatibility of a built package.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PackageInfo {
    pub reference: String,
    pub settings: BTreeMap<String, String>,
    pub requires: Vec<String>,
}

impl PackageInfo {
    /// Only the settings the recipe declares take part; sub-settings follow their parent.
    pub fn new(
        metadata: &RecipeMetadata,
        declared: &[String],
        settings: &BuildSettings,
        requirements: &Requirements,
    ) -> Self {
        let settings = settings
            .values()
            .into_iter()
            .filter(|(key, _)| {
                let root = key.split('.').next().unwrap_or(key);
                declared.iter().any(|x| x == root)
            })
            .collect();

        let mut requires: Vec<String> = requirements
            .public()
            .map(|x| format!("{}/{}", x.reference.name, x.reference.version))
            .collect();
        requires.sort();

        PackageInfo {
            reference: format!("{}/{}", metadata.name, metadata.version),
            settings,
            requires,
        }
    }

    /// A header-only package has no ABI, so nothing about the build configuration or its
    /// dependencies may split its identity.
    pub fn header_only(&mut self) {
        self.settings.clear();
        self.requires.clear();
    }

    pub fn canonical(&self) -> String {
        let mut text = format!("[reference]\n{}\n[settings]\n", self.reference);

        for (key, value) in &self.settings {
            text.push_str(&format!("{}={}\n", key, value));
        }

        text.push_str("[requires]\n");
        for item in &self.requires {
            text.push_str(item);
            text.push('\n');
        }

        text
    }

    pub fn package_id(&self) -> PackageId {
        let mut digest = Context::new(&SHA256);
        digest.update(self.canonical().as_bytes());
        let fin = digest.finish();

        let mut id = [0u8; 32];
        id.copy_from_slice(fin.as_ref());
        PackageId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::settings::settings;
    use std::collections::BTreeMap;

    fn metadata() -> RecipeMetadata {
        RecipeMetadata {
            name: "sts-tree".to_string(),
            version: "0.1.1".to_string(),
            license: "BSD 3-Clause".to_string(),
            ..Default::default()
        }
    }

    fn declared() -> Vec<String> {
        ["os", "compiler", "build_type", "arch"].map(String::from).to_vec()
    }

    fn info(settings: &BuildSettings) -> PackageInfo {
        PackageInfo::new(&metadata(), &declared(), settings, &Requirements::default())
    }

    #[test]
    fn default_identity_tracks_the_configuration() {
        let release = info(&settings("gcc", "11", "Release", "x86_64"));
        let debug = info(&settings("gcc", "11", "Debug", "x86_64"));

        assert_ne!(release.package_id(), debug.package_id());
        assert_eq!(release.settings.get("compiler.version").unwrap(), "11");
    }

    #[test]
    fn undeclared_settings_do_not_take_part() {
        let mut with_extra = settings("gcc", "11", "Release", "x86_64");
        with_extra.extra.insert("cppstd".to_string(), "17".to_string());
        with_extra.extra.insert("compiler.libcxx".to_string(), "libstdc++11".to_string());

        let info = info(&with_extra);
        assert!(!info.settings.contains_key("cppstd"));
        assert!(info.settings.contains_key("compiler.libcxx"));
    }

    #[test]
    fn header_only_identity_ignores_compiler_build_type_and_arch() {
        let configurations = [
            settings("Visual Studio", "15", "Release", "x86_64"),
            settings("Visual Studio", "14", "Debug", "x86"),
            settings("gcc", "11", "RelWithDebInfo", "armv8"),
            settings("clang", "16.0", "MinSizeRel", "x86_64"),
        ];

        let ids: Vec<PackageId> = configurations
            .iter()
            .map(|s| {
                let mut info = info(s);
                info.header_only();
                info.package_id()
            })
            .collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn header_only_identity_still_follows_the_version() {
        let s = settings("gcc", "11", "Release", "x86_64");
        let mut current = info(&s);
        current.header_only();

        let mut next_meta = metadata();
        next_meta.version = "0.1.2".to_string();
        let mut next = PackageInfo::new(&next_meta, &declared(), &s, &Requirements::default());
        next.header_only();

        assert_ne!(current.package_id(), next.package_id());
    }

    #[test]
    fn public_requirements_take_part_by_name_and_version() {
        let mut requirements = Requirements::default();
        requirements
            .requires("zlib/1.2.11@conan/stable".parse().unwrap(), false, BTreeMap::new())
            .requires("gtest/1.8.0".parse().unwrap(), true, BTreeMap::new());

        let s = settings("gcc", "11", "Release", "x86_64");
        let info = PackageInfo::new(&metadata(), &declared(), &s, &requirements);

        assert_eq!(info.requires, ["zlib/1.2.11"]);
        assert_eq!(info.package_id().to_string().len(), 64);
    }
}
