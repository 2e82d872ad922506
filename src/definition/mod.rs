pub mod parsing;
pub mod reference;
pub mod settings;

use crate::definition::parsing::ParseDocument;
use anyhow::{bail, Context};
use handlebars::Handlebars;
use hearth_utils::{ObjectTraversal, ObjectWalker};
use kdl::KdlDocument;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_BUILD_TEST_VAR: &str = "CONAN_BUILD_TESTING";
pub const DEFAULT_TEST_DIR_VAR: &str = "CONAN_TESTING_REPORT_DIR";

#[derive(Default, Debug, Clone)]
pub struct Document {
    pub recipes: Vec<Recipe>,
}

#[derive(Default, Debug, Clone, ObjectTraversal)]
pub struct Recipe {
    pub metadata: RecipeMetadata,
    pub settings: Vec<String>,
    pub options: OptionSet,
    pub exports: Vec<String>,
    pub exports_sources: Vec<String>,
    pub no_copy_source: bool,
    pub testing: TestingVars,
    pub requires: Vec<RequirementDecl>,
    pub compiler_guards: Vec<CompilerGuard>,
    pub package_rules: Vec<CopyRule>,
    #[skip]
    pub package_id: PackageIdMode,
}

#[derive(Default, Debug, Clone, Eq, PartialEq, ObjectTraversal)]
pub struct RecipeMetadata {
    pub name: String,
    pub version: String,
    pub license: String,
    pub url: String,
    pub author: String,
    pub description: String,
}

/// Default options handed to dependencies, keyed by dependency name and then option name.
#[derive(Default, Debug, Clone, Eq, PartialEq, ObjectTraversal)]
pub struct OptionSet(pub BTreeMap<String, BTreeMap<String, String>>);

impl OptionSet {
    pub fn for_dependency(&self, name: &str) -> BTreeMap<String, String> {
        self.0.get(name).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, dependency: &str, option: &str, value: impl Into<String>) {
        self.0
            .entry(dependency.to_string())
            .or_default()
            .insert(option.to_string(), value.into());
    }
}

#[derive(Debug, Clone, ObjectTraversal)]
pub struct TestingVars {
    pub enable_var: String,
    pub report_dir_var: String,
}

impl Default for TestingVars {
    fn default() -> Self {
        TestingVars {
            enable_var: DEFAULT_BUILD_TEST_VAR.to_string(),
            report_dir_var: DEFAULT_TEST_DIR_VAR.to_string(),
        }
    }
}

#[derive(Debug, Clone, ObjectTraversal)]
pub struct RequirementDecl {
    pub reference: String,
    pub private: bool,
    #[skip]
    pub when: Condition,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Condition {
    #[default]
    Always,
    Testing,
}

impl Condition {
    pub fn parse<T: AsRef<str>>(data: T) -> Option<Condition> {
        Some(match data.as_ref() {
            "always" => Condition::Always,
            "testing" => Condition::Testing,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, ObjectTraversal)]
pub struct CompilerGuard {
    pub compiler: String,
    pub minimum: f64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, ObjectTraversal)]
pub struct CopyRule {
    pub pattern: String,
    pub src: String,
    pub dst: String,
    pub keep_path: bool,
    pub ignore_case: bool,
}

impl CopyRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        CopyRule {
            pattern: pattern.into(),
            src: ".".to_string(),
            dst: String::new(),
            keep_path: true,
            ignore_case: false,
        }
    }

    /// Rule used for `exports` and `exports-sources`: paths are kept and names match
    /// regardless of case, so `license*` also picks up `LICENSE`.
    pub fn exported(pattern: impl Into<String>) -> Self {
        CopyRule {
            ignore_case: true,
            ..CopyRule::new(pattern)
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum PackageIdMode {
    #[default]
    Default,
    HeaderOnly,
}

impl PackageIdMode {
    pub fn parse<T: AsRef<str>>(data: T) -> Option<PackageIdMode> {
        Some(match data.as_ref() {
            "default" => PackageIdMode::Default,
            "header-only" => PackageIdMode::HeaderOnly,
            _ => return None,
        })
    }
}

#[derive(Serialize, Debug)]
pub struct RecipeTemplate {
    #[serde(rename = "self-ref")]
    pub self_ref: String,
    pub name: String,
    pub version: String,
    pub author: String,
}

impl Recipe {
    pub fn template_vars(&self) -> RecipeTemplate {
        RecipeTemplate {
            self_ref: format!("{}/{}", self.metadata.name, self.metadata.version),
            name: self.metadata.name.clone(),
            version: self.metadata.version.clone(),
            author: self.metadata.author.clone(),
        }
    }

    /// Reads a recipe file, reporting every parse problem through miette before failing.
    pub async fn load(path: &Path) -> anyhow::Result<Recipe> {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed reading recipe {}", path.display()))?;

        Recipe::from_source(&source, &path.display().to_string())
    }

    pub fn from_source(source: &str, file_name: &str) -> anyhow::Result<Recipe> {
        let kdl_document: KdlDocument = source.parse()?;

        let document = match Document::parse_document_strict(&kdl_document, source, Some(file_name))
        {
            Ok(document) => document,
            Err(report) => {
                eprintln!("{:?}", report);
                bail!("failed parsing recipe {}", file_name);
            }
        };

        let mut recipes = document.recipes.into_iter();
        let mut recipe = match (recipes.next(), recipes.next()) {
            (Some(recipe), None) => recipe,
            (None, _) => bail!("{} does not declare a recipe", file_name),
            (Some(_), Some(_)) => bail!("{} declares more than one recipe", file_name),
        };

        recipe.expand_templates()?;
        Ok(recipe)
    }

    pub fn expand_templates(&mut self) -> anyhow::Result<()> {
        let mut engine = Handlebars::new();
        engine.register_escape_fn(handlebars::no_escape);
        engine.set_strict_mode(true);

        let vars = self.template_vars();
        self.traverse(&mut TemplateReplace { engine, vars })
    }
}

pub struct TemplateReplace<'a> {
    engine: Handlebars<'a>,
    vars: RecipeTemplate,
}

impl ObjectWalker for TemplateReplace<'_> {
    type Error = anyhow::Error;

    fn enter_string(&mut self, value: &mut String) -> anyhow::Result<()> {
        if value.contains("{{") {
            *value = self
                .engine
                .render_template(value, &self.vars)
                .with_context(|| format!("failed expanding template `{}`", value))?;
        }

        Ok(())
    }
}
