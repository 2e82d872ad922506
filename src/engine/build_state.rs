use crate::definition::settings::BuildSettings;
use crate::definition::Recipe;
use crate::engine::environment::EnvFlags;
use crate::engine::identity::PackageId;
use crate::engine::requirements::Requirements;
use crate::engine::Stage;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub struct BuildState<'a> {
    pub recipe: &'a Recipe,
    pub settings: &'a BuildSettings,
    pub flags: EnvFlags,
    pub stage: Stage,
    pub completed: BTreeSet<Stage>,
    pub requirements: Requirements,
    pub packaged: Vec<PathBuf>,
    pub package_id: Option<PackageId>,
}

impl<'a> BuildState<'a> {
    pub fn new(recipe: &'a Recipe, settings: &'a BuildSettings, flags: EnvFlags) -> Self {
        BuildState {
            recipe,
            settings,
            flags,
            stage: Stage::Export,
            completed: BTreeSet::new(),
            requirements: Requirements::default(),
            packaged: vec![],
            package_id: None,
        }
    }
}
