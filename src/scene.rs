use std::collections::BTreeMap;

use rig_dom::{Assets, RigDom};
use serde::{Deserialize, Serialize};

use crate::{descriptor::Avatar, module::DiffModule, options::ModularizeOptions};

/// A snapshot of everything the modularizer works on: the node trees, the
/// assets they use, and which trees are avatars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub dom: RigDom,

    #[serde(default)]
    pub assets: Assets,

    /// Avatars by display name.
    #[serde(default)]
    pub avatars: BTreeMap<String, Avatar>,

    #[serde(default)]
    pub options: ModularizeOptions,
}

impl Scene {
    pub fn avatar(&self, name: &str) -> Option<&Avatar> {
        self.avatars.get(name)
    }
}

/// What `modularizer modularize` writes: the module plus the scene it refers
/// into, since the module's IDs only make sense alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct ModularizeOutput<'a> {
    pub module: &'a DiffModule,
    pub scene: &'a Scene,
}
