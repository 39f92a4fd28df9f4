use rig_dom::ComponentKind;
use serde::{Deserialize, Serialize};

/// Tunables for a modularize run. Loaded from the `options` field of a scene
/// document; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModularizeOptions {
    /// Name of the node that receives everything the merge creates.
    /// `{workspace}` is replaced with the workspace root's name.
    pub merge_root_name: String,

    /// Component kinds that identify an avatar rather than describe it, and
    /// so are never copied onto the base.
    pub excluded_kinds: Vec<ComponentKind>,

    /// Folder that persist requests are placed under.
    pub generated_folder: String,
}

impl Default for ModularizeOptions {
    fn default() -> Self {
        ModularizeOptions {
            merge_root_name: "Merged Root ({workspace})".to_owned(),
            excluded_kinds: vec![
                ComponentKind::new("AvatarDescriptor"),
                ComponentKind::new("PipelineManager"),
            ],
            generated_folder: "Assets/Generated".to_owned(),
        }
    }
}

impl ModularizeOptions {
    pub fn merge_root_name_for(&self, workspace_name: &str) -> String {
        self.merge_root_name.replace("{workspace}", workspace_name)
    }

    pub fn is_excluded(&self, kind: &ComponentKind) -> bool {
        self.excluded_kinds.contains(kind)
    }

    /// Where a generated asset named `name` should be persisted.
    pub fn asset_path(&self, workspace_name: &str, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.generated_folder.trim_end_matches('/'),
            workspace_name,
            name
        )
    }
}
