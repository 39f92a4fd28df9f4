use rig_dom::{AssetError, AssetId, ComponentKind, DomError, Ref};
use serde::Serialize;
use thiserror::Error;

use crate::descriptor::LayerType;

/// Problems that stop a merge. Invalid roots are caught before anything is
/// mutated.
#[derive(Debug, Error)]
pub enum ModularizeError {
    #[error("workspace root {id} does not exist")]
    MissingWorkspaceRoot { id: Ref },

    #[error("base root {id} does not exist")]
    MissingBaseRoot { id: Ref },

    #[error("merge root parent {id} does not exist")]
    MissingMergeRootParent { id: Ref },

    #[error("{id} cannot be used as both the workspace and the base")]
    SameRoot { id: Ref },

    #[error("workspace root {workspace} and base root {base} are nested inside one another")]
    NestedRoots { workspace: Ref, base: Ref },

    #[error(transparent)]
    Dom {
        #[from]
        source: DomError,
    },

    #[error(transparent)]
    Asset {
        #[from]
        source: AssetError,
    },
}

/// Recoverable problems found while merging. A merge that produced warnings
/// still succeeded; callers are expected to show these to the user.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MergeWarning {
    #[error(
        "{kind} on {node} referred to a {target_kind} on {target}, \
         which has no counterpart after the merge; the reference was cleared"
    )]
    DanglingComponentReference {
        node: Ref,
        kind: ComponentKind,
        target: Ref,
        target_kind: ComponentKind,
    },

    #[error("could not clone {asset} ({name}) referenced from {parent}: {reason}")]
    CloneFailed {
        asset: AssetId,
        name: String,
        parent: AssetId,
        reason: String,
    },

    #[error("the {layer_type:?} controller {asset} is not a plain controller and was skipped")]
    NotAController { layer_type: LayerType, asset: AssetId },

    #[error("{asset} is referenced but missing from the asset store")]
    MissingAsset { asset: AssetId },

    #[error("could not give the workspace its own copy of {asset}; it still shares the base's: {reason}")]
    WorkspaceCopyFailed { asset: AssetId, reason: String },

    #[error("could not bake the {layer_type:?} override controller {asset}: {reason}")]
    BakeFailed {
        layer_type: LayerType,
        asset: AssetId,
        reason: String,
    },
}
