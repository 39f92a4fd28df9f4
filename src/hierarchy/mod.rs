//! Merges a workspace rig hierarchy into its base.
//!
//! The merge runs in three passes over one shared `RigDom`:
//!
//! 1. A breadth-first co-walk pairs every workspace node with a base node of
//!    the same name, copying unmatched subtrees under a freshly created merge
//!    root. The result is a `NodeMapping`.
//! 2. Components are reconciled onto every paired base node, then each of
//!    their reference slots is translated through the mapping. Bones that
//!    already existed on the base are referenced through proxies.
//! 3. A `PathMapping` is derived for the animation relocator.
//!
//! Nothing is ever removed from the DOM; the merge only adds nodes and
//! components and rewrites references on components it reconciled.

mod mapping;
mod merge;
mod proxy;
mod reconcile;


use rig_dom::{Component, ComponentKind, ObjectRef, Ref, RigDom};
use serde::Serialize;

use crate::{
    error::{MergeWarning, ModularizeError},
    options::ModularizeOptions,
};

pub use self::{
    mapping::{NodeMapping, PathMapping},
    proxy::ProxyRegistry,
};

/// Component kind of the marker that tells the host how to attach a node to
/// a bone of the base rig.
pub const BONE_PROXY_KIND: &str = "BoneProxy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttachmentMode {
    /// Reparent under the target, keeping the current world pose.
    AsChildKeepWorldPose,

    /// Reparent under the target, snapping to its origin.
    AsChildAtRoot,
}

impl AttachmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentMode::AsChildKeepWorldPose => "AsChildKeepWorldPose",
            AttachmentMode::AsChildAtRoot => "AsChildAtRoot",
        }
    }
}

pub fn bone_proxy_marker(target: Ref, mode: AttachmentMode) -> Component {
    Component::new(BONE_PROXY_KIND)
        .with_property("target", ObjectRef::node(target))
        .with_property("attachmentMode", mode.as_str())
}

/// Why the merge created a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CreationReason {
    MergeRoot,

    /// A workspace subtree with no counterpart on the base.
    Copy { source: Ref, attach_to: Ref },

    Proxy { target: Ref },
}

/// One mutation performed on the DOM, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MergeChange {
    NodeCreated {
        node: Ref,
        parent: Ref,
        reason: CreationReason,
    },
    ComponentAdded {
        node: Ref,
        kind: ComponentKind,
    },
    ReferenceRewritten {
        node: Ref,
        kind: ComponentKind,
        slot: usize,
        from: ObjectRef,
        to: ObjectRef,
    },
    ReferenceCleared {
        node: Ref,
        kind: ComponentKind,
        slot: usize,
        from: ObjectRef,
    },
}

#[derive(Debug, Clone)]
pub struct HierarchyMerge {
    pub merge_root: Ref,
    pub mapping: NodeMapping,
    pub proxies: ProxyRegistry,
    pub path_mapping: PathMapping,
    pub changes: Vec<MergeChange>,
    pub warnings: Vec<MergeWarning>,
}

/// Checks that the roots exist and are disjoint trees. Runs before anything
/// is mutated.
pub fn validate_roots(
    dom: &RigDom,
    workspace_root: Ref,
    base_root: Ref,
    merge_root_parent: Ref,
) -> Result<(), ModularizeError> {
    if dom.get_by_ref(workspace_root).is_none() {
        return Err(ModularizeError::MissingWorkspaceRoot { id: workspace_root });
    }

    if dom.get_by_ref(base_root).is_none() {
        return Err(ModularizeError::MissingBaseRoot { id: base_root });
    }

    if dom.get_by_ref(merge_root_parent).is_none() {
        return Err(ModularizeError::MissingMergeRootParent {
            id: merge_root_parent,
        });
    }

    if workspace_root == base_root {
        return Err(ModularizeError::SameRoot { id: base_root });
    }

    if dom.is_descendant_of(workspace_root, base_root)
        || dom.is_descendant_of(base_root, workspace_root)
    {
        return Err(ModularizeError::NestedRoots {
            workspace: workspace_root,
            base: base_root,
        });
    }

    Ok(())
}

pub fn merge_hierarchy(
    dom: &mut RigDom,
    workspace_root: Ref,
    base_root: Ref,
    merge_root_parent: Ref,
    options: &ModularizeOptions,
) -> Result<HierarchyMerge, ModularizeError> {
    validate_roots(dom, workspace_root, base_root, merge_root_parent)?;

    let mut changes = Vec::new();
    let mut warnings = Vec::new();

    let merge_root = merge::create_merge_root(
        dom,
        workspace_root,
        merge_root_parent,
        options,
        &mut changes,
    )?;

    let mapping = merge::pair_nodes(dom, workspace_root, base_root, merge_root, &mut changes)?;
    log::debug!("Paired {} workspace nodes", mapping.len());

    let mut proxies = ProxyRegistry::default();
    reconcile::reconcile_components(
        dom,
        &mapping,
        merge_root,
        &mut proxies,
        options,
        &mut changes,
        &mut warnings,
    )?;

    let path_mapping = PathMapping::from_node_mapping(dom, &mapping, workspace_root, merge_root);

    log::info!(
        "Merged hierarchy: {} nodes paired, {} proxies, {} relocated paths, {} warnings",
        mapping.len(),
        proxies.len(),
        path_mapping.len(),
        warnings.len()
    );

    Ok(HierarchyMerge {
        merge_root,
        mapping,
        proxies,
        path_mapping,
        changes,
        warnings,
    })
}
