use std::collections::VecDeque;

use rig_dom::{DomError, NodeBuilder, Ref, RigDom};

use crate::options::ModularizeOptions;

use super::{
    bone_proxy_marker, AttachmentMode, CreationReason, MergeChange, NodeMapping, BONE_PROXY_KIND,
};

pub(super) fn create_merge_root(
    dom: &mut RigDom,
    workspace_root: Ref,
    parent: Ref,
    options: &ModularizeOptions,
    changes: &mut Vec<MergeChange>,
) -> Result<Ref, DomError> {
    let workspace_name = dom
        .get_by_ref(workspace_root)
        .ok_or(DomError::NotFound { id: workspace_root })?
        .name
        .clone();

    let name = options.merge_root_name_for(&workspace_name);
    let merge_root = dom.insert(Some(parent), NodeBuilder::new(name))?;

    log::debug!("Created merge root {} under {}", merge_root, parent);
    changes.push(MergeChange::NodeCreated {
        node: merge_root,
        parent,
        reason: CreationReason::MergeRoot,
    });

    Ok(merge_root)
}

/// Pairs every workspace node with a base node, copying workspace subtrees
/// that have no counterpart under `merge_root`.
///
/// The walk is seeded with the two roots whatever their names are. Children
/// pair with the first not-yet-paired base child of the same name, in child
/// order.
pub(super) fn pair_nodes(
    dom: &mut RigDom,
    workspace_root: Ref,
    base_root: Ref,
    merge_root: Ref,
    changes: &mut Vec<MergeChange>,
) -> Result<NodeMapping, DomError> {
    let mut mapping = NodeMapping::default();
    let mut queue = VecDeque::new();
    queue.push_back((workspace_root, base_root));

    while let Some((workspace_id, base_id)) = queue.pop_front() {
        if !mapping.insert(workspace_id, base_id) {
            continue;
        }

        let workspace_children = dom
            .get_by_ref(workspace_id)
            .ok_or(DomError::NotFound { id: workspace_id })?
            .children()
            .to_vec();

        let base_children: Vec<Ref> = dom
            .get_by_ref(base_id)
            .ok_or(DomError::NotFound { id: base_id })?
            .children()
            .iter()
            .copied()
            .filter(|&child| child != merge_root)
            .collect();

        let mut paired = vec![false; base_children.len()];

        for workspace_child in workspace_children {
            let name = dom
                .get_by_ref(workspace_child)
                .ok_or(DomError::NotFound {
                    id: workspace_child,
                })?
                .name
                .clone();

            let matched = (0..base_children.len()).find(|&index| {
                !paired[index]
                    && dom
                        .get_by_ref(base_children[index])
                        .map(|node| node.name == name)
                        .unwrap_or(false)
            });

            let counterpart = match matched {
                Some(index) => {
                    paired[index] = true;
                    log::trace!(
                        "Paired {:?} ({}) with {}",
                        name,
                        workspace_child,
                        base_children[index]
                    );
                    base_children[index]
                }
                None => copy_subtree(
                    dom,
                    workspace_root,
                    workspace_child,
                    base_id,
                    merge_root,
                    changes,
                )?,
            };

            queue.push_back((workspace_child, counterpart));
        }
    }

    Ok(mapping)
}

/// Copies a workspace subtree under the merge root, keeping its pose
/// relative to the workspace root, and marks it to be attached to
/// `attach_to` at runtime.
fn copy_subtree(
    dom: &mut RigDom,
    workspace_root: Ref,
    source: Ref,
    attach_to: Ref,
    merge_root: Ref,
    changes: &mut Vec<MergeChange>,
) -> Result<Ref, DomError> {
    let root_world = dom
        .world_transform(workspace_root)
        .ok_or(DomError::NotFound { id: workspace_root })?;
    let source_world = dom
        .world_transform(source)
        .ok_or(DomError::NotFound { id: source })?;

    let (copy, _) = dom.clone_subtree(source, Some(merge_root))?;
    let node = dom
        .get_by_ref_mut(copy)
        .ok_or(DomError::NotFound { id: copy })?;

    node.transform = root_world.relative(&source_world);

    if !node.has_component(&BONE_PROXY_KIND.into()) {
        node.add_component(bone_proxy_marker(
            attach_to,
            AttachmentMode::AsChildKeepWorldPose,
        ))?;
    }

    log::debug!(
        "Copied {:?} ({}) to {}, attached to {}",
        node.name,
        source,
        copy,
        attach_to
    );

    changes.push(MergeChange::NodeCreated {
        node: copy,
        parent: merge_root,
        reason: CreationReason::Copy { source, attach_to },
    });

    Ok(copy)
}
