//! Creates the workspace copy of a base avatar that users edit before
//! modularizing.

use std::collections::HashMap;

use rig_dom::{AssetId, Assets, ObjectRef, Ref, References, RigDom, Transform, Vec3};

use crate::{
    descriptor::{Avatar, AvatarDescriptor},
    error::{MergeWarning, ModularizeError},
    module::PersistRequest,
    options::ModularizeOptions,
};

#[derive(Debug, Clone)]
pub struct WorkspaceClone {
    pub name: String,
    pub avatar: Avatar,

    /// The workspace's private copies of the base's descriptor assets.
    pub persist: Vec<PersistRequest>,
    pub warnings: Vec<MergeWarning>,
}

/// Returns `desired`, or `desired (n)` with the smallest `n` that makes it
/// unique among `taken`.
pub fn unique_name<'a>(desired: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.into_iter().collect();

    if !taken.contains(&desired) {
        return desired.to_owned();
    }

    (1..)
        .map(|index| format!("{} ({})", desired, index))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| desired.to_owned())
}

/// Clones the base avatar into a new top-level node next to it.
///
/// References between nodes of the cloned subtree point at their copies.
/// Layer controllers, the parameter list, and the menu are duplicated so
/// that edits made on the workspace never reach the base.
pub fn create_workspace(
    dom: &mut RigDom,
    assets: &mut Assets,
    base: &Avatar,
    options: &ModularizeOptions,
) -> Result<WorkspaceClone, ModularizeError> {
    create_workspace_avoiding(dom, assets, base, options, &[])
}

/// Like [`create_workspace`], but the workspace name also avoids `reserved`,
/// such as avatar names or generated folders the caller already uses.
pub fn create_workspace_avoiding(
    dom: &mut RigDom,
    assets: &mut Assets,
    base: &Avatar,
    options: &ModularizeOptions,
    reserved: &[&str],
) -> Result<WorkspaceClone, ModularizeError> {
    let base_node = dom
        .get_by_ref(base.root)
        .ok_or(ModularizeError::MissingBaseRoot { id: base.root })?;

    let desired = format!("{} Dummy", base_node.name);
    let name = unique_name(
        &desired,
        dom.roots()
            .iter()
            .filter_map(|&root| dom.get_by_ref(root))
            .map(|node| node.name.as_str())
            .chain(reserved.iter().copied()),
    );

    let base_world = dom
        .world_transform(base.root)
        .ok_or(ModularizeError::MissingBaseRoot { id: base.root })?;

    let (root, pairs) = dom.clone_subtree(base.root, None)?;
    if let Some(node) = dom.get_by_ref_mut(root) {
        node.name = name.clone();
        node.transform = Transform::new(base_world.position + Vec3::X, base_world.rotation);
    }

    let remapped = remap_internal_references(dom, &pairs);
    log::debug!(
        "Cloned {} nodes into {:?}, remapping {} references",
        pairs.len(),
        name,
        remapped
    );

    let mut persist = Vec::new();
    let mut warnings = Vec::new();
    let mut copy = |asset: AssetId, label: String| -> AssetId {
        match assets.duplicate(asset) {
            Ok(duplicate) => {
                if let Some(entry) = assets.get_mut(duplicate) {
                    entry.name = label.clone();
                }
                persist.push(PersistRequest {
                    asset: duplicate,
                    path: options.asset_path(&name, &label),
                    sub_assets: Vec::new(),
                });
                duplicate
            }
            Err(err) => {
                let warning = MergeWarning::WorkspaceCopyFailed {
                    asset,
                    reason: err.to_string(),
                };
                log::warn!("{}", warning);
                warnings.push(warning);
                asset
            }
        }
    };

    let source = &base.descriptor;
    let descriptor = AvatarDescriptor {
        layers: source
            .layers
            .iter()
            .map(|(&layer_type, &controller)| {
                (
                    layer_type,
                    copy(controller, format!("Temp {}", layer_type.as_str())),
                )
            })
            .collect(),
        expressions_menu: source
            .expressions_menu
            .map(|menu| copy(menu, "Temp Menu".to_owned())),
        expression_parameters: source
            .expression_parameters
            .map(|parameters| copy(parameters, "Temp Parameters".to_owned())),
    };

    log::info!("Created workspace {:?} from {}", name, base.root);

    Ok(WorkspaceClone {
        name,
        avatar: Avatar { root, descriptor },
        persist,
        warnings,
    })
}

/// Points every component reference into the original subtree at the
/// matching copy. Returns how many slots changed.
fn remap_internal_references(dom: &mut RigDom, pairs: &[(Ref, Ref)]) -> usize {
    let copies: HashMap<Ref, Ref> = pairs.iter().copied().collect();
    let mut remapped = 0;

    for &(_, copy) in pairs {
        let node = match dom.get_by_ref_mut(copy) {
            Some(node) => node,
            None => continue,
        };

        for component in node.components_mut() {
            component.for_each_slot(&mut |slot| {
                let replacement = match slot.get() {
                    Some(ObjectRef::Object { node }) => copies.get(&node).map(|&n| ObjectRef::object(n)),
                    Some(ObjectRef::Node { node }) => copies.get(&node).map(|&n| ObjectRef::node(n)),
                    Some(ObjectRef::Component { node, kind }) => {
                        copies.get(&node).map(|&n| ObjectRef::component(n, kind))
                    }
                    _ => None,
                };

                if let Some(replacement) = replacement {
                    if slot.set(Some(replacement)).is_ok() {
                        remapped += 1;
                    }
                }
            });
        }
    }

    remapped
}
