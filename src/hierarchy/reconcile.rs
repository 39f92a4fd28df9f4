use rig_dom::{ComponentKind, DomError, ObjectRef, Ref, References, RigDom};

use crate::{error::MergeWarning, options::ModularizeOptions};

use super::{MergeChange, NodeMapping, ProxyRegistry};

/// What to do with one reference slot of a reconciled component.
enum Resolution {
    Keep,
    Replace(ObjectRef),
    Clear { target: Ref, target_kind: ComponentKind },
}

/// Ensures every paired base node carries the workspace node's components,
/// then points their references at the merged hierarchy.
///
/// All components are added before any reference is rewritten, so a
/// component reference can resolve to a component that is only added later
/// in mapping order.
pub(super) fn reconcile_components(
    dom: &mut RigDom,
    mapping: &NodeMapping,
    merge_root: Ref,
    proxies: &mut ProxyRegistry,
    options: &ModularizeOptions,
    changes: &mut Vec<MergeChange>,
    warnings: &mut Vec<MergeWarning>,
) -> Result<(), DomError> {
    let targets = ensure_components(dom, mapping, options, changes)?;

    for (node, kind) in targets {
        rewrite_component(
            dom, mapping, merge_root, proxies, node, &kind, changes, warnings,
        )?;
    }

    Ok(())
}

/// Returns the `(base node, kind)` of every component that takes part in
/// the reference rewrite, in mapping order.
fn ensure_components(
    dom: &mut RigDom,
    mapping: &NodeMapping,
    options: &ModularizeOptions,
    changes: &mut Vec<MergeChange>,
) -> Result<Vec<(Ref, ComponentKind)>, DomError> {
    let mut targets = Vec::new();

    for (workspace_id, base_id) in mapping.iter() {
        let components = dom
            .get_by_ref(workspace_id)
            .ok_or(DomError::NotFound { id: workspace_id })?
            .components()
            .to_vec();

        let base = dom
            .get_by_ref_mut(base_id)
            .ok_or(DomError::NotFound { id: base_id })?;

        for component in components {
            if options.is_excluded(&component.kind) {
                log::trace!("Skipping excluded {} on {}", component.kind, workspace_id);
                continue;
            }

            let kind = component.kind.clone();

            if !base.has_component(&kind) {
                log::debug!("Adding {} to {}", kind, base_id);
                base.add_component(component)?;
                changes.push(MergeChange::ComponentAdded {
                    node: base_id,
                    kind: kind.clone(),
                });
            }

            targets.push((base_id, kind));
        }
    }

    Ok(targets)
}

#[allow(clippy::too_many_arguments)]
fn rewrite_component(
    dom: &mut RigDom,
    mapping: &NodeMapping,
    merge_root: Ref,
    proxies: &mut ProxyRegistry,
    node: Ref,
    kind: &ComponentKind,
    changes: &mut Vec<MergeChange>,
    warnings: &mut Vec<MergeWarning>,
) -> Result<(), DomError> {
    let references = match dom.get_by_ref(node).and_then(|n| n.component(kind)) {
        Some(component) => component.references(),
        None => return Ok(()),
    };

    let mut rewrites = Vec::new();

    for (slot, reference) in references.into_iter().enumerate() {
        let reference = match reference {
            Some(reference) => reference,
            None => continue,
        };

        match resolve(dom, mapping, merge_root, proxies, &reference, changes)? {
            Resolution::Keep => {}
            Resolution::Replace(to) => {
                if to != reference {
                    log::trace!("{} on {}: slot {} {:?} -> {:?}", kind, node, slot, reference, to);
                    rewrites.push((slot, Some(to.clone())));
                    changes.push(MergeChange::ReferenceRewritten {
                        node,
                        kind: kind.clone(),
                        slot,
                        from: reference,
                        to,
                    });
                }
            }
            Resolution::Clear {
                target,
                target_kind,
            } => {
                let warning = MergeWarning::DanglingComponentReference {
                    node,
                    kind: kind.clone(),
                    target,
                    target_kind,
                };
                log::warn!("{}", warning);

                rewrites.push((slot, None));
                changes.push(MergeChange::ReferenceCleared {
                    node,
                    kind: kind.clone(),
                    slot,
                    from: reference,
                });
                warnings.push(warning);
            }
        }
    }

    if rewrites.is_empty() {
        return Ok(());
    }

    let component = dom
        .get_by_ref_mut(node)
        .and_then(|n| n.component_mut(kind))
        .ok_or(DomError::NotFound { id: node })?;

    for (slot, value) in rewrites {
        if let Err(err) = component.rewrite_reference(slot, value) {
            log::error!("Could not rewrite slot {} of {} on {}: {}", slot, kind, node, err);
        }
    }

    Ok(())
}

fn resolve(
    dom: &mut RigDom,
    mapping: &NodeMapping,
    merge_root: Ref,
    proxies: &mut ProxyRegistry,
    reference: &ObjectRef,
    changes: &mut Vec<MergeChange>,
) -> Result<Resolution, DomError> {
    let resolution = match reference {
        ObjectRef::Object { node } => match mapping.get(*node) {
            Some(mapped) => Resolution::Replace(ObjectRef::object(mapped)),
            None => Resolution::Keep,
        },

        ObjectRef::Node { node } => match mapping.get(*node) {
            Some(mapped) if dom.is_descendant_of(mapped, merge_root) => {
                Resolution::Replace(ObjectRef::node(mapped))
            }
            Some(mapped) => {
                let proxy = proxies.get_or_create(dom, mapped, merge_root, changes)?;
                Resolution::Replace(ObjectRef::node(proxy))
            }
            None => Resolution::Keep,
        },

        ObjectRef::Component { node, kind } => match mapping.get(*node) {
            Some(mapped) => {
                let has_kind = dom
                    .get_by_ref(mapped)
                    .map(|n| n.has_component(kind))
                    .unwrap_or(false);

                if has_kind {
                    Resolution::Replace(ObjectRef::component(mapped, kind.clone()))
                } else {
                    Resolution::Clear {
                        target: mapped,
                        target_kind: kind.clone(),
                    }
                }
            }
            None => Resolution::Keep,
        },

        ObjectRef::Asset { .. } => Resolution::Keep,
    };

    if let Resolution::Keep = resolution {
        log::trace!("Leaving {:?} untouched", reference);
    }

    Ok(resolution)
}
