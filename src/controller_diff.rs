//! Extracts the layers a workspace controller adds on top of its base, along
//! with exactly the parameters those layers use.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rig_dom::{Asset, AssetId, Assets, BlendType, ControllerGraph, Layer};
use thiserror::Error;

use crate::{descriptor::LayerType, error::MergeWarning};

#[derive(Debug, Error, PartialEq)]
pub enum ControllerDiffError {
    #[error("{asset} is not a controller")]
    NotAController { asset: AssetId },

    #[error("{asset} does not exist")]
    MissingAsset { asset: AssetId },
}

/// Diffs every workspace layer slot against the base slot of the same type.
///
/// Slots that add nothing are left out of the result. Slots whose workspace
/// asset can't be diffed are skipped and reported in `warnings`.
pub fn diff_controllers(
    assets: &mut Assets,
    workspace_layers: &BTreeMap<LayerType, AssetId>,
    base_layers: &BTreeMap<LayerType, AssetId>,
    warnings: &mut Vec<MergeWarning>,
) -> BTreeMap<LayerType, AssetId> {
    let mut diffs = BTreeMap::new();

    for (&layer_type, &workspace) in workspace_layers {
        let base = base_layers.get(&layer_type).copied();

        match diff_controller(assets, workspace, base) {
            Ok(Some(diff)) => {
                log::debug!("{} layer: extracted {}", layer_type.as_str(), diff);
                diffs.insert(layer_type, diff);
            }
            Ok(None) => {
                log::debug!("{} layer: nothing added", layer_type.as_str());
            }
            Err(ControllerDiffError::NotAController { asset }) => {
                let warning = MergeWarning::NotAController { layer_type, asset };
                log::warn!("{}", warning);
                warnings.push(warning);
            }
            Err(ControllerDiffError::MissingAsset { asset }) => {
                let warning = MergeWarning::MissingAsset { asset };
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    diffs
}

/// Creates a controller holding the workspace layers whose names don't
/// appear in `base`, plus the workspace parameters they use. Returns `None`
/// when no layer was added.
///
/// The new controller shares state machines and motions with the workspace
/// controller. A missing base, or a base that isn't a plain controller,
/// contributes no layers.
pub fn diff_controller(
    assets: &mut Assets,
    workspace: AssetId,
    base: Option<AssetId>,
) -> Result<Option<AssetId>, ControllerDiffError> {
    let entry = assets
        .get(workspace)
        .ok_or(ControllerDiffError::MissingAsset { asset: workspace })?;
    let workspace_name = entry.name.clone();
    let workspace_graph = entry
        .asset
        .as_controller()
        .ok_or(ControllerDiffError::NotAController { asset: workspace })?;

    let base_names: HashSet<&str> = base
        .and_then(|base| assets.get(base))
        .and_then(|entry| entry.asset.as_controller())
        .map(|graph| graph.layers.iter().map(|layer| layer.name.as_str()).collect())
        .unwrap_or_default();

    let layers: Vec<Layer> = workspace_graph
        .layers
        .iter()
        .filter(|layer| !base_names.contains(layer.name.as_str()))
        .cloned()
        .collect();

    if layers.is_empty() {
        return Ok(None);
    }

    let used = used_parameters(assets, &layers);
    let parameters = workspace_graph
        .parameters
        .iter()
        .filter(|parameter| used.contains(&parameter.name))
        .cloned()
        .collect();

    log::trace!(
        "{:?}: kept {} of {} layers, parameters {:?}",
        workspace_name,
        layers.len(),
        workspace_graph.layers.len(),
        used
    );

    let diff = assets.insert(
        format!("{} Diff", workspace_name),
        Asset::Controller(ControllerGraph { layers, parameters }),
    );

    Ok(Some(diff))
}

/// Names of every parameter the given layers read, found by walking their
/// state machines, sub-state machines, and blend trees.
pub fn used_parameters(assets: &Assets, layers: &[Layer]) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    let mut add = |name: &str| {
        if !name.is_empty() {
            used.insert(name.to_owned());
        }
    };

    let mut visited = HashSet::new();
    let mut stack: Vec<AssetId> = layers.iter().rev().map(|layer| layer.state_machine).collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }

        let asset = match assets.get(id) {
            Some(entry) => &entry.asset,
            None => {
                log::trace!("{} is missing; skipping its parameters", id);
                continue;
            }
        };

        match asset {
            Asset::StateMachine(machine) => {
                let transitions = machine
                    .any_state_transitions
                    .iter()
                    .chain(&machine.entry_transitions)
                    .chain(machine.states.iter().flat_map(|state| &state.transitions));

                for transition in transitions {
                    for condition in &transition.conditions {
                        add(&condition.parameter);
                    }
                }

                for state in &machine.states {
                    state.active_parameters().for_each(&mut add);
                    stack.extend(state.motion);
                }

                stack.extend(machine.state_machines.iter().rev());
            }
            Asset::BlendTree(tree) => {
                match tree.blend_type {
                    BlendType::Simple1D => add(&tree.blend_parameter),
                    blend_type if blend_type.is_2d() => {
                        add(&tree.blend_parameter);
                        add(&tree.blend_parameter_y);
                    }
                    _ => {}
                }

                for child in &tree.children {
                    if tree.blend_type == BlendType::Direct {
                        add(&child.direct_blend_parameter);
                    }
                    stack.extend(child.motion);
                }
            }
            _ => {}
        }
    }

    used
}

#[cfg(test)]
mod test {
    use super::*;

    use maplit::btreemap;
    use rig_dom::{
        AnimationClip, AnimatorParameter, AnimatorParameterKind, BlendTree, ChildMotion,
        Condition, ConditionMode, State, StateMachine, StateParameter, Transition,
    };

    fn parameter(name: &str) -> AnimatorParameter {
        AnimatorParameter::new(name, AnimatorParameterKind::Float)
    }

    fn condition(parameter: &str) -> Transition {
        Transition {
            conditions: vec![Condition {
                mode: ConditionMode::Greater,
                parameter: parameter.to_owned(),
                threshold: 0.5,
            }],
            ..Transition::default()
        }
    }

    fn controller(assets: &mut Assets, name: &str, layers: Vec<Layer>, parameters: &[&str]) -> AssetId {
        assets.insert(
            name,
            Asset::Controller(ControllerGraph {
                layers,
                parameters: parameters.iter().map(|name| parameter(name)).collect(),
            }),
        )
    }

    fn empty_machine(assets: &mut Assets) -> AssetId {
        assets.insert("Machine", Asset::StateMachine(StateMachine::default()))
    }

    #[test]
    fn only_unmatched_layers_survive() {
        let mut assets = Assets::new();
        let machine = empty_machine(&mut assets);

        let base = controller(&mut assets, "FX", vec![Layer::new("Base", machine)], &[]);
        let workspace = controller(
            &mut assets,
            "Temp FX",
            vec![
                Layer::new("Base", machine),
                Layer::new("Hat", machine),
                Layer::new("Glasses", machine),
            ],
            &[],
        );

        let diff = diff_controller(&mut assets, workspace, Some(base)).unwrap().unwrap();
        let entry = assets.get(diff).unwrap();
        let graph = entry.asset.as_controller().unwrap();

        assert_eq!(entry.name, "Temp FX Diff");
        let names: Vec<_> = graph.layers.iter().map(|layer| layer.name.as_str()).collect();
        assert_eq!(names, ["Hat", "Glasses"]);
        assert!(graph.parameters.is_empty());
    }

    #[test]
    fn same_controller_adds_nothing() {
        let mut assets = Assets::new();
        let machine = empty_machine(&mut assets);
        let fx = controller(&mut assets, "FX", vec![Layer::new("Base", machine)], &["A"]);
        let count = assets.len();

        assert_eq!(diff_controller(&mut assets, fx, Some(fx)), Ok(None));
        assert_eq!(assets.len(), count);
    }

    #[test]
    fn missing_base_keeps_every_layer() {
        let mut assets = Assets::new();
        let machine = empty_machine(&mut assets);
        let workspace = controller(
            &mut assets,
            "FX",
            vec![Layer::new("A", machine), Layer::new("B", machine)],
            &[],
        );

        let diff = diff_controller(&mut assets, workspace, None).unwrap().unwrap();
        let graph = assets.get(diff).unwrap().asset.as_controller().unwrap();
        assert_eq!(graph.layers.len(), 2);
    }

    #[test]
    fn parameter_closure_is_exact() {
        let mut assets = Assets::new();
        let clip = assets.insert("Clip", Asset::Clip(AnimationClip::default()));

        let direct = assets.insert(
            "Direct",
            Asset::BlendTree(BlendTree {
                blend_type: BlendType::Direct,
                blend_parameter: "DirectIgnored".to_owned(),
                blend_parameter_y: String::new(),
                children: vec![ChildMotion {
                    direct_blend_parameter: "DirectWeight".to_owned(),
                    ..ChildMotion::new(Some(clip))
                }],
            }),
        );
        let planar = assets.insert(
            "Planar",
            Asset::BlendTree(BlendTree {
                blend_type: BlendType::FreeformCartesian2D,
                blend_parameter: "X".to_owned(),
                blend_parameter_y: "Y".to_owned(),
                children: vec![ChildMotion::new(Some(direct)), ChildMotion::new(None)],
            }),
        );
        let linear = assets.insert(
            "Linear",
            Asset::BlendTree(BlendTree {
                blend_type: BlendType::Simple1D,
                blend_parameter: "Blend".to_owned(),
                blend_parameter_y: "LinearIgnored".to_owned(),
                children: vec![],
            }),
        );

        let mut nested_state = State::new("Nested", Some(linear));
        nested_state.mirror_parameter = Some(StateParameter {
            parameter: "Mirror".to_owned(),
            active: true,
        });
        let nested = assets.insert(
            "Nested",
            Asset::StateMachine(StateMachine {
                states: vec![nested_state],
                entry_transitions: vec![condition("Entry")],
                ..StateMachine::default()
            }),
        );

        let mut state = State::new("Idle", Some(planar));
        state.transitions.push(condition("Go"));
        state.speed_parameter = Some(StateParameter {
            parameter: "Speed".to_owned(),
            active: true,
        });
        state.time_parameter = Some(StateParameter {
            parameter: "TimeInactive".to_owned(),
            active: false,
        });
        let top = assets.insert(
            "Top",
            Asset::StateMachine(StateMachine {
                states: vec![state],
                state_machines: vec![nested],
                any_state_transitions: vec![condition("Any"), condition("")],
                entry_transitions: vec![],
            }),
        );

        let used = used_parameters(&assets, &[Layer::new("Layer", top)]);
        let expected: BTreeSet<String> = [
            "Any", "Blend", "DirectWeight", "Entry", "Go", "Mirror", "Speed", "X", "Y",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        assert_eq!(used, expected);
    }

    #[test]
    fn diff_keeps_only_used_parameters_in_order() {
        let mut assets = Assets::new();
        let machine = assets.insert(
            "Machine",
            Asset::StateMachine(StateMachine {
                any_state_transitions: vec![condition("Jump"), condition("Crouch")],
                ..StateMachine::default()
            }),
        );
        let workspace = controller(
            &mut assets,
            "FX",
            vec![Layer::new("Added", machine)],
            &["Crouch", "Unused", "Jump"],
        );

        let diff = diff_controller(&mut assets, workspace, None).unwrap().unwrap();
        let graph = assets.get(diff).unwrap().asset.as_controller().unwrap();
        let names: Vec<_> = graph.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Crouch", "Jump"]);
    }

    #[test]
    fn non_controllers_are_skipped_with_a_warning() {
        let mut assets = Assets::new();
        let machine = empty_machine(&mut assets);
        let fx = controller(&mut assets, "FX", vec![Layer::new("Added", machine)], &[]);
        let gesture = assets.insert("Gesture", Asset::StateMachine(StateMachine::default()));

        let mut warnings = Vec::new();
        let diffs = diff_controllers(
            &mut assets,
            &btreemap! {
                LayerType::FX => fx,
                LayerType::Gesture => gesture,
            },
            &BTreeMap::new(),
            &mut warnings,
        );

        assert_eq!(diffs.keys().copied().collect::<Vec<_>>(), [LayerType::FX]);
        assert_eq!(
            warnings,
            vec![MergeWarning::NotAController {
                layer_type: LayerType::Gesture,
                asset: gesture,
            }]
        );
    }
}
