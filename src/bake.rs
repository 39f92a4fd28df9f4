//! Flattens a chain of override controllers into one concrete controller.
//!
//! Only the part of the base graph that leads to an overridden clip is
//! copied. Everything else stays shared with the base controller.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rig_dom::{Asset, AssetError, AssetId, Assets, References};
use thiserror::Error;

use crate::{error::MergeWarning, multimap::MultiMap};

#[derive(Debug, Error, PartialEq)]
pub enum BakeError {
    #[error("{id} does not exist")]
    MissingAsset { id: AssetId },

    #[error("{id} is not an override controller")]
    NotAnOverrideController { id: AssetId },

    #[error("the override chain reaches {id}, which is neither a controller nor an override controller")]
    BrokenChain { id: AssetId },

    #[error("the override chain loops back to {id}")]
    CyclicChain { id: AssetId },

    #[error(transparent)]
    Asset {
        #[from]
        source: AssetError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BakeOutput {
    /// The baked controller, or the base controller when there was nothing
    /// to override.
    pub controller: AssetId,

    /// Every asset the bake created, the baked controller first.
    pub created: Vec<AssetId>,

    pub warnings: Vec<MergeWarning>,
}

#[derive(Debug)]
pub struct OverrideBaker {
    name: String,
    controller: AssetId,

    /// Original clip -> replacement, merged over the whole chain.
    clip_overrides: BTreeMap<AssetId, AssetId>,
    created: Vec<AssetId>,
}

impl OverrideBaker {
    /// Walks the chain starting at `override_controller` until it reaches a
    /// concrete controller. Overrides closer to `override_controller` take
    /// precedence over the ones they wrap, and empty replacements are
    /// ignored.
    pub fn new(assets: &Assets, override_controller: AssetId) -> Result<Self, BakeError> {
        let entry = assets.get(override_controller).ok_or(BakeError::MissingAsset {
            id: override_controller,
        })?;

        if entry.asset.as_override_controller().is_none() {
            return Err(BakeError::NotAnOverrideController {
                id: override_controller,
            });
        }

        let name = entry.name.clone();
        let mut clip_overrides = BTreeMap::new();
        let mut visited = HashSet::new();
        let mut current = override_controller;

        let controller = loop {
            if !visited.insert(current) {
                return Err(BakeError::CyclicChain { id: current });
            }

            let entry = assets
                .get(current)
                .ok_or(BakeError::MissingAsset { id: current })?;

            match &entry.asset {
                Asset::OverrideController(table) => {
                    for entry in &table.overrides {
                        if let Some(replacement) = entry.replacement {
                            clip_overrides.entry(entry.original).or_insert(replacement);
                        }
                    }
                    current = table.base;
                }
                Asset::Controller(_) => break current,
                _ => return Err(BakeError::BrokenChain { id: current }),
            }
        };

        log::debug!(
            "{:?} overrides {} clips of {}",
            name,
            clip_overrides.len(),
            controller
        );

        Ok(OverrideBaker {
            name,
            controller,
            clip_overrides,
            created: Vec::new(),
        })
    }

    /// The concrete controller at the end of the chain.
    pub fn base_controller(&self) -> AssetId {
        self.controller
    }

    pub fn clip_overrides(&self) -> &BTreeMap<AssetId, AssetId> {
        &self.clip_overrides
    }

    pub fn bake(&mut self, assets: &mut Assets) -> Result<BakeOutput, BakeError> {
        if self.clip_overrides.is_empty() {
            return Ok(BakeOutput {
                controller: self.controller,
                created: Vec::new(),
                warnings: Vec::new(),
            });
        }

        let mut needs_cloning = self.mark(assets);
        let mut remap = self.clip_overrides.clone();
        let mut warnings = Vec::new();
        let mut created = Vec::new();

        let baked = assets.duplicate(self.controller)?;
        if let Some(entry) = assets.get_mut(baked) {
            entry.name = self.name.clone();
        }
        created.push(baked);

        let mut pending = vec![baked];

        while let Some(id) = pending.pop() {
            let references = match assets.get(id) {
                Some(entry) => entry.asset.asset_references(),
                None => continue,
            };

            for reference in references {
                if remap.contains_key(&reference) || !needs_cloning.contains(&reference) {
                    continue;
                }

                match assets.duplicate(reference) {
                    Ok(clone) => {
                        log::trace!("Cloned {} as {}", reference, clone);
                        remap.insert(reference, clone);
                        created.push(clone);
                        pending.push(clone);
                    }
                    Err(err) => {
                        let warning = MergeWarning::CloneFailed {
                            asset: reference,
                            name: assets.name(reference).unwrap_or_default().to_owned(),
                            parent: id,
                            reason: err.to_string(),
                        };
                        log::error!("{}", warning);

                        needs_cloning.remove(&reference);
                        warnings.push(warning);
                    }
                }
            }

            if let Some(entry) = assets.get_mut(id) {
                entry.asset.remap_assets(&|asset| remap.get(&asset).copied());
            }
        }

        log::info!(
            "Baked {:?} as {}, creating {} assets",
            self.name,
            baked,
            created.len()
        );

        self.created = created.clone();

        Ok(BakeOutput {
            controller: baked,
            created,
            warnings,
        })
    }

    /// Assets that should be stored alongside the baked controller: the
    /// copies made by the last bake and the replacement clips.
    pub fn sub_assets(&self) -> Vec<AssetId> {
        let mut seen = BTreeSet::new();

        self.created
            .iter()
            .skip(1)
            .chain(self.clip_overrides.values())
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Finds every asset that (transitively) references an overridden clip.
    /// The base controller itself is always copied and is not included.
    fn mark(&self, assets: &Assets) -> BTreeSet<AssetId> {
        let mut parents: MultiMap<AssetId, AssetId> = MultiMap::new();
        let mut needs_cloning = BTreeSet::new();
        let mut walked = HashSet::new();
        let mut pending = vec![self.controller];
        walked.insert(self.controller);

        while let Some(id) = pending.pop() {
            let references = match assets.get(id) {
                Some(entry) => entry.asset.asset_references(),
                None => continue,
            };

            for reference in references {
                if needs_cloning.contains(&reference) || self.clip_overrides.contains_key(&reference) {
                    let mut stack = vec![id];

                    while let Some(parent) = stack.pop() {
                        if parent == self.controller || !needs_cloning.insert(parent) {
                            continue;
                        }
                        stack.extend(parents.get(&parent));
                    }
                }

                parents.insert(reference, id);

                if walked.insert(reference) {
                    pending.push(reference);
                }
            }
        }

        log::trace!("Assets to clone: {:?}", needs_cloning);
        needs_cloning
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use rig_dom::{
        AnimationClip, BlendTree, BlendType, ChildMotion, ControllerGraph, ExternalAsset, Layer,
        ObjectRef, OverrideController, State, StateMachine,
    };

    struct Graph {
        assets: Assets,
        controller: AssetId,
        top: AssetId,
        nested: AssetId,
        tree: AssetId,
        untouched: AssetId,
        run: AssetId,
        idle: AssetId,
    }

    /// controller -> top machine -> { nested machine -> blend tree -> run,
    /// untouched machine -> idle }
    fn graph() -> Graph {
        let mut assets = Assets::new();
        let run = assets.insert("Run", Asset::Clip(AnimationClip::default()));
        let idle = assets.insert("Idle", Asset::Clip(AnimationClip::default()));

        let tree = assets.insert(
            "Tree",
            Asset::BlendTree(BlendTree {
                blend_type: BlendType::Simple1D,
                blend_parameter: "Speed".to_owned(),
                blend_parameter_y: String::new(),
                children: vec![ChildMotion::new(Some(run)), ChildMotion::new(Some(idle))],
            }),
        );
        let nested = assets.insert(
            "Nested",
            Asset::StateMachine(StateMachine {
                states: vec![State::new("Move", Some(tree))],
                ..StateMachine::default()
            }),
        );
        let untouched = assets.insert(
            "Untouched",
            Asset::StateMachine(StateMachine {
                states: vec![State::new("Idle", Some(idle))],
                ..StateMachine::default()
            }),
        );
        let top = assets.insert(
            "Top",
            Asset::StateMachine(StateMachine {
                state_machines: vec![nested, untouched],
                ..StateMachine::default()
            }),
        );
        let controller = assets.insert(
            "FX",
            Asset::Controller(ControllerGraph {
                layers: vec![Layer::new("Base", top)],
                parameters: vec![],
            }),
        );

        Graph {
            assets,
            controller,
            top,
            nested,
            tree,
            untouched,
            run,
            idle,
        }
    }

    fn override_of(assets: &mut Assets, name: &str, base: AssetId, pairs: &[(AssetId, AssetId)]) -> AssetId {
        let mut table = OverrideController::new(base);
        for &(original, replacement) in pairs {
            table.set(original, replacement);
        }
        assets.insert(name, Asset::OverrideController(table))
    }

    fn machine(assets: &Assets, id: AssetId) -> &StateMachine {
        assets.get(id).unwrap().asset.as_state_machine().unwrap()
    }

    #[test]
    fn no_overrides_returns_the_base_controller() {
        let mut g = graph();
        let table = override_of(&mut g.assets, "FX Override", g.controller, &[]);
        let count = g.assets.len();

        let mut baker = OverrideBaker::new(&g.assets, table).unwrap();
        let output = baker.bake(&mut g.assets).unwrap();

        assert_eq!(output.controller, g.controller);
        assert!(output.created.is_empty());
        assert_eq!(g.assets.len(), count);
    }

    #[test]
    fn only_the_path_to_an_overridden_clip_is_cloned() {
        let mut g = graph();
        let run_modified = g.assets.insert("Run Modified", Asset::Clip(AnimationClip::default()));
        let table = override_of(&mut g.assets, "FX Override", g.controller, &[(g.run, run_modified)]);
        let before = g.assets.clone();

        let mut baker = OverrideBaker::new(&g.assets, table).unwrap();
        let output = baker.bake(&mut g.assets).unwrap();

        // Controller, top, nested and tree.
        assert_eq!(output.created.len(), 4);
        assert!(output.warnings.is_empty());
        assert_eq!(output.controller, output.created[0]);

        let baked = g.assets.get(output.controller).unwrap();
        assert_eq!(baked.name, "FX Override");
        let top = baked.asset.as_controller().unwrap().layers[0].state_machine;
        assert_ne!(top, g.top);
        assert_eq!(g.assets.name(top), Some("Top"));

        let children = &machine(&g.assets, top).state_machines;
        assert_ne!(children[0], g.nested);
        assert_eq!(children[1], g.untouched);

        let motion = machine(&g.assets, children[0]).states[0].motion.unwrap();
        assert_ne!(motion, g.tree);
        let tree = g.assets.get(motion).unwrap().asset.as_blend_tree().unwrap();
        assert_eq!(tree.children[0].motion, Some(run_modified));
        assert_eq!(tree.children[1].motion, Some(g.idle));

        // None of the original assets changed.
        for entry in before.iter() {
            assert_eq!(g.assets.get(entry.id), Some(entry));
        }

        let sub_assets = baker.sub_assets();
        assert_eq!(sub_assets.len(), 4);
        assert!(sub_assets.contains(&run_modified));
        assert!(!sub_assets.contains(&output.controller));
    }

    #[test]
    fn shared_subgraphs_are_cloned_once() {
        let mut g = graph();
        let second = g.assets.insert(
            "Second",
            Asset::StateMachine(StateMachine {
                states: vec![State::new("Move", Some(g.tree))],
                ..StateMachine::default()
            }),
        );
        if let Asset::Controller(graph) = &mut g.assets.get_mut(g.controller).unwrap().asset {
            graph.layers.push(Layer::new("Second", second));
        }

        let run_modified = g.assets.insert("Run Modified", Asset::Clip(AnimationClip::default()));
        let table = override_of(&mut g.assets, "FX Override", g.controller, &[(g.run, run_modified)]);

        let mut baker = OverrideBaker::new(&g.assets, table).unwrap();
        let output = baker.bake(&mut g.assets).unwrap();

        // Controller, top, nested, second and a single tree.
        assert_eq!(output.created.len(), 5);

        let layers = &g.assets.get(output.controller).unwrap().asset.as_controller().unwrap().layers;
        let top = layers[0].state_machine;
        let nested = machine(&g.assets, top).state_machines[0];
        let from_nested = machine(&g.assets, nested).states[0].motion.unwrap();
        let from_second = machine(&g.assets, layers[1].state_machine).states[0].motion.unwrap();

        assert_ne!(layers[1].state_machine, second);
        assert_ne!(from_nested, g.tree);
        assert_eq!(from_nested, from_second);

        let tree = g.assets.get(from_nested).unwrap().asset.as_blend_tree().unwrap();
        assert_eq!(tree.children[0].motion, Some(run_modified));
        assert_eq!(machine(&g.assets, second).states[0].motion, Some(g.tree));
    }

    #[test]
    fn outer_overrides_win() {
        let mut g = graph();
        let inner_run = g.assets.insert("Inner Run", Asset::Clip(AnimationClip::default()));
        let outer_run = g.assets.insert("Outer Run", Asset::Clip(AnimationClip::default()));
        let inner_idle = g.assets.insert("Inner Idle", Asset::Clip(AnimationClip::default()));

        let inner = override_of(
            &mut g.assets,
            "Inner",
            g.controller,
            &[(g.run, inner_run), (g.idle, inner_idle)],
        );
        let mut outer_table = OverrideController::new(inner);
        outer_table.set(g.run, outer_run);
        outer_table.overrides.push(rig_dom::ClipOverride {
            original: g.idle,
            replacement: None,
        });
        let outer = g.assets.insert("Outer", Asset::OverrideController(outer_table));

        let baker = OverrideBaker::new(&g.assets, outer).unwrap();
        assert_eq!(baker.base_controller(), g.controller);
        assert_eq!(baker.clip_overrides().get(&g.run), Some(&outer_run));
        assert_eq!(baker.clip_overrides().get(&g.idle), Some(&inner_idle));
    }

    #[test]
    fn broken_chains_are_errors() {
        let mut g = graph();

        let not_override = OverrideBaker::new(&g.assets, g.controller);
        assert_eq!(
            not_override.err(),
            Some(BakeError::NotAnOverrideController { id: g.controller })
        );

        let to_clip = override_of(&mut g.assets, "To Clip", g.run, &[]);
        assert_eq!(
            OverrideBaker::new(&g.assets, to_clip).err(),
            Some(BakeError::BrokenChain { id: g.run })
        );

        let first = override_of(&mut g.assets, "First", g.controller, &[]);
        let second = override_of(&mut g.assets, "Second", first, &[]);
        g.assets
            .get_mut(first)
            .unwrap()
            .asset
            .as_override_controller_mut()
            .unwrap()
            .base = second;
        assert_eq!(
            OverrideBaker::new(&g.assets, second).err(),
            Some(BakeError::CyclicChain { id: second })
        );
    }

    #[test]
    fn failed_clones_keep_the_original_reference() {
        let mut g = graph();
        let run_modified = g.assets.insert("Run Modified", Asset::Clip(AnimationClip::default()));

        // An asset owned outside the store that points at the overridden clip.
        let external = g.assets.insert(
            "Retargeter",
            Asset::External(ExternalAsset {
                type_name: "Retargeter".to_owned(),
                references: vec![Some(ObjectRef::asset(g.run))],
            }),
        );
        if let Asset::StateMachine(machine) = &mut g.assets.get_mut(g.untouched).unwrap().asset {
            machine.states.push(State::new("Retarget", Some(external)));
        }

        let table = override_of(&mut g.assets, "FX Override", g.controller, &[(g.run, run_modified)]);
        let mut baker = OverrideBaker::new(&g.assets, table).unwrap();
        let output = baker.bake(&mut g.assets).unwrap();

        assert_eq!(output.warnings.len(), 1);
        assert!(matches!(
            &output.warnings[0],
            MergeWarning::CloneFailed { asset, name, .. } if *asset == external && name == "Retargeter"
        ));

        let baked = g.assets.get(output.controller).unwrap();
        let top = baked.asset.as_controller().unwrap().layers[0].state_machine;
        let untouched_clone = machine(&g.assets, top).state_machines[1];
        assert_ne!(untouched_clone, g.untouched);
        assert_eq!(
            machine(&g.assets, untouched_clone).states[1].motion,
            Some(external)
        );
    }
}
