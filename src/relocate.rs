//! Moves the animation of extracted controllers to the merge root's
//! coordinate space, copying clips on write.
//!
//! Clips belong to the user's workspace and are shared with the controllers
//! that are still installed on it, so they are never edited in place. The
//! first clip of a controller that needs a change is duplicated, and the
//! controller gets an override controller that swaps the original clip for
//! the copy.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rig_dom::{Asset, AssetError, AssetId, Assets, CurveBinding, OverrideController, References};

use crate::{hierarchy::PathMapping, multimap::MultiMap};

#[derive(Debug, Default)]
pub struct AnimationRelocator {
    /// Registered controller -> its override controller, once one exists.
    controller_overrides: BTreeMap<AssetId, Option<AssetId>>,

    /// Clip -> every registered controller that plays it.
    dependencies: MultiMap<AssetId, AssetId>,

    cloned_clips: BTreeMap<AssetId, AssetId>,
    clone_set: BTreeSet<AssetId>,
}

impl AnimationRelocator {
    pub fn new() -> Self {
        AnimationRelocator::default()
    }

    /// Registers a controller and records it as a dependent of every clip it
    /// can reach. Registering a controller twice does nothing.
    pub fn add_controller(&mut self, assets: &Assets, controller: AssetId) {
        if self.controller_overrides.contains_key(&controller) {
            return;
        }

        self.controller_overrides.insert(controller, None);

        for clip in clips_of(assets, controller) {
            self.dependencies.insert(clip, controller);
        }
    }

    /// The override controller standing in for `controller`, or `controller`
    /// itself when none of its clips changed.
    pub fn controller(&self, controller: AssetId) -> AssetId {
        self.controller_overrides
            .get(&controller)
            .copied()
            .flatten()
            .unwrap_or(controller)
    }

    /// The relocated copy of `clip`, or `clip` itself.
    pub fn clip(&self, clip: AssetId) -> AssetId {
        self.cloned_clips.get(&clip).copied().unwrap_or(clip)
    }

    pub fn original_clips(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.dependencies.keys().copied()
    }

    pub fn cloned_clips(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.cloned_clips.values().copied()
    }

    pub fn original_controllers(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.controller_overrides.keys().copied()
    }

    pub fn override_controllers(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.controller_overrides.values().filter_map(|id| *id)
    }

    /// Rewrites the path of every curve binding found in `paths`, in every
    /// clip of every registered controller. Returns how many clips changed.
    pub fn rewrite_binding_paths(
        &mut self,
        assets: &mut Assets,
        paths: &PathMapping,
    ) -> Result<usize, AssetError> {
        if paths.is_empty() {
            return Ok(0);
        }

        let clips: Vec<AssetId> = self.original_clips().collect();
        let mut changed = 0;

        for clip in clips {
            let current = self.clip(clip);
            let source = match assets.get(current).and_then(|entry| entry.asset.as_clip()) {
                Some(source) => source,
                None => continue,
            };

            let curve_changes: Vec<_> = staged_changes(source.curve_bindings(), paths)
                .into_iter()
                .flat_map(|(old, new)| {
                    let data = source.curve(&old).cloned();
                    [(old, None), (new, data)]
                })
                .collect();

            let object_changes: Vec<_> = staged_changes(source.object_curve_bindings(), paths)
                .into_iter()
                .flat_map(|(old, new)| {
                    let data = source.object_curve(&old).cloned();
                    [(old, None), (new, data)]
                })
                .collect();

            if curve_changes.is_empty() && object_changes.is_empty() {
                continue;
            }

            log::debug!(
                "Relocating {} curves and {} object curves of {}",
                curve_changes.len() / 2,
                object_changes.len() / 2,
                clip
            );

            let clone = self.get_clone(assets, clip)?;
            let target = assets
                .get_mut(clone)
                .and_then(|entry| entry.asset.as_clip_mut())
                .ok_or(AssetError::NotFound { id: clone })?;

            target.set_curves(curve_changes);
            target.set_object_curves(object_changes);
            changed += 1;
        }

        Ok(changed)
    }

    /// Returns the copy of `clip` that may be edited, creating it on first
    /// use. Every registered controller that plays the clip gets an override
    /// controller mapping the original to the copy. A copy is its own copy.
    pub fn get_clone(&mut self, assets: &mut Assets, clip: AssetId) -> Result<AssetId, AssetError> {
        if self.clone_set.contains(&clip) {
            return Ok(clip);
        }

        if let Some(clone) = self.cloned_clips.get(&clip) {
            return Ok(*clone);
        }

        let clone = assets.duplicate(clip)?;
        let name = format!("{} Modified", assets.name(clip).unwrap_or_default());
        if let Some(entry) = assets.get_mut(clone) {
            entry.name = name;
        }

        self.cloned_clips.insert(clip, clone);
        self.clone_set.insert(clone);

        for &controller in self.dependencies.get(&clip) {
            let existing = self.controller_overrides.get(&controller).copied().flatten();

            let override_id = match existing {
                Some(existing) => existing,
                None => {
                    let name = format!("{} Override", assets.name(controller).unwrap_or_default());
                    let id = assets.insert(name, Asset::OverrideController(OverrideController::new(controller)));
                    log::debug!("Created override controller {} for {}", id, controller);

                    self.controller_overrides.insert(controller, Some(id));
                    id
                }
            };

            if let Some(table) = assets
                .get_mut(override_id)
                .and_then(|entry| entry.asset.as_override_controller_mut())
            {
                table.set(clip, clone);
            }
        }

        Ok(clone)
    }
}

/// Pairs of (current binding, relocated binding) for every binding whose
/// path is remapped.
fn staged_changes<'a>(
    bindings: impl Iterator<Item = &'a CurveBinding>,
    paths: &PathMapping,
) -> Vec<(CurveBinding, CurveBinding)> {
    bindings
        .filter_map(|binding| {
            let path = paths.get(&binding.path)?;
            log::trace!("{:?} -> {:?}", binding.path, path);
            Some((binding.clone(), binding.with_path(path)))
        })
        .collect()
}

/// Every clip reachable from `controller` through asset references, in
/// discovery order.
pub fn clips_of(assets: &Assets, controller: AssetId) -> Vec<AssetId> {
    let mut clips = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![controller];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }

        let entry = match assets.get(id) {
            Some(entry) => entry,
            None => continue,
        };

        if let Asset::Clip(_) = entry.asset {
            clips.push(id);
            continue;
        }

        let mut children = entry.asset.asset_references();
        children.reverse();
        stack.extend(children);
    }

    clips
}

#[cfg(test)]
mod test {
    use super::*;

    use rig_dom::{
        AnimationClip, BoundCurve, ControllerGraph, Curve, ExternalAsset, Keyframe, Layer,
        ObjectKeyframe, State, StateMachine,
    };

    fn curve(value: f32) -> Curve {
        Curve {
            keys: vec![Keyframe {
                time: 0.0,
                value,
                in_tangent: 0.0,
                out_tangent: 0.0,
            }],
        }
    }

    fn clip(bindings: &[(&str, f32)]) -> AnimationClip {
        AnimationClip {
            curves: bindings
                .iter()
                .map(|(path, value)| BoundCurve {
                    binding: CurveBinding::new(*path, "Transform", "localPosition.y"),
                    curve: curve(*value),
                })
                .collect(),
            ..AnimationClip::default()
        }
    }

    /// A controller with one layer playing each of `clips` in its own state.
    fn controller(assets: &mut Assets, name: &str, clips: &[AssetId]) -> AssetId {
        let machine = assets.insert(
            format!("{} Machine", name),
            Asset::StateMachine(StateMachine {
                states: clips
                    .iter()
                    .map(|clip| State::new("State", Some(*clip)))
                    .collect(),
                ..StateMachine::default()
            }),
        );

        assets.insert(
            name,
            Asset::Controller(ControllerGraph {
                layers: vec![Layer::new("Layer", machine)],
                parameters: vec![],
            }),
        )
    }

    fn hand_mapping() -> PathMapping {
        [("Arm/Hand", "Hand")].into_iter().collect()
    }

    #[test]
    fn mapped_clip_is_cloned_with_only_that_path_changed() {
        let mut assets = Assets::new();
        let original = clip(&[("Arm/Hand", 1.0), ("Arm", 2.0)]);
        let wave = assets.insert("Wave", Asset::Clip(original.clone()));
        let fx = controller(&mut assets, "FX Diff", &[wave]);

        let mut relocator = AnimationRelocator::new();
        relocator.add_controller(&assets, fx);
        let changed = relocator
            .rewrite_binding_paths(&mut assets, &hand_mapping())
            .unwrap();
        assert_eq!(changed, 1);

        // The original is untouched.
        assert_eq!(assets.get(wave).unwrap().asset.as_clip(), Some(&original));

        let clone = relocator.clip(wave);
        assert_ne!(clone, wave);
        let entry = assets.get(clone).unwrap();
        assert_eq!(entry.name, "Wave Modified");

        let cloned = entry.asset.as_clip().unwrap();
        let binding = CurveBinding::new("Arm/Hand", "Transform", "localPosition.y");
        assert_eq!(cloned.curve(&binding), None);
        assert_eq!(cloned.curve(&binding.with_path("Hand")), Some(&curve(1.0)));
        assert_eq!(cloned.curve(&binding.with_path("Arm")), Some(&curve(2.0)));
        assert_eq!(cloned.curves.len(), 2);

        let override_id = relocator.controller(fx);
        let entry = assets.get(override_id).unwrap();
        assert_eq!(entry.name, "FX Diff Override");
        let table = entry.asset.as_override_controller().unwrap();
        assert_eq!(table.base, fx);
        assert_eq!(table.get(wave), Some(clone));
    }

    #[test]
    fn unmapped_clips_are_never_cloned() {
        let mut assets = Assets::new();
        let idle = assets.insert("Idle", Asset::Clip(clip(&[("Arm", 1.0)])));
        let fx = controller(&mut assets, "FX", &[idle]);
        let count = assets.len();

        let mut relocator = AnimationRelocator::new();
        relocator.add_controller(&assets, fx);
        relocator
            .rewrite_binding_paths(&mut assets, &hand_mapping())
            .unwrap();

        assert_eq!(assets.len(), count);
        assert_eq!(relocator.clip(idle), idle);
        assert_eq!(relocator.controller(fx), fx);
        assert_eq!(relocator.cloned_clips().count(), 0);
        assert_eq!(relocator.override_controllers().count(), 0);
        assert_eq!(relocator.original_clips().collect::<Vec<_>>(), [idle]);
    }

    #[test]
    fn object_curves_are_relocated_too() {
        let mut assets = Assets::new();
        let material = assets.insert(
            "Material",
            Asset::External(ExternalAsset {
                type_name: "Material".to_owned(),
                references: vec![],
            }),
        );
        let binding = CurveBinding::new("Arm/Hand", "Renderer", "material");
        let keys = vec![ObjectKeyframe {
            time: 0.0,
            value: Some(material.into()),
        }];
        let swap = assets.insert(
            "Swap",
            Asset::Clip(AnimationClip {
                object_curves: vec![BoundCurve {
                    binding: binding.clone(),
                    curve: keys.clone(),
                }],
                ..AnimationClip::default()
            }),
        );
        let fx = controller(&mut assets, "FX", &[swap]);

        let mut relocator = AnimationRelocator::new();
        relocator.add_controller(&assets, fx);
        relocator
            .rewrite_binding_paths(&mut assets, &hand_mapping())
            .unwrap();

        let cloned = assets.get(relocator.clip(swap)).unwrap().asset.as_clip().unwrap();
        assert_eq!(cloned.object_curve(&binding), None);
        assert_eq!(cloned.object_curve(&binding.with_path("Hand")), Some(&keys));
    }

    #[test]
    fn shared_clip_gets_one_clone_and_an_override_per_controller() {
        let mut assets = Assets::new();
        let wave = assets.insert("Wave", Asset::Clip(clip(&[("Arm/Hand", 1.0)])));
        let other = assets.insert("Other", Asset::Clip(clip(&[("Arm/Hand", 3.0)])));
        let fx = controller(&mut assets, "FX", &[wave, other]);
        let gesture = controller(&mut assets, "Gesture", &[wave]);

        let mut relocator = AnimationRelocator::new();
        relocator.add_controller(&assets, fx);
        relocator.add_controller(&assets, gesture);
        relocator.add_controller(&assets, fx);

        let changed = relocator
            .rewrite_binding_paths(&mut assets, &hand_mapping())
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(relocator.cloned_clips().count(), 2);
        assert_eq!(relocator.override_controllers().count(), 2);

        let fx_table = assets
            .get(relocator.controller(fx))
            .unwrap()
            .asset
            .as_override_controller()
            .unwrap();
        assert_eq!(fx_table.overrides.len(), 2);
        assert_eq!(fx_table.get(wave), Some(relocator.clip(wave)));
        assert_eq!(fx_table.get(other), Some(relocator.clip(other)));

        let gesture_table = assets
            .get(relocator.controller(gesture))
            .unwrap()
            .asset
            .as_override_controller()
            .unwrap();
        assert_eq!(gesture_table.overrides.len(), 1);
    }

    #[test]
    fn cloning_a_clone_returns_it() {
        let mut assets = Assets::new();
        let wave = assets.insert("Wave", Asset::Clip(clip(&[])));
        let mut relocator = AnimationRelocator::new();

        let clone = relocator.get_clone(&mut assets, wave).unwrap();
        assert_eq!(relocator.get_clone(&mut assets, clone).unwrap(), clone);
        assert_eq!(relocator.get_clone(&mut assets, wave).unwrap(), clone);
        assert_eq!(assets.len(), 2);
    }
}
