//! Controller graphs, state machines, blend trees, and clips.

use serde::{Deserialize, Serialize};

use crate::{
    component::ComponentKind,
    references::{RefSlot, References},
    types::{AssetId, ObjectRef},
};

/// A layered state machine graph with its parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerGraph {
    #[serde(default)]
    pub layers: Vec<Layer>,

    #[serde(default)]
    pub parameters: Vec<AnimatorParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub name: String,

    #[serde(default = "default_weight")]
    pub weight: f32,

    #[serde(default)]
    pub blending: LayerBlending,

    pub state_machine: AssetId,
}

fn default_weight() -> f32 {
    1.0
}

impl Layer {
    pub fn new(name: impl Into<String>, state_machine: AssetId) -> Self {
        Layer {
            name: name.into(),
            weight: 1.0,
            blending: LayerBlending::Override,
            state_machine,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerBlending {
    #[default]
    Override,
    Additive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimatorParameter {
    pub name: String,
    pub kind: AnimatorParameterKind,

    #[serde(default)]
    pub default_value: f32,
}

impl AnimatorParameter {
    pub fn new(name: impl Into<String>, kind: AnimatorParameterKind) -> Self {
        AnimatorParameter {
            name: name.into(),
            kind,
            default_value: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimatorParameterKind {
    Float,
    Int,
    Bool,
    Trigger,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachine {
    #[serde(default)]
    pub states: Vec<State>,

    /// Nested state machines, walked like the top level one.
    #[serde(default)]
    pub state_machines: Vec<AssetId>,

    #[serde(default)]
    pub any_state_transitions: Vec<Transition>,

    #[serde(default)]
    pub entry_transitions: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub name: String,

    /// Either a clip or a blend tree.
    #[serde(default)]
    pub motion: Option<AssetId>,

    #[serde(default)]
    pub transitions: Vec<Transition>,

    #[serde(default = "default_weight")]
    pub speed: f32,

    #[serde(default)]
    pub speed_parameter: Option<StateParameter>,

    #[serde(default)]
    pub time_parameter: Option<StateParameter>,

    #[serde(default)]
    pub cycle_offset_parameter: Option<StateParameter>,

    #[serde(default)]
    pub mirror_parameter: Option<StateParameter>,
}

impl State {
    pub fn new(name: impl Into<String>, motion: Option<AssetId>) -> Self {
        State {
            name: name.into(),
            motion,
            transitions: Vec::new(),
            speed: 1.0,
            speed_parameter: None,
            time_parameter: None,
            cycle_offset_parameter: None,
            mirror_parameter: None,
        }
    }

    /// The names of all state parameters whose feature is switched on.
    pub fn active_parameters(&self) -> impl Iterator<Item = &str> {
        [
            &self.speed_parameter,
            &self.time_parameter,
            &self.cycle_offset_parameter,
            &self.mirror_parameter,
        ]
        .into_iter()
        .flatten()
        .filter(|binding| binding.active)
        .map(|binding| binding.parameter.as_str())
    }
}

/// A parameter driving one of a state's optional features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateParameter {
    pub parameter: String,

    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Name of the destination state, `None` for exit transitions.
    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub has_exit_time: bool,

    #[serde(default)]
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub mode: ConditionMode,
    pub parameter: String,

    #[serde(default)]
    pub threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionMode {
    If,
    IfNot,
    Greater,
    Less,
    Equals,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendTree {
    pub blend_type: BlendType,

    #[serde(default)]
    pub blend_parameter: String,

    #[serde(default)]
    pub blend_parameter_y: String,

    #[serde(default)]
    pub children: Vec<ChildMotion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendType {
    Simple1D,
    SimpleDirectional2D,
    FreeformDirectional2D,
    FreeformCartesian2D,
    Direct,
}

impl BlendType {
    pub fn is_2d(self) -> bool {
        matches!(
            self,
            BlendType::SimpleDirectional2D
                | BlendType::FreeformDirectional2D
                | BlendType::FreeformCartesian2D
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildMotion {
    #[serde(default)]
    pub motion: Option<AssetId>,

    #[serde(default)]
    pub threshold: f32,

    #[serde(default)]
    pub position: [f32; 2],

    #[serde(default = "default_weight")]
    pub time_scale: f32,

    #[serde(default)]
    pub direct_blend_parameter: String,
}

impl ChildMotion {
    pub fn new(motion: Option<AssetId>) -> Self {
        ChildMotion {
            motion,
            threshold: 0.0,
            position: [0.0; 2],
            time_scale: 1.0,
            direct_blend_parameter: String::new(),
        }
    }
}

/// Identifies the property a curve animates: a slash-joined path from the
/// animated root, the kind of component on that node, and a property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurveBinding {
    pub path: String,
    pub kind: ComponentKind,
    pub property: String,
}

impl CurveBinding {
    pub fn new(path: impl Into<String>, kind: &str, property: impl Into<String>) -> Self {
        CurveBinding {
            path: path.into(),
            kind: ComponentKind::new(kind),
            property: property.into(),
        }
    }

    pub fn with_path(&self, path: impl Into<String>) -> Self {
        CurveBinding {
            path: path.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub keys: Vec<Keyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,

    #[serde(default)]
    pub in_tangent: f32,

    #[serde(default)]
    pub out_tangent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectKeyframe {
    pub time: f32,
    pub value: Option<ObjectRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundCurve<T> {
    pub binding: CurveBinding,
    pub curve: T,
}

/// Keyframe data addressed by curve bindings. Curve payloads are opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationClip {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,

    #[serde(default)]
    pub curves: Vec<BoundCurve<Curve>>,

    #[serde(default)]
    pub object_curves: Vec<BoundCurve<Vec<ObjectKeyframe>>>,
}

fn default_frame_rate() -> f32 {
    60.0
}

impl Default for AnimationClip {
    fn default() -> Self {
        AnimationClip {
            frame_rate: default_frame_rate(),
            curves: Vec::new(),
            object_curves: Vec::new(),
        }
    }
}

impl AnimationClip {
    pub fn curve_bindings(&self) -> impl Iterator<Item = &CurveBinding> {
        self.curves.iter().map(|bound| &bound.binding)
    }

    pub fn object_curve_bindings(&self) -> impl Iterator<Item = &CurveBinding> {
        self.object_curves.iter().map(|bound| &bound.binding)
    }

    pub fn curve(&self, binding: &CurveBinding) -> Option<&Curve> {
        find_curve(&self.curves, binding)
    }

    pub fn object_curve(&self, binding: &CurveBinding) -> Option<&Vec<ObjectKeyframe>> {
        find_curve(&self.object_curves, binding)
    }

    /// Sets or removes curves in bulk. All removals are applied before any
    /// insertion, so a binding that is both vacated and targeted ends up with
    /// the inserted data.
    pub fn set_curves(&mut self, changes: Vec<(CurveBinding, Option<Curve>)>) {
        set_curves(&mut self.curves, changes);
    }

    pub fn set_object_curves(&mut self, changes: Vec<(CurveBinding, Option<Vec<ObjectKeyframe>>)>) {
        set_curves(&mut self.object_curves, changes);
    }
}

fn find_curve<'a, T>(curves: &'a [BoundCurve<T>], binding: &CurveBinding) -> Option<&'a T> {
    curves
        .iter()
        .find(|bound| &bound.binding == binding)
        .map(|bound| &bound.curve)
}

fn set_curves<T>(curves: &mut Vec<BoundCurve<T>>, changes: Vec<(CurveBinding, Option<T>)>) {
    let mut insertions = Vec::new();

    for (binding, curve) in changes {
        match curve {
            Some(curve) => insertions.push(BoundCurve { binding, curve }),
            None => curves.retain(|bound| bound.binding != binding),
        }
    }

    for insertion in insertions {
        match curves
            .iter_mut()
            .find(|bound| bound.binding == insertion.binding)
        {
            Some(existing) => existing.curve = insertion.curve,
            None => curves.push(insertion),
        }
    }
}

/// One substitution in an override controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipOverride {
    pub original: AssetId,

    #[serde(default)]
    pub replacement: Option<AssetId>,
}

/// A controller that reuses `base` with some of its clips substituted.
///
/// `base` may itself be an override controller, forming a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideController {
    pub base: AssetId,

    #[serde(default)]
    pub overrides: Vec<ClipOverride>,
}

impl OverrideController {
    pub fn new(base: AssetId) -> Self {
        OverrideController {
            base,
            overrides: Vec::new(),
        }
    }

    pub fn get(&self, original: AssetId) -> Option<AssetId> {
        self.overrides
            .iter()
            .find(|entry| entry.original == original)
            .and_then(|entry| entry.replacement)
    }

    pub fn set(&mut self, original: AssetId, replacement: AssetId) {
        match self
            .overrides
            .iter_mut()
            .find(|entry| entry.original == original)
        {
            Some(entry) => entry.replacement = Some(replacement),
            None => self.overrides.push(ClipOverride {
                original,
                replacement: Some(replacement),
            }),
        }
    }
}

impl References for ControllerGraph {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for layer in &self.layers {
            visit(Some(ObjectRef::asset(layer.state_machine)));
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for layer in &mut self.layers {
            visit(RefSlot::Asset(&mut layer.state_machine));
        }
    }
}

impl References for StateMachine {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for state in &self.states {
            visit(state.motion.map(ObjectRef::asset));
        }
        for child in &self.state_machines {
            visit(Some(ObjectRef::asset(*child)));
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for state in &mut self.states {
            visit(RefSlot::OptionalAsset(&mut state.motion));
        }
        for child in &mut self.state_machines {
            visit(RefSlot::Asset(child));
        }
    }
}

impl References for BlendTree {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for child in &self.children {
            visit(child.motion.map(ObjectRef::asset));
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for child in &mut self.children {
            visit(RefSlot::OptionalAsset(&mut child.motion));
        }
    }
}

impl References for AnimationClip {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for bound in &self.object_curves {
            for key in &bound.curve {
                visit(key.value.clone());
            }
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for bound in &mut self.object_curves {
            for key in &mut bound.curve {
                visit(RefSlot::Object(&mut key.value));
            }
        }
    }
}

impl References for OverrideController {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        visit(Some(ObjectRef::asset(self.base)));
        for entry in &self.overrides {
            visit(Some(ObjectRef::asset(entry.original)));
            visit(entry.replacement.map(ObjectRef::asset));
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        visit(RefSlot::Asset(&mut self.base));
        for entry in &mut self.overrides {
            visit(RefSlot::Asset(&mut entry.original));
            visit(RefSlot::OptionalAsset(&mut entry.replacement));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

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

    #[test]
    fn set_curves_applies_removals_first() {
        let a = CurveBinding::new("A", "Transform", "m_LocalPosition.x");
        let b = a.with_path("B");
        let c = a.with_path("C");

        let mut clip = AnimationClip::default();
        clip.set_curves(vec![(a.clone(), Some(curve(1.0))), (b.clone(), Some(curve(2.0)))]);

        // A -> B and B -> C staged in the order a naive implementation would
        // trip over.
        clip.set_curves(vec![
            (a.clone(), None),
            (b.clone(), Some(curve(1.0))),
            (b.clone(), None),
            (c.clone(), Some(curve(2.0))),
        ]);

        assert_eq!(clip.curve(&a), None);
        assert_eq!(clip.curve(&b), Some(&curve(1.0)));
        assert_eq!(clip.curve(&c), Some(&curve(2.0)));
    }

    #[test]
    fn active_parameters_skip_disabled_features() {
        let mut state = State::new("Idle", None);
        state.speed_parameter = Some(StateParameter {
            parameter: "Speed".to_owned(),
            active: true,
        });
        state.mirror_parameter = Some(StateParameter {
            parameter: "Mirror".to_owned(),
            active: false,
        });

        assert_eq!(state.active_parameters().collect::<Vec<_>>(), vec!["Speed"]);
    }

    #[test]
    fn override_set_replaces_existing_entry() {
        let mut overrides = OverrideController::new(AssetId::from_raw(1));
        overrides.set(AssetId::from_raw(2), AssetId::from_raw(3));
        overrides.set(AssetId::from_raw(2), AssetId::from_raw(4));

        assert_eq!(overrides.overrides.len(), 1);
        assert_eq!(overrides.get(AssetId::from_raw(2)), Some(AssetId::from_raw(4)));
    }
}
