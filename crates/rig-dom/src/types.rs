use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;

/// Identifier of a node inside a [`RigDom`](crate::RigDom).
///
/// Refs are only meaningful for the DOM that handed them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ref(u64);

impl Ref {
    #[inline]
    pub(crate) fn from_raw(value: u64) -> Self {
        Ref(value)
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "node#{}", self.0)
    }
}

/// Identifier of an asset inside an [`Assets`](crate::Assets) store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u64);

impl AssetId {
    #[inline]
    pub(crate) fn from_raw(value: u64) -> Self {
        AssetId(value)
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "asset#{}", self.0)
    }
}

/// A reference held by a property, a curve keyframe, or an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectRef {
    /// The object that owns a node, as opposed to the node's transform.
    Object { node: Ref },

    /// The node itself, usually used as a bone.
    Node { node: Ref },

    /// The component of the given kind attached to a node.
    Component { node: Ref, kind: ComponentKind },

    Asset { asset: AssetId },
}

impl ObjectRef {
    pub fn object(node: Ref) -> Self {
        ObjectRef::Object { node }
    }

    pub fn node(node: Ref) -> Self {
        ObjectRef::Node { node }
    }

    pub fn component(node: Ref, kind: impl Into<ComponentKind>) -> Self {
        ObjectRef::Component {
            node,
            kind: kind.into(),
        }
    }

    pub fn asset(asset: AssetId) -> Self {
        ObjectRef::Asset { asset }
    }

    /// The node this reference resolves through, if it points into a DOM.
    pub fn target_node(&self) -> Option<Ref> {
        match self {
            ObjectRef::Object { node }
            | ObjectRef::Node { node }
            | ObjectRef::Component { node, .. } => Some(*node),
            ObjectRef::Asset { .. } => None,
        }
    }

    pub fn as_asset(&self) -> Option<AssetId> {
        match self {
            ObjectRef::Asset { asset } => Some(*asset),
            _ => None,
        }
    }
}

impl From<AssetId> for ObjectRef {
    fn from(asset: AssetId) -> Self {
        ObjectRef::Asset { asset }
    }
}

/// A property value attached to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(String),
    Vector3(Vec3),
    Quaternion(Quat),
    Ref(Option<ObjectRef>),
    Array(Vec<Variant>),
}

impl Variant {
    pub fn as_object_ref(&self) -> Option<&ObjectRef> {
        match self {
            Variant::Ref(Some(value)) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<f32> for Variant {
    fn from(value: f32) -> Self {
        Variant::Float(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

impl From<ObjectRef> for Variant {
    fn from(value: ObjectRef) -> Self {
        Variant::Ref(Some(value))
    }
}

/// Local position and rotation of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Transform { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Transform {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Composes `self` (a parent's world transform) with a child's local
    /// transform.
    pub fn mul_transform(&self, local: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * local.position,
            rotation: self.rotation * local.rotation,
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();

        Transform {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// Re-expresses a world transform relative to `self`.
    pub fn relative(&self, world: &Transform) -> Transform {
        self.inverse().mul_transform(world)
    }
}
