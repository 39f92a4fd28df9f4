/*!
A weakly-typed model of a rig scene: a hierarchy of named nodes carrying
components, plus an in-memory store of the animation and expression assets
those components point at.

Nothing in this crate knows about concrete component types. Components are a
kind tag plus a property map, and references between nodes, components, and
assets are plain [`ObjectRef`] values that can be enumerated and rewritten
through the [`References`] trait.
*/

mod animation;
mod asset;
mod component;
mod dom;
mod expression;
mod references;
mod types;

pub use animation::*;
pub use asset::{Asset, AssetEntry, AssetError, AssetFlags, Assets, ExternalAsset};
pub use component::{Component, ComponentKind};
pub use dom::{Ancestors, Descendants, DomError, Node, NodeBuilder, RigDom};
pub use expression::*;
pub use references::{RefSlot, References, SlotTypeError};
pub use types::{AssetId, ObjectRef, Ref, Transform, Variant};

pub use glam::{Quat, Vec3};
