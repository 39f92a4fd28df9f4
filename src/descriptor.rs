//! Describes which assets an avatar uses for its animation layers, parameters,
//! and menu.

use std::collections::BTreeMap;

use rig_dom::{AssetId, Ref};
use serde::{Deserialize, Serialize};

/// The animation layer slots an avatar exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerType {
    Base,
    Additive,
    Gesture,
    Action,
    FX,
    Sitting,
    TPose,
    IKPose,
}

impl LayerType {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerType::Base => "Base",
            LayerType::Additive => "Additive",
            LayerType::Gesture => "Gesture",
            LayerType::Action => "Action",
            LayerType::FX => "FX",
            LayerType::Sitting => "Sitting",
            LayerType::TPose => "TPose",
            LayerType::IKPose => "IKPose",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "camelCase")]
pub struct AvatarDescriptor {
    /// Controller asset per layer slot. Slots without a controller are
    /// omitted.
    pub layers: BTreeMap<LayerType, AssetId>,
    pub expression_parameters: Option<AssetId>,
    pub expressions_menu: Option<AssetId>,
}

/// A rig hierarchy together with its descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub root: Ref,

    #[serde(default)]
    pub descriptor: AvatarDescriptor,
}

impl Avatar {
    pub fn new(root: Ref) -> Self {
        Avatar {
            root,
            descriptor: AvatarDescriptor::default(),
        }
    }
}
