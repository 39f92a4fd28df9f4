//! The records a modularize run produces. They describe the installable
//! module declaratively; turning them into host components is up to the
//! caller.

use rig_dom::{AssetId, ExpressionParameter, MenuControl, Ref, ValueType};
use serde::Serialize;

use crate::{
    descriptor::LayerType,
    error::MergeWarning,
    hierarchy::{MergeChange, PathMapping},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathMode {
    /// Curve paths are resolved from the node the animator is merged at.
    Relative,

    /// Curve paths are resolved from the avatar root.
    Absolute,
}

/// Installs a controller into one of the avatar's layer slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeAnimator {
    pub layer_type: LayerType,
    pub controller: AssetId,
    pub path_mode: PathMode,
    pub match_avatar_write_defaults: bool,
}

impl MergeAnimator {
    pub fn new(layer_type: LayerType, controller: AssetId) -> Self {
        MergeAnimator {
            layer_type,
            controller,
            path_mode: PathMode::Relative,
            match_avatar_write_defaults: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterSyncType {
    Int,
    Float,
    Bool,
    NotSynced,
}

impl From<ValueType> for ParameterSyncType {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int => ParameterSyncType::Int,
            ValueType::Float => ParameterSyncType::Float,
            ValueType::Bool => ParameterSyncType::Bool,
            ValueType::Unknown => ParameterSyncType::NotSynced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterConfig {
    pub name_or_prefix: String,
    pub sync_type: ParameterSyncType,
    pub has_explicit_default_value: bool,
    pub default_value: f32,
    pub local_only: bool,
    pub saved: bool,
}

impl From<&ExpressionParameter> for ParameterConfig {
    fn from(parameter: &ExpressionParameter) -> Self {
        ParameterConfig {
            name_or_prefix: parameter.name.clone(),
            sync_type: parameter.value_type.into(),
            has_explicit_default_value: !approximately_zero(parameter.default_value),
            default_value: parameter.default_value,
            local_only: !parameter.network_synced,
            saved: parameter.saved,
        }
    }
}

/// Zero within a few multiples of the smallest subnormal `f32`.
fn approximately_zero(value: f32) -> bool {
    value.abs() < f32::from_bits(1) * 8.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MenuSource {
    /// The control's own sub-menu asset supplies its children.
    MenuAsset,

    /// Child nodes of the menu item supply its children.
    Children,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub control: MenuControl,
    pub source: MenuSource,
}

impl From<MenuControl> for MenuItem {
    fn from(control: MenuControl) -> Self {
        MenuItem {
            control,
            source: MenuSource::MenuAsset,
        }
    }
}

/// Asks the caller to store a generated asset at `path`, with `sub_assets`
/// stored inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistRequest {
    pub asset: AssetId,
    pub path: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_assets: Vec<AssetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProxyRecord {
    pub target: Ref,
    pub proxy: Ref,
}

/// Everything that has to be installed on the base for it to behave like the
/// workspace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffModule {
    pub merge_root: Ref,
    pub proxies: Vec<ProxyRecord>,
    pub path_mapping: PathMapping,
    pub changes: Vec<MergeChange>,
    pub merge_animators: Vec<MergeAnimator>,
    pub parameters: Vec<ParameterConfig>,
    pub menu_items: Vec<MenuItem>,
    pub persist: Vec<PersistRequest>,
    pub warnings: Vec<MergeWarning>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parameter_config_from_expression_parameter() {
        let mut jump = ExpressionParameter::new("Jump", ValueType::Bool);
        jump.network_synced = false;

        let config = ParameterConfig::from(&jump);
        assert_eq!(config.name_or_prefix, "Jump");
        assert_eq!(config.sync_type, ParameterSyncType::Bool);
        assert!(!config.has_explicit_default_value);
        assert!(config.local_only);
        assert!(config.saved);

        let mut blend = ExpressionParameter::new("Blend", ValueType::Unknown);
        blend.default_value = 0.5;

        let config = ParameterConfig::from(&blend);
        assert_eq!(config.sync_type, ParameterSyncType::NotSynced);
        assert!(config.has_explicit_default_value);
        assert!(!config.local_only);
    }

    #[test]
    fn tiny_defaults_are_still_explicit() {
        let mut speed = ExpressionParameter::new("Speed", ValueType::Float);
        speed.default_value = 5e-7;
        assert!(ParameterConfig::from(&speed).has_explicit_default_value);

        speed.default_value = -1e-30;
        assert!(ParameterConfig::from(&speed).has_explicit_default_value);

        speed.default_value = -0.0;
        assert!(!ParameterConfig::from(&speed).has_explicit_default_value);
    }
}
