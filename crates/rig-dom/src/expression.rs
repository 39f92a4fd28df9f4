//! Flat expression parameter and menu collections.

use serde::{Deserialize, Serialize};

use crate::{
    references::{RefSlot, References},
    types::{AssetId, ObjectRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Int,
    Float,
    Bool,

    /// Any value type this crate doesn't know about.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionParameter {
    pub name: String,
    pub value_type: ValueType,

    #[serde(default)]
    pub default_value: f32,

    #[serde(default)]
    pub saved: bool,

    #[serde(default = "default_network_synced")]
    pub network_synced: bool,
}

fn default_network_synced() -> bool {
    true
}

impl ExpressionParameter {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        ExpressionParameter {
            name: name.into(),
            value_type,
            default_value: 0.0,
            saved: true,
            network_synced: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionParameters {
    #[serde(default)]
    pub parameters: Vec<ExpressionParameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlType {
    Button,
    Toggle,
    SubMenu,
    TwoAxisPuppet,
    FourAxisPuppet,
    RadialPuppet,
}

/// A single entry of an expressions menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuControl {
    pub name: String,
    pub control_type: ControlType,

    /// Name of the parameter this control drives, empty when unused.
    #[serde(default)]
    pub parameter: String,

    #[serde(default)]
    pub sub_menu: Option<AssetId>,

    #[serde(default)]
    pub sub_parameters: Vec<String>,

    #[serde(default)]
    pub icon: Option<AssetId>,

    #[serde(default)]
    pub value: f32,
}

impl MenuControl {
    pub fn new(name: impl Into<String>, control_type: ControlType) -> Self {
        MenuControl {
            name: name.into(),
            control_type,
            parameter: String::new(),
            sub_menu: None,
            sub_parameters: Vec::new(),
            icon: None,
            value: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionsMenu {
    #[serde(default)]
    pub controls: Vec<MenuControl>,
}

impl References for ExpressionsMenu {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for control in &self.controls {
            visit(control.sub_menu.map(ObjectRef::asset));
            visit(control.icon.map(ObjectRef::asset));
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for control in &mut self.controls {
            visit(RefSlot::OptionalAsset(&mut control.sub_menu));
            visit(RefSlot::OptionalAsset(&mut control.icon));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_value_types_deserialize() {
        let parameter: ExpressionParameter =
            serde_json::from_str(r#"{ "name": "Blend", "valueType": "Vector" }"#).unwrap();

        assert_eq!(parameter.value_type, ValueType::Unknown);
        assert!(parameter.network_synced);
        assert!(!parameter.saved);
    }
}
