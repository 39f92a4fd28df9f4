//! Set difference over the flat, keyed collections of a descriptor.

use std::{collections::HashSet, hash::Hash};

use rig_dom::{AssetId, ControlType, ExpressionParameter, ExpressionParameters, ExpressionsMenu, MenuControl};

/// Items of `workspace` whose key appears nowhere in `base`, in workspace
/// order. Items sharing a key with an earlier workspace item are dropped.
pub fn keyed_difference<T, K, F>(workspace: &[T], base: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = base.iter().map(&key).collect();

    workspace
        .iter()
        .filter(|item| seen.insert(key(*item)))
        .cloned()
        .collect()
}

/// Parameters are identified by name alone.
pub fn diff_parameters(
    workspace: Option<&ExpressionParameters>,
    base: Option<&ExpressionParameters>,
) -> Vec<ExpressionParameter> {
    let workspace = match workspace {
        Some(workspace) => &workspace.parameters,
        None => return Vec::new(),
    };
    let base = base.map(|base| base.parameters.as_slice()).unwrap_or(&[]);

    keyed_difference(workspace, base, |parameter| parameter.name.clone())
}

/// Everything that makes two menu controls the same control. Sub-menus and
/// icons compare by identity.
#[derive(Debug, PartialEq, Eq, Hash)]
struct MenuKey {
    name: String,
    control_type: ControlType,
    parameter: String,
    sub_menu: Option<AssetId>,
    sub_parameters: Vec<String>,
    icon: Option<AssetId>,
    value: u32,
}

impl MenuKey {
    fn new(control: &MenuControl) -> Self {
        MenuKey {
            name: control.name.clone(),
            control_type: control.control_type,
            parameter: control.parameter.clone(),
            sub_menu: control.sub_menu,
            sub_parameters: control.sub_parameters.clone(),
            icon: control.icon,
            // -0.0 and 0.0 are the same value.
            value: (control.value + 0.0).to_bits(),
        }
    }
}

pub fn diff_menu(
    workspace: Option<&ExpressionsMenu>,
    base: Option<&ExpressionsMenu>,
) -> Vec<MenuControl> {
    let workspace = match workspace {
        Some(workspace) => &workspace.controls,
        None => return Vec::new(),
    };
    let base = base.map(|base| base.controls.as_slice()).unwrap_or(&[]);

    keyed_difference(workspace, base, MenuKey::new)
}

#[cfg(test)]
mod test {
    use super::*;

    use rig_dom::ValueType;

    fn parameters(names: &[&str]) -> ExpressionParameters {
        ExpressionParameters {
            parameters: names
                .iter()
                .map(|name| ExpressionParameter::new(*name, ValueType::Bool))
                .collect(),
        }
    }

    fn names(parameters: &[ExpressionParameter]) -> Vec<&str> {
        parameters.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn added_parameters() {
        let workspace = parameters(&["Speed", "Jump"]);
        let base = parameters(&["Speed"]);

        let diff = diff_parameters(Some(&workspace), Some(&base));
        assert_eq!(names(&diff), ["Jump"]);
    }

    #[test]
    fn parameters_against_themselves() {
        let workspace = parameters(&["A", "B"]);

        assert!(diff_parameters(Some(&workspace), Some(&workspace)).is_empty());
        assert_eq!(names(&diff_parameters(Some(&workspace), None)), ["A", "B"]);
        assert!(diff_parameters(None, Some(&workspace)).is_empty());
    }

    #[test]
    fn duplicate_workspace_parameters_collapse() {
        let mut workspace = parameters(&["B", "A", "B"]);
        workspace.parameters[2].value_type = ValueType::Int;

        let diff = diff_parameters(Some(&workspace), None);
        assert_eq!(names(&diff), ["B", "A"]);
        assert_eq!(diff[0].value_type, ValueType::Bool);
    }

    #[test]
    fn menu_controls_compare_on_every_key_field() {
        let toggle = MenuControl {
            parameter: "Hat".to_owned(),
            value: 1.0,
            ..MenuControl::new("Hat", ControlType::Toggle)
        };
        let other_value = MenuControl {
            value: 2.0,
            ..toggle.clone()
        };
        let button = MenuControl {
            control_type: ControlType::Button,
            ..toggle.clone()
        };

        let base = ExpressionsMenu {
            controls: vec![toggle.clone()],
        };
        let workspace = ExpressionsMenu {
            controls: vec![toggle.clone(), other_value.clone(), button.clone(), toggle],
        };

        let diff = diff_menu(Some(&workspace), Some(&base));
        assert_eq!(diff, vec![other_value, button]);
    }

    #[test]
    fn menu_without_base_is_kept_whole() {
        let workspace = ExpressionsMenu {
            controls: vec![
                MenuControl::new("A", ControlType::Button),
                MenuControl::new("B", ControlType::SubMenu),
            ],
        };

        assert_eq!(diff_menu(Some(&workspace), None), workspace.controls);
        assert!(diff_menu(Some(&workspace), Some(&workspace)).is_empty());
        assert!(diff_menu(None, None).is_empty());
    }
}
