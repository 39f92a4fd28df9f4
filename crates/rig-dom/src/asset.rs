use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    animation::{AnimationClip, BlendTree, ControllerGraph, OverrideController, StateMachine},
    expression::{ExpressionParameters, ExpressionsMenu},
    references::{RefSlot, References},
    types::{AssetId, ObjectRef},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("{id} does not exist in the asset store")]
    NotFound { id: AssetId },

    #[error("{id} ({name}) is owned outside the asset store and cannot be duplicated")]
    NotDuplicable { id: AssetId, name: String },

    #[error("asset ID {id} appears more than once")]
    DuplicateId { id: AssetId },
}

/// Editor-facing flags carried along when an asset is duplicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "camelCase")]
pub struct AssetFlags {
    pub hidden: bool,
    pub not_editable: bool,
}

/// An asset that lives outside of this store, such as a texture or a mesh.
///
/// External assets may still hold references, but their payload is not
/// available so they cannot be duplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAsset {
    pub type_name: String,

    #[serde(default)]
    pub references: Vec<Option<ObjectRef>>,
}

impl References for ExternalAsset {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for reference in &self.references {
            visit(reference.clone());
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for reference in &mut self.references {
            visit(RefSlot::Object(reference));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Asset {
    Controller(ControllerGraph),
    OverrideController(OverrideController),
    StateMachine(StateMachine),
    BlendTree(BlendTree),
    Clip(AnimationClip),
    ExpressionParameters(ExpressionParameters),
    ExpressionsMenu(ExpressionsMenu),
    External(ExternalAsset),
}

impl Asset {
    pub fn as_controller(&self) -> Option<&ControllerGraph> {
        match self {
            Asset::Controller(controller) => Some(controller),
            _ => None,
        }
    }

    pub fn as_override_controller(&self) -> Option<&OverrideController> {
        match self {
            Asset::OverrideController(controller) => Some(controller),
            _ => None,
        }
    }

    pub fn as_state_machine(&self) -> Option<&StateMachine> {
        match self {
            Asset::StateMachine(machine) => Some(machine),
            _ => None,
        }
    }

    pub fn as_blend_tree(&self) -> Option<&BlendTree> {
        match self {
            Asset::BlendTree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_clip(&self) -> Option<&AnimationClip> {
        match self {
            Asset::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut AnimationClip> {
        match self {
            Asset::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_override_controller_mut(&mut self) -> Option<&mut OverrideController> {
        match self {
            Asset::OverrideController(controller) => Some(controller),
            _ => None,
        }
    }

    pub fn as_expression_parameters(&self) -> Option<&ExpressionParameters> {
        match self {
            Asset::ExpressionParameters(parameters) => Some(parameters),
            _ => None,
        }
    }

    pub fn as_expressions_menu(&self) -> Option<&ExpressionsMenu> {
        match self {
            Asset::ExpressionsMenu(menu) => Some(menu),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Asset::Controller(_) => "Controller",
            Asset::OverrideController(_) => "OverrideController",
            Asset::StateMachine(_) => "StateMachine",
            Asset::BlendTree(_) => "BlendTree",
            Asset::Clip(_) => "Clip",
            Asset::ExpressionParameters(_) => "ExpressionParameters",
            Asset::ExpressionsMenu(_) => "ExpressionsMenu",
            Asset::External(external) => &external.type_name,
        }
    }
}

impl References for Asset {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        match self {
            Asset::Controller(inner) => inner.for_each_reference(visit),
            Asset::OverrideController(inner) => inner.for_each_reference(visit),
            Asset::StateMachine(inner) => inner.for_each_reference(visit),
            Asset::BlendTree(inner) => inner.for_each_reference(visit),
            Asset::Clip(inner) => inner.for_each_reference(visit),
            Asset::ExpressionParameters(_) => {}
            Asset::ExpressionsMenu(inner) => inner.for_each_reference(visit),
            Asset::External(inner) => inner.for_each_reference(visit),
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        match self {
            Asset::Controller(inner) => inner.for_each_slot(visit),
            Asset::OverrideController(inner) => inner.for_each_slot(visit),
            Asset::StateMachine(inner) => inner.for_each_slot(visit),
            Asset::BlendTree(inner) => inner.for_each_slot(visit),
            Asset::Clip(inner) => inner.for_each_slot(visit),
            Asset::ExpressionParameters(_) => {}
            Asset::ExpressionsMenu(inner) => inner.for_each_slot(visit),
            Asset::External(inner) => inner.for_each_slot(visit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: AssetId,
    pub name: String,

    #[serde(default)]
    pub flags: AssetFlags,

    #[serde(flatten)]
    pub asset: Asset,
}

/// In-memory store of every asset a scene snapshot refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssetsDocument", into = "AssetsDocument")]
pub struct Assets {
    entries: BTreeMap<AssetId, AssetEntry>,
    next_id: u64,
}

impl Assets {
    pub fn new() -> Self {
        Assets::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, asset: Asset) -> AssetId {
        self.insert_with_flags(name, AssetFlags::default(), asset)
    }

    pub fn insert_with_flags(
        &mut self,
        name: impl Into<String>,
        flags: AssetFlags,
        asset: Asset,
    ) -> AssetId {
        self.next_id += 1;
        let id = AssetId::from_raw(self.next_id);

        self.entries.insert(
            id,
            AssetEntry {
                id,
                name: name.into(),
                flags,
                asset,
            },
        );

        id
    }

    pub fn get(&self, id: AssetId) -> Option<&AssetEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut AssetEntry> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn name(&self, id: AssetId) -> Option<&str> {
        self.entries.get(&id).map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.values()
    }

    /// Makes a shallow copy of an asset: the copy has the same name, flags,
    /// and payload, and still references the same sub-assets.
    pub fn duplicate(&mut self, id: AssetId) -> Result<AssetId, AssetError> {
        let entry = self.entries.get(&id).ok_or(AssetError::NotFound { id })?;

        if let Asset::External(_) = entry.asset {
            return Err(AssetError::NotDuplicable {
                id,
                name: entry.name.clone(),
            });
        }

        let name = entry.name.clone();
        let flags = entry.flags;
        let asset = entry.asset.clone();

        let new_id = self.insert_with_flags(name, flags, asset);

        log::trace!("Duplicated {} into {}", id, new_id);

        Ok(new_id)
    }
}

#[derive(Serialize, Deserialize)]
struct AssetsDocument {
    assets: Vec<AssetEntry>,
}

impl From<Assets> for AssetsDocument {
    fn from(assets: Assets) -> Self {
        AssetsDocument {
            assets: assets.entries.into_values().collect(),
        }
    }
}

impl TryFrom<AssetsDocument> for Assets {
    type Error = AssetError;

    fn try_from(document: AssetsDocument) -> Result<Self, Self::Error> {
        let mut assets = Assets::new();

        for entry in document.assets {
            let id = entry.id;
            assets.next_id = assets.next_id.max(id.to_raw());

            if assets.entries.insert(id, entry).is_some() {
                return Err(AssetError::DuplicateId { id });
            }
        }

        Ok(assets)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::animation::Layer;

    #[test]
    fn duplicate_keeps_name_flags_and_references() {
        let mut assets = Assets::new();
        let machine = assets.insert("Machine", Asset::StateMachine(Default::default()));
        let controller = assets.insert(
            "Controller",
            Asset::Controller(ControllerGraph {
                layers: vec![Layer::new("Base", machine)],
                parameters: Vec::new(),
            }),
        );
        assets.get_mut(controller).unwrap().flags.hidden = true;

        let copy = assets.duplicate(controller).unwrap();
        let copy_entry = assets.get(copy).unwrap();

        assert_ne!(copy, controller);
        assert_eq!(copy_entry.name, "Controller");
        assert!(copy_entry.flags.hidden);
        assert_eq!(copy_entry.asset.asset_references(), vec![machine]);
    }

    #[test]
    fn external_assets_cannot_be_duplicated() {
        let mut assets = Assets::new();
        let texture = assets.insert(
            "Icon",
            Asset::External(ExternalAsset {
                type_name: "Texture2D".to_owned(),
                references: Vec::new(),
            }),
        );

        assert!(matches!(
            assets.duplicate(texture),
            Err(AssetError::NotDuplicable { .. })
        ));
    }

    #[test]
    fn json_round_trip_preserves_id_allocation() {
        let mut assets = Assets::new();
        assets.insert("Clip", Asset::Clip(Default::default()));

        let encoded = serde_json::to_string(&assets).unwrap();
        let mut decoded: Assets = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, assets);
        let next = decoded.insert("Other", Asset::Clip(Default::default()));
        assert_eq!(next.to_raw(), 2);
    }
}
