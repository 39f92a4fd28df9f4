//! Explicit enumeration of the object-reference slots held by components and
//! assets.
//!
//! Every type that can point at another node, component, or asset implements
//! [`References`]. Consumers address slots by index: the index of a slot is
//! its position in the order `for_each_reference` reports it, empty slots
//! included.

use thiserror::Error;

use crate::types::{AssetId, ObjectRef};

/// A mutable handle to a single reference-typed field.
pub enum RefSlot<'a> {
    /// A slot that may hold any kind of reference, or nothing.
    Object(&'a mut Option<ObjectRef>),

    /// A slot that must always hold an asset.
    Asset(&'a mut AssetId),

    /// A slot that may hold an asset, or nothing.
    OptionalAsset(&'a mut Option<AssetId>),
}

impl RefSlot<'_> {
    pub fn get(&self) -> Option<ObjectRef> {
        match self {
            RefSlot::Object(value) => (**value).clone(),
            RefSlot::Asset(value) => Some(ObjectRef::asset(**value)),
            RefSlot::OptionalAsset(value) => value.map(ObjectRef::asset),
        }
    }

    pub fn set(self, value: Option<ObjectRef>) -> Result<(), SlotTypeError> {
        match (self, value) {
            (RefSlot::Object(slot), value) => {
                *slot = value;
                Ok(())
            }
            (RefSlot::Asset(slot), Some(ObjectRef::Asset { asset })) => {
                *slot = asset;
                Ok(())
            }
            (RefSlot::Asset(_), value) => Err(SlotTypeError::AssetRequired { found: value }),
            (RefSlot::OptionalAsset(slot), None) => {
                *slot = None;
                Ok(())
            }
            (RefSlot::OptionalAsset(slot), Some(ObjectRef::Asset { asset })) => {
                *slot = Some(asset);
                Ok(())
            }
            (RefSlot::OptionalAsset(_), value) => {
                Err(SlotTypeError::AssetRequired { found: value })
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SlotTypeError {
    #[error("slot only accepts asset references, got {found:?}")]
    AssetRequired { found: Option<ObjectRef> },

    #[error("reference slot {index} does not exist ({len} slots)")]
    OutOfRange { index: usize, len: usize },
}

/// Capability interface over the reference-typed fields of a value.
pub trait References {
    /// Reports the current value of every reference slot, in slot order.
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>));

    /// Hands out every reference slot, in the same order as
    /// `for_each_reference`.
    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>));

    fn references(&self) -> Vec<Option<ObjectRef>> {
        let mut references = Vec::new();
        self.for_each_reference(&mut |value| references.push(value));
        references
    }

    /// Non-empty asset references, in slot order.
    fn asset_references(&self) -> Vec<AssetId> {
        let mut assets = Vec::new();
        self.for_each_reference(&mut |value| {
            if let Some(ObjectRef::Asset { asset }) = value {
                assets.push(asset);
            }
        });
        assets
    }

    fn rewrite_reference(
        &mut self,
        index: usize,
        value: Option<ObjectRef>,
    ) -> Result<(), SlotTypeError> {
        let mut current = 0;
        let mut value = Some(value);
        let mut result = None;

        self.for_each_slot(&mut |slot| {
            if current == index {
                if let Some(value) = value.take() {
                    result = Some(slot.set(value));
                }
            }
            current += 1;
        });

        result.unwrap_or(Err(SlotTypeError::OutOfRange {
            index,
            len: current,
        }))
    }

    /// Replaces every asset reference found in `remap`, returning how many
    /// slots changed.
    fn remap_assets(&mut self, remap: &dyn Fn(AssetId) -> Option<AssetId>) -> usize {
        let mut changed = 0;

        self.for_each_slot(&mut |slot| {
            let replacement = match slot.get() {
                Some(ObjectRef::Asset { asset }) => remap(asset),
                _ => None,
            };

            if let Some(replacement) = replacement {
                if slot.set(Some(ObjectRef::asset(replacement))).is_ok() {
                    changed += 1;
                }
            }
        });

        changed
    }
}
