use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    references::{RefSlot, References},
    types::{ObjectRef, Variant},
};

/// Opaque type tag of a component.
///
/// A node carries at most one component of any given kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentKind(Arc<str>);

impl ComponentKind {
    #[inline]
    pub fn new(kind: &str) -> Self {
        ComponentKind(Arc::from(kind))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentKind {
    fn from(kind: &str) -> Self {
        ComponentKind::new(kind)
    }
}

impl From<String> for ComponentKind {
    fn from(kind: String) -> Self {
        ComponentKind(Arc::from(kind))
    }
}

impl PartialEq<str> for ComponentKind {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ComponentKind {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// A typed record of properties attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,

    #[serde(default)]
    pub properties: BTreeMap<String, Variant>,
}

impl Component {
    pub fn new(kind: impl Into<ComponentKind>) -> Self {
        Component {
            kind: kind.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.properties.get(name)
    }

    /// Convenience accessor for single-reference properties.
    pub fn get_ref(&self, name: &str) -> Option<&ObjectRef> {
        self.properties.get(name).and_then(Variant::as_object_ref)
    }
}

fn visit_variant(value: &Variant, visit: &mut dyn FnMut(Option<ObjectRef>)) {
    match value {
        Variant::Ref(target) => visit(target.clone()),
        Variant::Array(items) => {
            for item in items {
                visit_variant(item, visit);
            }
        }
        _ => {}
    }
}

fn visit_variant_mut(value: &mut Variant, visit: &mut dyn FnMut(RefSlot<'_>)) {
    match value {
        Variant::Ref(target) => visit(RefSlot::Object(target)),
        Variant::Array(items) => {
            for item in items {
                visit_variant_mut(item, visit);
            }
        }
        _ => {}
    }
}

impl References for Component {
    fn for_each_reference(&self, visit: &mut dyn FnMut(Option<ObjectRef>)) {
        for value in self.properties.values() {
            visit_variant(value, visit);
        }
    }

    fn for_each_slot(&mut self, visit: &mut dyn FnMut(RefSlot<'_>)) {
        for value in self.properties.values_mut() {
            visit_variant_mut(value, visit);
        }
    }
}
