use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    component::{Component, ComponentKind},
    types::{Ref, Transform},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("{id} does not exist in the DOM")]
    NotFound { id: Ref },

    #[error("node {name} ({id}) already has a component of kind {kind}")]
    DuplicateComponent {
        id: Ref,
        name: String,
        kind: ComponentKind,
    },

    #[error("node ID {id} appears more than once")]
    DuplicateId { id: Ref },

    #[error("{id} lists {parent} as its parent, which does not list it as a child")]
    InconsistentParent { id: Ref, parent: Ref },

    #[error("{id} lists {child} as a child, but {child} names a different parent")]
    InconsistentChild { id: Ref, child: Ref },

    #[error("root {id} has a parent")]
    RootHasParent { id: Ref },

    #[error("{id} is not reachable from any root, or is reachable more than once")]
    Unreachable { id: Ref },
}

/// A single node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: Ref,

    #[serde(default)]
    parent: Option<Ref>,

    #[serde(default)]
    children: Vec<Ref>,

    pub name: String,

    #[serde(default)]
    pub transform: Transform,

    #[serde(default)]
    components: Vec<Component>,
}

impl Node {
    #[inline]
    pub fn id(&self) -> Ref {
        self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<Ref> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[Ref] {
        &self.children
    }

    #[inline]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.components.iter_mut()
    }

    pub fn component(&self, kind: &ComponentKind) -> Option<&Component> {
        self.components.iter().find(|component| &component.kind == kind)
    }

    pub fn component_mut(&mut self, kind: &ComponentKind) -> Option<&mut Component> {
        self.components
            .iter_mut()
            .find(|component| &component.kind == kind)
    }

    pub fn has_component(&self, kind: &ComponentKind) -> bool {
        self.component(kind).is_some()
    }

    /// Attaches a component, refusing a second component of the same kind.
    pub fn add_component(&mut self, component: Component) -> Result<(), DomError> {
        if self.has_component(&component.kind) {
            return Err(DomError::DuplicateComponent {
                id: self.id,
                name: self.name.clone(),
                kind: component.kind,
            });
        }

        self.components.push(component);
        Ok(())
    }
}

/// Describes a node to be inserted into a [`RigDom`], along with its
/// descendants.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    name: String,
    transform: Transform,
    components: Vec<Component>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        NodeBuilder {
            name: name.into(),
            transform: Transform::IDENTITY,
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Adds a component. A later component of the same kind replaces an
    /// earlier one.
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.retain(|existing| existing.kind != component.kind);
        self.components.push(component);
        self
    }

    pub fn with_child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeBuilder>) -> Self {
        self.children.extend(children);
        self
    }
}

/// An arena holding one or more node trees of a scene snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DomDocument", into = "DomDocument")]
pub struct RigDom {
    nodes: HashMap<Ref, Node>,

    /// Top-level nodes, in insertion order.
    roots: Vec<Ref>,
    next_id: u64,
}

impl RigDom {
    pub fn new() -> Self {
        RigDom::default()
    }

    #[inline]
    pub fn roots(&self) -> &[Ref] {
        &self.roots
    }

    pub fn get_by_ref(&self, id: Ref) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_by_ref_mut(&mut self, id: Ref) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn next_ref(&mut self) -> Ref {
        self.next_id += 1;
        Ref::from_raw(self.next_id)
    }

    /// Inserts a node and its descendants under `parent`, or as a new root
    /// when `parent` is `None`. Returns the ID of the topmost new node.
    pub fn insert(&mut self, parent: Option<Ref>, builder: NodeBuilder) -> Result<Ref, DomError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(&parent) {
                return Err(DomError::NotFound { id: parent });
            }
        }

        let mut queue = VecDeque::new();
        let top = self.insert_one(parent, builder, &mut queue);

        while let Some((parent, builder)) = queue.pop_front() {
            self.insert_one(Some(parent), builder, &mut queue);
        }

        Ok(top)
    }

    fn insert_one(
        &mut self,
        parent: Option<Ref>,
        builder: NodeBuilder,
        queue: &mut VecDeque<(Ref, NodeBuilder)>,
    ) -> Ref {
        let id = self.next_ref();

        self.nodes.insert(
            id,
            Node {
                id,
                parent,
                children: Vec::new(),
                name: builder.name,
                transform: builder.transform,
                components: builder.components,
            },
        );
        self.attach(id, parent);

        queue.extend(builder.children.into_iter().map(|child| (id, child)));
        id
    }

    fn attach(&mut self, id: Ref, parent: Option<Ref>) {
        match parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(&parent) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
    }

    /// Ancestors of a node, nearest first, not including the node itself.
    pub fn ancestors(&self, id: Ref) -> Ancestors<'_> {
        Ancestors {
            dom: self,
            next: self.nodes.get(&id).and_then(Node::parent),
        }
    }

    /// Whether `id` is `ancestor` or lies beneath it.
    pub fn is_descendant_of(&self, id: Ref, ancestor: Ref) -> bool {
        id == ancestor || self.ancestors(id).any(|parent| parent == ancestor)
    }

    /// Breadth-first descendants of a node, not including the node itself.
    pub fn descendants(&self, id: Ref) -> Descendants<'_> {
        let queue = self
            .nodes
            .get(&id)
            .map(|node| node.children.iter().copied().collect())
            .unwrap_or_default();

        Descendants { dom: self, queue }
    }

    /// The first child of `parent` named `name`, in child order.
    pub fn find_child_by_name(&self, parent: Ref, name: &str) -> Option<Ref> {
        self.nodes.get(&parent)?.children.iter().copied().find(|child| {
            self.nodes
                .get(child)
                .map(|node| node.name == name)
                .unwrap_or(false)
        })
    }

    /// The slash-joined names from `ancestor` (exclusive) down to `id`
    /// (inclusive). `ancestor` itself maps to the empty string.
    pub fn relative_path(&self, id: Ref, ancestor: Ref) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;

        while current != ancestor {
            let node = self.nodes.get(&current)?;
            names.push(node.name.as_str());
            current = node.parent?;
        }

        names.reverse();
        Some(names.join("/"))
    }

    pub fn world_transform(&self, id: Ref) -> Option<Transform> {
        let node = self.nodes.get(&id)?;
        let mut world = node.transform;
        let mut parent = node.parent;

        while let Some(parent_id) = parent {
            let parent_node = self.nodes.get(&parent_id)?;
            world = parent_node.transform.mul_transform(&world);
            parent = parent_node.parent;
        }

        Some(world)
    }

    /// Places a node so that its world transform matches `world`, keeping its
    /// current parent.
    pub fn set_world_transform(&mut self, id: Ref, world: Transform) -> Result<(), DomError> {
        let parent = self
            .nodes
            .get(&id)
            .ok_or(DomError::NotFound { id })?
            .parent;

        let parent_world = match parent {
            Some(parent) => self
                .world_transform(parent)
                .ok_or(DomError::NotFound { id: parent })?,
            None => Transform::IDENTITY,
        };

        if let Some(node) = self.nodes.get_mut(&id) {
            node.transform = parent_world.relative(&world);
        }

        Ok(())
    }

    /// Copies the subtree rooted at `id` under `new_parent`. Components are
    /// copied by value, so their references still point at the originals.
    ///
    /// Returns the ID of the copy's root plus the original -> copy mapping
    /// for every copied node, in breadth-first order.
    pub fn clone_subtree(
        &mut self,
        id: Ref,
        new_parent: Option<Ref>,
    ) -> Result<(Ref, Vec<(Ref, Ref)>), DomError> {
        if !self.nodes.contains_key(&id) {
            return Err(DomError::NotFound { id });
        }
        if let Some(parent) = new_parent {
            if !self.nodes.contains_key(&parent) {
                return Err(DomError::NotFound { id: parent });
            }
        }

        let mut pairs = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((id, new_parent));

        while let Some((original_id, parent)) = queue.pop_front() {
            let original = self
                .nodes
                .get(&original_id)
                .ok_or(DomError::NotFound { id: original_id })?;

            let name = original.name.clone();
            let transform = original.transform;
            let components = original.components.clone();
            let children = original.children.clone();

            let copy_id = self.next_ref();
            self.nodes.insert(
                copy_id,
                Node {
                    id: copy_id,
                    parent,
                    children: Vec::new(),
                    name,
                    transform,
                    components,
                },
            );
            self.attach(copy_id, parent);
            pairs.push((original_id, copy_id));

            queue.extend(children.into_iter().map(|child| (child, Some(copy_id))));
        }

        Ok((pairs[0].1, pairs))
    }
}

pub struct Ancestors<'a> {
    dom: &'a RigDom,
    next: Option<Ref>,
}

impl Iterator for Ancestors<'_> {
    type Item = Ref;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.dom.nodes.get(&current).and_then(Node::parent);
        Some(current)
    }
}

pub struct Descendants<'a> {
    dom: &'a RigDom,
    queue: VecDeque<Ref>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.queue.pop_front()?;

            if let Some(node) = self.dom.nodes.get(&id) {
                self.queue.extend(node.children.iter().copied());
                return Some(node);
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct DomDocument {
    roots: Vec<Ref>,
    nodes: Vec<Node>,
}

impl From<RigDom> for DomDocument {
    fn from(dom: RigDom) -> Self {
        // Sorted so that serialized scenes are stable.
        let nodes: BTreeMap<Ref, Node> = dom.nodes.into_iter().collect();

        DomDocument {
            roots: dom.roots,
            nodes: nodes.into_values().collect(),
        }
    }
}

impl TryFrom<DomDocument> for RigDom {
    type Error = DomError;

    fn try_from(document: DomDocument) -> Result<Self, Self::Error> {
        let mut dom = RigDom::new();

        for node in document.nodes {
            let id = node.id;
            dom.next_id = dom.next_id.max(id.to_raw());

            if dom.nodes.insert(id, node).is_some() {
                return Err(DomError::DuplicateId { id });
            }
        }

        for node in dom.nodes.values() {
            if let Some(parent) = node.parent {
                let listed = dom
                    .nodes
                    .get(&parent)
                    .map(|parent| parent.children.contains(&node.id))
                    .unwrap_or(false);

                if !listed {
                    return Err(DomError::InconsistentParent {
                        id: node.id,
                        parent,
                    });
                }
            }

            for &child in &node.children {
                let parent = dom
                    .nodes
                    .get(&child)
                    .ok_or(DomError::NotFound { id: child })?
                    .parent;

                if parent != Some(node.id) {
                    return Err(DomError::InconsistentChild { id: node.id, child });
                }
            }
        }

        // Every node must hang off exactly one root, which rules out cycles.
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for &root in &document.roots {
            let node = dom.nodes.get(&root).ok_or(DomError::NotFound { id: root })?;
            if node.parent.is_some() {
                return Err(DomError::RootHasParent { id: root });
            }
            queue.push_back(root);
        }

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                return Err(DomError::Unreachable { id });
            }
            if let Some(node) = dom.nodes.get(&id) {
                queue.extend(node.children.iter().copied());
            }
        }

        if let Some(&id) = dom.nodes.keys().find(|id| !visited.contains(id)) {
            return Err(DomError::Unreachable { id });
        }

        dom.roots = document.roots;

        Ok(dom)
    }
}
