//! Utility that renders DOM subtrees with IDs replaced by node paths, so that
//! trees built in separate runs can be compared with `assert_eq!`.

use rig_dom::{ObjectRef, Ref, References, RigDom, Transform};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub name: String,
    pub transform: Transform,
    pub components: Vec<ComponentView>,
    pub children: Vec<NodeView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentView {
    pub kind: String,
    pub references: Vec<Option<String>>,
}

pub fn view_tree(dom: &RigDom, id: Ref) -> NodeView {
    let node = dom.get_by_ref(id).unwrap();

    NodeView {
        name: node.name.clone(),
        transform: node.transform,
        components: node
            .components()
            .iter()
            .map(|component| ComponentView {
                kind: component.kind.to_string(),
                references: component
                    .references()
                    .iter()
                    .map(|reference| reference.as_ref().map(|r| describe_ref(dom, r)))
                    .collect(),
            })
            .collect(),
        children: node
            .children()
            .iter()
            .map(|&child| view_tree(dom, child))
            .collect(),
    }
}

/// Absolute slash-joined path of a node, starting with its root's name.
pub fn node_path(dom: &RigDom, id: Ref) -> String {
    let mut names: Vec<&str> = std::iter::once(id)
        .chain(dom.ancestors(id))
        .map(|id| dom.get_by_ref(id).unwrap().name.as_str())
        .collect();

    names.reverse();
    names.join("/")
}

pub fn describe_ref(dom: &RigDom, reference: &ObjectRef) -> String {
    match reference {
        ObjectRef::Object { node } => format!("object {}", node_path(dom, *node)),
        ObjectRef::Node { node } => format!("node {}", node_path(dom, *node)),
        ObjectRef::Component { node, kind } => {
            format!("{} on {}", kind, node_path(dom, *node))
        }
        ObjectRef::Asset { asset } => asset.to_string(),
    }
}
