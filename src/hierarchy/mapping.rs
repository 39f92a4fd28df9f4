use std::collections::{BTreeMap, HashMap};

use rig_dom::{Ref, RigDom};
use serde::Serialize;

/// Workspace node -> merged node, in the order pairs were discovered.
///
/// Built once by the first merge pass and read-only afterwards; it is the
/// only thing used to translate workspace references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMapping {
    pairs: Vec<(Ref, Ref)>,
    index: HashMap<Ref, usize>,
}

impl NodeMapping {
    /// Records a pairing. The first pairing recorded for a workspace node
    /// wins.
    pub(super) fn insert(&mut self, workspace: Ref, merged: Ref) -> bool {
        if self.index.contains_key(&workspace) {
            return false;
        }

        self.index.insert(workspace, self.pairs.len());
        self.pairs.push((workspace, merged));
        true
    }

    pub fn get(&self, workspace: Ref) -> Option<Ref> {
        self.index.get(&workspace).map(|&index| self.pairs[index].1)
    }

    pub fn contains(&self, workspace: Ref) -> bool {
        self.index.contains_key(&workspace)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ref, Ref)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Workspace-relative path -> merge-root-relative path, for every workspace
/// node that ended up inside the merge root.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PathMapping {
    paths: BTreeMap<String, String>,
}

impl PathMapping {
    pub fn from_node_mapping(
        dom: &RigDom,
        mapping: &NodeMapping,
        workspace_root: Ref,
        merge_root: Ref,
    ) -> Self {
        let mut paths = BTreeMap::new();

        for (workspace, merged) in mapping.iter() {
            if merged == merge_root || !dom.is_descendant_of(merged, merge_root) {
                continue;
            }

            let source = dom.relative_path(workspace, workspace_root);
            let destination = dom.relative_path(merged, merge_root);

            if let (Some(source), Some(destination)) = (source, destination) {
                log::trace!("Path {:?} -> {:?}", source, destination);
                paths.insert(source, destination);
            }
        }

        PathMapping { paths }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.paths.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, source: impl Into<String>, destination: impl Into<String>) {
        self.paths.insert(source.into(), destination.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths
            .iter()
            .map(|(source, destination)| (source.as_str(), destination.as_str()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>, D: Into<String>> FromIterator<(S, D)> for PathMapping {
    fn from_iter<T: IntoIterator<Item = (S, D)>>(iter: T) -> Self {
        PathMapping {
            paths: iter
                .into_iter()
                .map(|(source, destination)| (source.into(), destination.into()))
                .collect(),
        }
    }
}
