use std::collections::BTreeMap;

use rig_dom::{DomError, NodeBuilder, Ref, RigDom};

use super::{bone_proxy_marker, AttachmentMode, CreationReason, MergeChange};

/// Stand-in nodes under the merge root for bones that already existed on the
/// base. There is at most one proxy per base node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyRegistry {
    proxies: BTreeMap<Ref, Ref>,
}

impl ProxyRegistry {
    pub fn get(&self, target: Ref) -> Option<Ref> {
        self.proxies.get(&target).copied()
    }

    /// `(target, proxy)` pairs, ordered by target.
    pub fn iter(&self) -> impl Iterator<Item = (Ref, Ref)> + '_ {
        self.proxies.iter().map(|(&target, &proxy)| (target, proxy))
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub(super) fn get_or_create(
        &mut self,
        dom: &mut RigDom,
        target: Ref,
        merge_root: Ref,
        changes: &mut Vec<MergeChange>,
    ) -> Result<Ref, DomError> {
        if let Some(proxy) = self.proxies.get(&target) {
            return Ok(*proxy);
        }

        let target_node = dom
            .get_by_ref(target)
            .ok_or(DomError::NotFound { id: target })?;
        let name = format!("{} Proxy", target_node.name);
        let world = dom
            .world_transform(target)
            .ok_or(DomError::NotFound { id: target })?;

        let proxy = dom.insert(
            Some(merge_root),
            NodeBuilder::new(name)
                .with_component(bone_proxy_marker(target, AttachmentMode::AsChildAtRoot)),
        )?;
        dom.set_world_transform(proxy, world)?;

        log::debug!("Created proxy {} for {}", proxy, target);
        changes.push(MergeChange::NodeCreated {
            node: proxy,
            parent: merge_root,
            reason: CreationReason::Proxy { target },
        });

        self.proxies.insert(target, proxy);
        Ok(proxy)
    }
}
