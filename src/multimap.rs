use std::{
    borrow::Borrow,
    collections::{btree_map, BTreeMap},
    fmt::{self, Debug},
};

/// A map whose value contains a set of multiple values, kept in insertion
/// order. Keys iterate in sorted order so that traversals are reproducible.
#[derive(Clone)]
pub struct MultiMap<K, V> {
    inner: BTreeMap<K, Vec<V>>,
}

impl<K: Ord, V: Eq> MultiMap<K, V> {
    pub fn new() -> Self {
        MultiMap {
            inner: BTreeMap::new(),
        }
    }

    pub fn get<Q: ?Sized>(&self, k: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.inner.get(k).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns whether the value was newly added.
    pub fn insert(&mut self, k: K, v: V) -> bool {
        let bucket = self.inner.entry(k).or_default();

        if bucket.contains(&v) {
            return false;
        }

        bucket.push(v);
        true
    }

    pub fn contains_key<Q: ?Sized>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord,
    {
        self.inner.contains_key(k)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Debug, V: Debug> Debug for MultiMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(formatter)
    }
}

impl<K: Ord, V: Eq> PartialEq for MultiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a MultiMap<K, V> {
    type IntoIter = btree_map::Iter<'a, K, Vec<V>>;
    type Item = (&'a K, &'a Vec<V>);

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
