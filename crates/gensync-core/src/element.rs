//! Data objects and the element set they live in.

use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::ElementId;

/// An opaque unit of application data.
///
/// Identity is by content: two objects holding the same bytes are the same
/// element as far as reconciliation is concerned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataObject(Bytes);

impl DataObject {
    /// Wrap raw bytes.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self(content.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Content address of this element.
    pub fn id(&self) -> ElementId {
        ElementId::hash(&self.0)
    }
}

impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "DataObject({:?})", s),
            Err(_) => write!(f, "DataObject(0x{})", hex::encode(&self.0)),
        }
    }
}

impl From<char> for DataObject {
    fn from(c: char) -> Self {
        let mut buf = [0u8; 4];
        Self(Bytes::copy_from_slice(c.encode_utf8(&mut buf).as_bytes()))
    }
}

impl From<&str> for DataObject {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for DataObject {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&[u8]> for DataObject {
    fn from(b: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for DataObject {
    fn from(b: Vec<u8>) -> Self {
        Self(Bytes::from(b))
    }
}

impl From<Bytes> for DataObject {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

/// The local collection of elements to reconcile.
///
/// Set semantics: adding a content-equal element twice is a no-op. Iteration
/// order is not part of the contract. Not synchronized; the session that owns
/// it is its only reader and writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSet {
    elements: BTreeSet<DataObject>,
}

impl ElementSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element. Returns false if an equal element was already present.
    pub fn add(&mut self, element: impl Into<DataObject>) -> bool {
        self.elements.insert(element.into())
    }

    /// Visit each element exactly once.
    pub fn contents(&self) -> impl Iterator<Item = &DataObject> {
        self.elements.iter()
    }

    pub fn contains(&self, element: &DataObject) -> bool {
        self.elements.contains(element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Content addresses of every element, paired with the element.
    pub fn ids(&self) -> impl Iterator<Item = (ElementId, &DataObject)> {
        self.elements.iter().map(|e| (e.id(), e))
    }

    /// Order-independent digest of the whole set.
    ///
    /// Two sets with equal contents have equal digests.
    pub fn digest(&self) -> ElementId {
        let mut ids: Vec<ElementId> = self.elements.iter().map(DataObject::id).collect();
        ids.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"gensync-set-v0:");
        hasher.update(&(ids.len() as u64).to_be_bytes());
        for id in &ids {
            hasher.update(id.as_bytes());
        }
        ElementId(*hasher.finalize().as_bytes())
    }
}

impl<T: Into<DataObject>> FromIterator<T> for ElementSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = ElementSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Into<DataObject>> Extend<T> for ElementSet {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.add(element);
        }
    }
}

impl IntoIterator for ElementSet {
    type Item = DataObject;
    type IntoIter = std::collections::btree_set::IntoIter<DataObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
