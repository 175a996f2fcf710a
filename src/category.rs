//! Bidirectional mapping between category identifiers and dense slots.
//!
//! Slots index rows of the regression weight matrix, so they are assigned in
//! first-seen order starting at 0 and never change once assigned. The index is
//! an ordinary value: every classifier, trainer and evaluation trial owns its
//! own instance.
//!
//! # Examples
//!
//! ```
//! use faqcat::category::CategoryIndex;
//!
//! let mut index = CategoryIndex::new();
//! assert!(index.add_category("billing"));
//! assert!(index.add_category("security"));
//! assert!(!index.add_category("billing"));
//!
//! assert_eq!(index.slot_of("security").unwrap(), 1);
//! assert_eq!(index.category_of(0), Some("billing"));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{FaqcatError, Result};
use crate::persistence::{self, BlobKind};

/// Append-only category id ↔ slot mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryIndex {
    /// Category ids by slot.
    categories: Vec<String>,
    /// Inverse of `categories`.
    #[serde(skip)]
    slots: HashMap<String, usize>,
}

impl CategoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a corpus scan, see [`init_from`](Self::init_from).
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut index = Self::new();
        index.init_from(documents);
        index
    }

    /// Register `id`, assigning the next free slot.
    ///
    /// Returns `false` and leaves the index untouched when `id` is already
    /// present.
    pub fn add_category<S: AsRef<str>>(&mut self, id: S) -> bool {
        let id = id.as_ref();
        if self.slots.contains_key(id) {
            return false;
        }
        let slot = self.categories.len();
        self.categories.push(id.to_string());
        self.slots.insert(id.to_string(), slot);
        true
    }

    /// Slot of `id`, or `CategoryNotFound` if it was never added.
    pub fn slot_of(&self, id: &str) -> Result<usize> {
        self.slots
            .get(id)
            .copied()
            .ok_or_else(|| FaqcatError::category_not_found(id))
    }

    /// Like [`slot_of`](Self::slot_of) for callers that treat absence as routine.
    pub fn get_slot(&self, id: &str) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Category occupying `slot`, if any.
    pub fn category_of(&self, slot: usize) -> Option<&str> {
        self.categories.get(slot).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of distinct categories registered.
    pub fn size(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Remove every category. Slots are handed out from 0 again afterwards.
    pub fn clear(&mut self) {
        self.categories.clear();
        self.slots.clear();
    }

    /// Register every label of every document, in corpus order.
    ///
    /// Returns the number of newly added categories.
    pub fn init_from(&mut self, documents: &[Document]) -> usize {
        documents
            .iter()
            .flat_map(|doc| doc.categories.iter())
            .filter(|id| self.add_category(id.as_str()))
            .count()
    }

    /// Category ids in slot order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Iterate over `(slot, id)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.categories
            .iter()
            .enumerate()
            .map(|(slot, id)| (slot, id.as_str()))
    }

    /// Serialize the mapping into a framed blob.
    pub fn persist(&self) -> Result<Vec<u8>> {
        persistence::encode_serde(BlobKind::CategoryIndex, self)
    }

    /// Restore a mapping written by [`persist`](Self::persist).
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let decoded: CategoryIndex = persistence::decode_serde(BlobKind::CategoryIndex, bytes)?;
        Self::from_categories(decoded.categories)
    }

    /// Rebuild an index from ids in slot order. Duplicate ids are rejected
    /// since they would break slot density.
    pub fn from_categories(categories: Vec<String>) -> Result<Self> {
        let mut index = Self::new();
        for id in categories {
            if !index.add_category(&id) {
                return Err(FaqcatError::serialization(format!(
                    "Duplicate category in persisted index: {id}"
                )));
            }
        }
        Ok(index)
    }
}
