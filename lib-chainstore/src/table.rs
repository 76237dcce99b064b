//! Typed tables with layered undo.
//!
//! A [`Table`] owns its rows plus two indices: a mandatory unique index and an
//! optional ordered index. Mutations record pre-images into the top undo
//! layer; undoing a layer replays those pre-images in reverse.
//!
//! Layer discipline (enforced by the database, not here): one layer per
//! speculative scope — pending transaction, transaction inside a block, whole
//! block. Layers are squashed upward on success and undone on failure.

use std::collections::{BTreeMap, BTreeSet};

use lib_types::ObjectId;

use crate::error::StoreError;

/// A row type stored in a [`Table`].
///
/// `UniqueKey` is the table's business key (account name, author+permlink,
/// ...). `OrderedKey` feeds the secondary ordered index; tables without one
/// use `()` and return `None`.
pub trait StateObject: Clone {
    const TABLE: &'static str;

    type UniqueKey: Ord + Clone;
    type OrderedKey: Ord + Clone;

    fn id(&self) -> ObjectId;
    fn unique_key(&self) -> Self::UniqueKey;

    fn ordered_key(&self) -> Option<Self::OrderedKey> {
        None
    }
}

/// Pre-images recorded by one undo layer.
struct UndoLayer<T> {
    /// Rows created in this layer (undo: delete)
    created: BTreeSet<u64>,
    /// First pre-image of rows modified in this layer (undo: restore)
    modified: BTreeMap<u64, T>,
    /// Pre-image of rows removed in this layer (undo: reinsert)
    removed: BTreeMap<u64, T>,
    /// Id counter at layer start (undo: restore)
    next_id: u64,
}

impl<T> UndoLayer<T> {
    fn new(next_id: u64) -> Self {
        Self {
            created: BTreeSet::new(),
            modified: BTreeMap::new(),
            removed: BTreeMap::new(),
            next_id,
        }
    }
}

/// Object-safe view of a table used by the database-level session driver.
pub trait UndoableTable {
    fn push_layer(&mut self);
    fn undo(&mut self);
    fn squash(&mut self);
    fn commit_one(&mut self);
    fn undo_depth(&self) -> usize;
}

/// One typed table of the versioned store.
pub struct Table<T: StateObject> {
    rows: BTreeMap<u64, T>,
    unique: BTreeMap<T::UniqueKey, u64>,
    ordered: BTreeSet<(T::OrderedKey, u64)>,
    next_id: u64,
    layers: Vec<UndoLayer<T>>,
}

impl<T: StateObject> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StateObject> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            unique: BTreeMap::new(),
            ordered: BTreeSet::new(),
            next_id: 0,
            layers: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.rows.get(&id.raw())
    }

    pub fn find(&self, key: &T::UniqueKey) -> Option<&T> {
        self.unique.get(key).and_then(|id| self.rows.get(id))
    }

    pub fn contains(&self, key: &T::UniqueKey) -> bool {
        self.unique.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in id order (creation order).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    /// Iterate rows in ordered-index order. Rows without an ordered key are
    /// not in this index.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &T> {
        self.ordered.iter().filter_map(|(_, id)| self.rows.get(id))
    }

    /// Iterate rows whose ordered key is >= `from`.
    pub fn iter_ordered_from<'a>(
        &'a self,
        from: &T::OrderedKey,
    ) -> impl Iterator<Item = &'a T> + 'a {
        self.ordered
            .range((from.clone(), 0)..)
            .filter_map(|(_, id)| self.rows.get(id))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Create a row, assigning the next id. Returns a copy of the stored row.
    pub fn create(&mut self, build: impl FnOnce(ObjectId) -> T) -> Result<T, StoreError> {
        let id = self.next_id;
        let row = build(ObjectId::new(id));
        debug_assert_eq!(row.id().raw(), id, "builder must keep the assigned id");

        if self.unique.contains_key(&row.unique_key()) {
            return Err(StoreError::UniqueViolation { table: T::TABLE });
        }

        self.unique.insert(row.unique_key(), id);
        if let Some(ord) = row.ordered_key() {
            self.ordered.insert((ord, id));
        }
        self.rows.insert(id, row.clone());
        self.next_id += 1;

        if let Some(layer) = self.layers.last_mut() {
            layer.created.insert(id);
        }
        Ok(row)
    }

    /// Modify a row in place, maintaining indices and the undo pre-image.
    pub fn modify(
        &mut self,
        id: ObjectId,
        mutate: impl FnOnce(&mut T),
    ) -> Result<(), StoreError> {
        let raw = id.raw();
        let row = self.rows.get_mut(&raw).ok_or(StoreError::MissingRow {
            table: T::TABLE,
            id: raw,
        })?;

        let pre = row.clone();
        mutate(row);

        let new_unique = row.unique_key();
        let new_ordered = row.ordered_key();
        let old_unique = pre.unique_key();
        let old_ordered = pre.ordered_key();

        if new_unique != old_unique {
            if self.unique.contains_key(&new_unique) {
                // Roll the row back before reporting; the caller sees no change.
                *self.rows.get_mut(&raw).expect("row exists") = pre;
                return Err(StoreError::UniqueViolation { table: T::TABLE });
            }
            self.unique.remove(&old_unique);
            self.unique.insert(new_unique, raw);
        }
        if new_ordered != old_ordered {
            if let Some(ord) = old_ordered {
                self.ordered.remove(&(ord, raw));
            }
            if let Some(ord) = new_ordered {
                self.ordered.insert((ord, raw));
            }
        }

        if let Some(layer) = self.layers.last_mut() {
            if !layer.created.contains(&raw) {
                layer.modified.entry(raw).or_insert(pre);
            }
        }
        Ok(())
    }

    /// Remove a row.
    pub fn remove(&mut self, id: ObjectId) -> Result<(), StoreError> {
        let raw = id.raw();
        let row = self.rows.remove(&raw).ok_or(StoreError::MissingRow {
            table: T::TABLE,
            id: raw,
        })?;

        self.unique.remove(&row.unique_key());
        if let Some(ord) = row.ordered_key() {
            self.ordered.remove(&(ord, raw));
        }

        if let Some(layer) = self.layers.last_mut() {
            if layer.created.remove(&raw) {
                // Created and removed inside the same layer: net nothing.
            } else {
                let pre = layer.modified.remove(&raw).unwrap_or(row);
                layer.removed.insert(raw, pre);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Index helpers
    // ------------------------------------------------------------------

    fn index_insert(&mut self, row: &T, raw: u64) {
        self.unique.insert(row.unique_key(), raw);
        if let Some(ord) = row.ordered_key() {
            self.ordered.insert((ord, raw));
        }
    }

    fn index_remove(&mut self, row: &T, raw: u64) {
        self.unique.remove(&row.unique_key());
        if let Some(ord) = row.ordered_key() {
            self.ordered.remove(&(ord, raw));
        }
    }
}

impl<T: StateObject> UndoableTable for Table<T> {
    fn push_layer(&mut self) {
        let next_id = self.next_id;
        self.layers.push(UndoLayer::new(next_id));
    }

    /// Roll back the top layer. Creations are deleted first so that their
    /// index entries cannot shadow restored pre-images.
    fn undo(&mut self) {
        let Some(layer) = self.layers.pop() else {
            return;
        };

        for raw in &layer.created {
            if let Some(row) = self.rows.remove(raw) {
                let raw = *raw;
                self.unique.remove(&row.unique_key());
                if let Some(ord) = row.ordered_key() {
                    self.ordered.remove(&(ord, raw));
                }
            }
        }
        for (raw, pre) in layer.modified {
            if let Some(current) = self.rows.get(&raw).cloned() {
                self.index_remove(&current, raw);
            }
            self.index_insert(&pre, raw);
            self.rows.insert(raw, pre);
        }
        for (raw, pre) in layer.removed {
            self.index_insert(&pre, raw);
            self.rows.insert(raw, pre);
        }
        self.next_id = layer.next_id;
    }

    /// Merge the top layer into the one below it, keeping the oldest
    /// pre-images. With a single layer this commits it instead.
    fn squash(&mut self) {
        if self.layers.len() < 2 {
            self.layers.pop();
            return;
        }
        let top = self.layers.pop().expect("len checked");
        let below = self.layers.last_mut().expect("len checked");

        // Ids are never reused, so a row created in `top` cannot collide
        // with anything `below` already tracks.
        below.created.extend(top.created.iter().copied());

        for (raw, pre) in top.modified {
            if below.created.contains(&raw) {
                continue;
            }
            below.modified.entry(raw).or_insert(pre);
        }
        for (raw, pre) in top.removed {
            if below.created.remove(&raw) {
                continue;
            }
            let oldest = below.modified.remove(&raw).unwrap_or(pre);
            below.removed.insert(raw, oldest);
        }
    }

    /// Forget the oldest layer, making its changes permanent.
    fn commit_one(&mut self) {
        if !self.layers.is_empty() {
            self.layers.remove(0);
        }
    }

    fn undo_depth(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: ObjectId,
        name: String,
        rank: u32,
    }

    impl StateObject for Row {
        const TABLE: &'static str = "test_rows";
        type UniqueKey = String;
        type OrderedKey = u32;

        fn id(&self) -> ObjectId {
            self.id
        }

        fn unique_key(&self) -> String {
            self.name.clone()
        }

        fn ordered_key(&self) -> Option<u32> {
            Some(self.rank)
        }
    }

    fn row(id: ObjectId, name: &str, rank: u32) -> Row {
        Row {
            id,
            name: name.to_string(),
            rank,
        }
    }

    #[test]
    fn create_find_modify_remove() {
        let mut t: Table<Row> = Table::new();
        let a = t.create(|id| row(id, "alpha", 3)).unwrap();
        t.create(|id| row(id, "beta", 1)).unwrap();

        assert!(t.create(|id| row(id, "alpha", 9)).is_err());
        assert_eq!(t.find(&"alpha".to_string()).unwrap().rank, 3);

        t.modify(a.id(), |r| r.rank = 0).unwrap();
        let ordered: Vec<_> = t.iter_ordered().map(|r| r.name.clone()).collect();
        assert_eq!(ordered, vec!["alpha", "beta"]);

        t.remove(a.id()).unwrap();
        assert!(t.find(&"alpha".to_string()).is_none());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn undo_restores_everything() {
        let mut t: Table<Row> = Table::new();
        let a = t.create(|id| row(id, "alpha", 3)).unwrap();
        let b = t.create(|id| row(id, "beta", 1)).unwrap();

        t.push_layer();
        t.modify(a.id(), |r| r.rank = 99).unwrap();
        t.remove(b.id()).unwrap();
        t.create(|id| row(id, "gamma", 7)).unwrap();
        t.undo();

        assert_eq!(t.len(), 2);
        assert_eq!(t.get(a.id()).unwrap().rank, 3);
        assert_eq!(t.find(&"beta".to_string()).unwrap().id(), b.id());
        assert!(t.find(&"gamma".to_string()).is_none());

        // Id counter rolled back: the next creation reuses no gap
        let c = t.create(|id| row(id, "delta", 2)).unwrap();
        assert_eq!(c.id().raw(), 2);
    }

    #[test]
    fn squash_keeps_oldest_preimage() {
        let mut t: Table<Row> = Table::new();
        let a = t.create(|id| row(id, "alpha", 3)).unwrap();

        t.push_layer();
        t.modify(a.id(), |r| r.rank = 10).unwrap();
        t.push_layer();
        t.modify(a.id(), |r| r.rank = 20).unwrap();
        t.squash();
        t.undo();

        assert_eq!(t.get(a.id()).unwrap().rank, 3);
    }

    #[test]
    fn create_then_remove_in_one_layer_is_nothing() {
        let mut t: Table<Row> = Table::new();
        t.push_layer();
        let a = t.create(|id| row(id, "alpha", 3)).unwrap();
        t.remove(a.id()).unwrap();
        t.undo();
        assert!(t.is_empty());
    }

    #[test]
    fn unique_key_swap_within_layer_undoes_cleanly() {
        let mut t: Table<Row> = Table::new();
        let a = t.create(|id| row(id, "alpha", 1)).unwrap();

        t.push_layer();
        t.remove(a.id()).unwrap();
        t.create(|id| row(id, "alpha", 2)).unwrap();
        t.undo();

        let restored = t.find(&"alpha".to_string()).unwrap();
        assert_eq!(restored.id(), a.id());
        assert_eq!(restored.rank, 1);
    }
}
