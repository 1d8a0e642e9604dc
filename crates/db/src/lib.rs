//! In-memory storage primitives for SHELF.
//!
//! Every store in the application (users, catalog, review ledger) is a thin
//! wrapper around [`Table`], which keeps rows in insertion order behind an
//! `RwLock`. Consistency is per-operation: each call takes the lock once, so
//! a request observes a table state that is atomic with respect to other
//! requests.

use std::sync::RwLock;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Identifier assigned to every stored record.
pub type RecordId = Uuid;

/// Mint a fresh record id. V7 ids carry a timestamp, so ids roughly follow
/// insertion order even across tables.
pub fn new_record_id() -> RecordId {
    Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext))
}

/// Errors surfaced by table writes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a record with that {field} already exists")]
    Duplicate { field: &'static str },
}

/// A stored row: the assigned id plus the entity fields, which serialize
/// flattened into a single JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct Record<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub data: T,
}

/// An insertion-ordered, lock-guarded collection of records.
pub struct Table<T> {
    rows: RwLock<Vec<Record<T>>>,
}

impl<T: Clone> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Append a row, assigning it a fresh id.
    pub fn insert(&self, data: T) -> Record<T> {
        let record = Record {
            id: new_record_id(),
            data,
        };
        self.rows
            .write()
            .expect("table lock poisoned")
            .push(record.clone());
        record
    }

    /// Append a row unless an existing row conflicts with it. The check and
    /// the insert happen under one write lock, so uniqueness holds across
    /// concurrent requests. `field` names the conflicting column in the
    /// returned error.
    pub fn try_insert<F>(
        &self,
        data: T,
        field: &'static str,
        conflicts: F,
    ) -> Result<Record<T>, StoreError>
    where
        F: Fn(&T, &T) -> bool,
    {
        let mut rows = self.rows.write().expect("table lock poisoned");
        if rows.iter().any(|row| conflicts(&row.data, &data)) {
            tracing::debug!(field, "rejected duplicate insert");
            return Err(StoreError::Duplicate { field });
        }
        let record = Record {
            id: new_record_id(),
            data,
        };
        rows.push(record.clone());
        Ok(record)
    }

    pub fn get(&self, id: RecordId) -> Option<Record<T>> {
        self.rows
            .read()
            .expect("table lock poisoned")
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Record<T>> {
        self.rows.read().expect("table lock poisoned").clone()
    }

    /// Rows whose entity matches the predicate, in insertion order.
    pub fn filter<F>(&self, predicate: F) -> Vec<Record<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .read()
            .expect("table lock poisoned")
            .iter()
            .filter(|record| predicate(&record.data))
            .cloned()
            .collect()
    }

    /// First row whose entity matches the predicate.
    pub fn find<F>(&self, predicate: F) -> Option<Record<T>>
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .read()
            .expect("table lock poisoned")
            .iter()
            .find(|record| predicate(&record.data))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().expect("table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct Label {
        name: String,
    }

    fn label(name: &str) -> Label {
        Label {
            name: name.to_string(),
        }
    }

    #[test]
    fn insert_assigns_distinct_ids_and_keeps_order() {
        let table = Table::new();
        let first = table.insert(label("one"));
        let second = table.insert(label("two"));

        assert_ne!(first.id, second.id);
        let all = table.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].data, label("one"));
        assert_eq!(all[1].data, label("two"));
    }

    #[test]
    fn try_insert_rejects_duplicates_and_leaves_table_unchanged() {
        let table = Table::new();
        table
            .try_insert(label("one"), "name", |a, b| a.name == b.name)
            .unwrap();

        let err = table
            .try_insert(label("one"), "name", |a, b| a.name == b.name)
            .unwrap_err();

        assert_eq!(err, StoreError::Duplicate { field: "name" });
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn get_returns_none_for_unknown_id() {
        let table: Table<Label> = Table::new();
        assert!(table.get(new_record_id()).is_none());
    }

    #[test]
    fn filter_matches_in_insertion_order() {
        let table = Table::new();
        table.insert(label("alpha"));
        table.insert(label("beta"));
        table.insert(label("alpine"));

        let matches = table.filter(|row| row.name.starts_with("al"));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].data, label("alpha"));
        assert_eq!(matches[1].data, label("alpine"));
    }

    #[test]
    fn records_serialize_with_flattened_fields() {
        let table = Table::new();
        let record = table.insert(label("one"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "one");
        assert_eq!(value["id"], record.id.to_string());
    }
}
