//! In-memory concert store
//!
//! The store owns every concert the server knows about and is the only
//! place identifiers are issued. It performs no I/O; callers share it across
//! connection tasks through [`SharedStore`], which serializes every operation
//! behind one lock.

use chrono::{DateTime, Utc};
use log::debug;
use shared::{Concert, ConcertId};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub type SharedStore = Arc<RwLock<ConcertStore>>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("concert {0} not found")]
    NotFound(ConcertId),
}

#[derive(Debug)]
pub struct ConcertStore {
    /// Stored concerts keyed by their id; each value's id equals its key
    concerts: HashMap<ConcertId, Concert>,
    /// Id handed to the next successful create
    next_id: ConcertId,
}

impl ConcertStore {
    pub fn new() -> Self {
        Self {
            concerts: HashMap::new(),
            next_id: 1,
        }
    }

    /// Creates an empty store ready to be handed to connection tasks.
    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Stores a new concert under the next identifier and returns it.
    pub fn create(&mut self, title: impl Into<String>, date: DateTime<Utc>) -> Concert {
        let id = self.next_id;
        self.next_id += 1;

        let concert = Concert::with_id(id, title, date);
        debug!("Created concert {} ({})", id, concert.title());
        self.concerts.insert(id, concert.clone());
        concert
    }

    pub fn retrieve(&self, id: ConcertId) -> Result<Concert, StoreError> {
        self.concerts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Replaces the title and date of an existing concert. The id never changes.
    pub fn update(
        &mut self,
        id: ConcertId,
        title: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let concert = self.concerts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        concert.set_title(title);
        concert.set_date(date);
        debug!("Updated concert {}", id);
        Ok(())
    }

    pub fn delete(&mut self, id: ConcertId) -> Result<(), StoreError> {
        if self.concerts.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        debug!("Deleted concert {}", id);
        Ok(())
    }

    /// Snapshot of every stored concert, in no particular order.
    pub fn list(&self) -> Vec<Concert> {
        self.concerts.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        debug!("Clearing {} concerts", self.concerts.len());
        self.concerts.clear();
    }

    pub fn len(&self) -> usize {
        self.concerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concerts.is_empty()
    }
}

impl Default for ConcertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn date(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_store_creation() {
        let store = ConcertStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_create_assigns_ids_from_one() {
        let mut store = ConcertStore::new();

        let first = store.create("One Night of Queen", date(2017, 8, 4, 20));
        let second = store.create("The Selecter and the Beat", date(2018, 1, 25, 20));

        assert_eq!(first.id(), Some(1));
        assert_eq!(second.id(), Some(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut store = ConcertStore::new();
        let mut last = 0;

        for i in 0..100 {
            let concert = store.create(format!("Concert {}", i), date(2020, 1, 1, 20));
            let id = concert.id().unwrap();
            assert!(id > last);
            last = id;
        }

        assert_eq!(last, 100);
    }

    #[test]
    fn test_ids_not_reused_after_delete_or_clear() {
        let mut store = ConcertStore::new();

        let first = store.create("First", date(2020, 1, 1, 20)).id().unwrap();
        store.delete(first).unwrap();
        let second = store.create("Second", date(2020, 1, 2, 20)).id().unwrap();
        store.clear();
        let third = store.create("Third", date(2020, 1, 3, 20)).id().unwrap();

        assert_eq!((first, second, third), (1, 2, 3));
    }

    #[test]
    fn test_retrieve_existing() {
        let mut store = ConcertStore::new();
        let created = store.create("One Night of Queen", date(2017, 8, 4, 20));

        let retrieved = store.retrieve(1).unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_retrieve_missing_is_repeatable() {
        let store = ConcertStore::new();

        for _ in 0..3 {
            assert_eq!(store.retrieve(42), Err(StoreError::NotFound(42)));
        }
    }

    #[test]
    fn test_update_keeps_identity() {
        let mut store = ConcertStore::new();
        store.create("Spend the Night with Alice Cooper", date(2017, 10, 27, 19));

        store
            .update(1, "Spend the Night with Alice Cooper", date(2017, 10, 28, 19))
            .unwrap();

        let updated = store.retrieve(1).unwrap();
        assert_eq!(updated.id(), Some(1));
        assert_eq!(updated.date(), date(2017, 10, 28, 19));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_missing() {
        let mut store = ConcertStore::new();
        let result = store.update(7, "Nobody", date(2017, 1, 1, 0));
        assert_eq!(result, Err(StoreError::NotFound(7)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete() {
        let mut store = ConcertStore::new();
        store.create("The Selecter and the Beat", date(2018, 1, 25, 20));

        assert!(store.delete(1).is_ok());
        assert_eq!(store.delete(1), Err(StoreError::NotFound(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let mut store = ConcertStore::new();
        store.create("One", date(2020, 1, 1, 20));
        store.create("Two", date(2020, 1, 2, 20));

        let snapshot = store.list();
        store.clear();

        let ids: HashSet<ConcertId> = snapshot.iter().filter_map(|c| c.id()).collect();
        assert_eq!(ids, HashSet::from([1, 2]));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_every_value_keyed_by_its_id() {
        let mut store = ConcertStore::new();
        for i in 0..10 {
            store.create(format!("Concert {}", i), date(2020, 1, 1, 20));
        }
        store.delete(4).unwrap();

        for (key, concert) in &store.concerts {
            assert_eq!(concert.id(), Some(*key));
        }
    }

    #[test]
    fn test_clear_empty_store() {
        let mut store = ConcertStore::new();
        store.clear();
        assert!(store.is_empty());
    }
}
