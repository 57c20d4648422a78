use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};
use sled::{Db, Transactional, Tree};
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::normalize_key;

/// A document kind persisted in its own Sled tree.
///
/// Records are stored as JSON under their 16-byte id. A record with a
/// `unique_key` also owns an entry `key -> id` in the `<TREE>_by_key` index
/// tree; index and record are always written in one transaction.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TREE: &'static str;

    fn id(&self) -> Uuid;

    /// Normalised unique key, e.g. the lowercased place name.
    fn unique_key(&self) -> Option<String>;
}

/// Handle on the embedded document store. Cheap to clone (Sled internals are Arc'd).
#[derive(Clone)]
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open or create the Sled database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory database removed on drop; used by tests and dry runs.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Typed access to the tree holding records of kind `T`.
    pub fn collection<T: Record>(&self) -> Result<Collection<T>, StoreError> {
        let records = self.db.open_tree(T::TREE)?;
        let index = self.db.open_tree(format!("{}_by_key", T::TREE))?;
        Ok(Collection {
            records,
            index,
            _kind: PhantomData,
        })
    }

    /// Flush dirty pages to disk; called on graceful shutdown.
    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }
}

/// Record access layer for one kind.
pub struct Collection<T> {
    records: Tree,
    index: Tree,
    _kind: PhantomData<T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            index: self.index.clone(),
            _kind: PhantomData,
        }
    }
}

fn abort<R>(err: StoreError) -> ConflictableTransactionResult<R, StoreError> {
    Err(ConflictableTransactionError::Abort(err))
}

fn decode<T: Record>(bytes: &[u8]) -> ConflictableTransactionResult<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

fn encode<T: Record>(record: &T) -> ConflictableTransactionResult<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

/// Claim `key` for `id` in the index, failing if another record owns it.
fn claim_key(
    index: &TransactionalTree,
    key: &str,
    id: Uuid,
) -> ConflictableTransactionResult<(), StoreError> {
    if let Some(owner) = index.get(key.as_bytes())? {
        if owner.as_ref() != id.as_bytes() {
            return abort(StoreError::Conflict(format!("'{key}' already exists")));
        }
    }
    index.insert(key.as_bytes(), &id.as_bytes()[..])?;
    Ok(())
}

impl<T: Record> Collection<T> {
    /// All records in id order, which for v7 ids is creation order.
    pub fn find_all(&self) -> Result<Vec<T>, StoreError> {
        let mut all = vec![];
        for item in self.records.iter() {
            let (_, value) = item?;
            all.push(serde_json::from_slice(&value)?);
        }
        Ok(all)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lookup of place-keyed records by place name, any case.
    pub fn find_by_place(&self, name: &str) -> Result<Option<T>, StoreError> {
        self.find_by_key(name)
    }

    /// Lookup through the unique-key index; `name` is normalised first.
    pub fn find_by_key(&self, name: &str) -> Result<Option<T>, StoreError> {
        let key = normalize_key(name);
        match self.index.get(key.as_bytes())? {
            Some(id) => {
                let id = Uuid::from_slice(&id).map_err(|e| StoreError::Invalid(e.to_string()))?;
                self.find_by_id(id)
            }
            None => Ok(None),
        }
    }

    /// Insert a new record; `Conflict` if its unique key is already taken.
    pub fn create(&self, record: T) -> Result<T, StoreError> {
        let id = record.id();
        (&self.records, &self.index)
            .transaction(|(records, index)| -> ConflictableTransactionResult<(), StoreError> {
                if let Some(key) = record.unique_key() {
                    if index.get(key.as_bytes())?.is_some() {
                        return abort(StoreError::Conflict(format!("'{key}' already exists")));
                    }
                    index.insert(key.as_bytes(), &id.as_bytes()[..])?;
                }
                records.insert(&id.as_bytes()[..], encode(&record)?)?;
                Ok(())
            })?;
        debug!(tree = T::TREE, %id, "record created");
        Ok(record)
    }

    /// Transactional read-modify-write of one record.
    ///
    /// `f` may run more than once when the transaction is retried, so it must
    /// only mutate the record it is handed. The index follows key changes.
    pub fn update<F>(&self, id: Uuid, f: F) -> Result<T, StoreError>
    where
        F: Fn(&mut T) -> Result<(), StoreError>,
    {
        let updated = (&self.records, &self.index)
            .transaction(|(records, index)| -> ConflictableTransactionResult<T, StoreError> {
                let Some(bytes) = records.get(&id.as_bytes()[..])? else {
                    return abort(StoreError::NotFound);
                };
                let mut record: T = decode(&bytes)?;
                let old_key = record.unique_key();
                f(&mut record).map_err(ConflictableTransactionError::Abort)?;
                let new_key = record.unique_key();

                if old_key != new_key {
                    if let Some(key) = &new_key {
                        claim_key(index, key, id)?;
                    }
                    if let Some(key) = &old_key {
                        index.remove(key.as_bytes())?;
                    }
                }
                records.insert(&id.as_bytes()[..], encode(&record)?)?;
                Ok(record)
            })?;
        debug!(tree = T::TREE, %id, "record updated");
        Ok(updated)
    }

    /// Merge into the record owning `name`, or create one.
    ///
    /// Returns the stored record and `true` when it was newly created.
    pub fn upsert_by_place<C, M>(&self, name: &str, create: C, merge: M) -> Result<(T, bool), StoreError>
    where
        C: Fn() -> T,
        M: Fn(&mut T) -> Result<(), StoreError>,
    {
        let key = normalize_key(name);
        let (record, created) = (&self.records, &self.index)
            .transaction(|(records, index)| -> ConflictableTransactionResult<(T, bool), StoreError> {
                if let Some(owner) = index.get(key.as_bytes())? {
                    if let Some(bytes) = records.get(&owner)? {
                        let mut record: T = decode(&bytes)?;
                        merge(&mut record).map_err(ConflictableTransactionError::Abort)?;
                        records.insert(owner.clone(), encode(&record)?)?;
                        return Ok((record, false));
                    }
                }

                let record = create();
                let id = record.id();
                index.insert(key.as_bytes(), &id.as_bytes()[..])?;
                records.insert(&id.as_bytes()[..], encode(&record)?)?;
                Ok((record, true))
            })?;
        debug!(tree = T::TREE, id = %record.id(), created, "record upserted");
        Ok((record, created))
    }

    /// Remove a record and its index entry. `None` if nothing was stored under `id`.
    pub fn delete(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let removed = (&self.records, &self.index)
            .transaction(|(records, index)| -> ConflictableTransactionResult<Option<T>, StoreError> {
                let Some(bytes) = records.remove(&id.as_bytes()[..])? else {
                    return Ok(None);
                };
                let record: T = decode(&bytes)?;
                if let Some(key) = record.unique_key() {
                    index.remove(key.as_bytes())?;
                }
                Ok(Some(record))
            })?;
        debug!(tree = T::TREE, %id, removed = removed.is_some(), "record delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Place, PlaceInput};

    fn place(name: &str) -> Place {
        Place::from_input(PlaceInput {
            placename: Some(name.to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn places() -> Collection<Place> {
        Storage::temporary().unwrap().collection::<Place>().unwrap()
    }

    #[test]
    fn create_and_find_by_id_and_name() {
        let places = places();
        let goa = places.create(place("Goa")).unwrap();

        assert_eq!(places.find_by_id(goa.id).unwrap().unwrap().placename, "Goa");
        assert_eq!(places.find_by_place("  GOA ").unwrap().unwrap().id, goa.id);
        assert!(places.find_by_id(Uuid::now_v7()).unwrap().is_none());
        assert!(places.find_by_place("Ooty").unwrap().is_none());
    }

    #[test]
    fn create_rejects_taken_key_without_writing() {
        let places = places();
        places.create(place("Goa")).unwrap();

        let err = places.create(place("goa")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(places.find_all().unwrap().len(), 1);
    }

    #[test]
    fn find_all_is_in_creation_order() {
        let places = places();
        for name in ["Goa", "Ooty", "Leh"] {
            places.create(place(name)).unwrap();
        }
        let names: Vec<_> = places.find_all().unwrap().into_iter().map(|p| p.placename).collect();
        assert_eq!(names, ["Goa", "Ooty", "Leh"]);
    }

    #[test]
    fn update_rekeys_the_index() {
        let places = places();
        let goa = places.create(place("Goa")).unwrap();
        let ooty = places.create(place("Ooty")).unwrap();

        places
            .update(goa.id, |p| {
                p.placename = "Panaji".to_string();
                Ok(())
            })
            .unwrap();
        assert!(places.find_by_key("goa").unwrap().is_none());
        assert_eq!(places.find_by_key("panaji").unwrap().unwrap().id, goa.id);

        let err = places
            .update(ooty.id, |p| {
                p.placename = "PANAJI".to_string();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(places.find_by_id(ooty.id).unwrap().unwrap().placename, "Ooty");
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let err = places().update(Uuid::now_v7(), |_| Ok(())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn upsert_creates_then_merges() {
        let places = places();
        let (first, created) = places
            .upsert_by_place("Goa", || place("Goa"), |_| Ok(()))
            .unwrap();
        assert!(created);

        let (second, created) = places
            .upsert_by_place(
                "goa",
                || place("goa"),
                |p| {
                    p.about = "beaches".to_string();
                    Ok(())
                },
            )
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(places.find_by_id(first.id).unwrap().unwrap().about, "beaches");
    }

    #[test]
    fn delete_frees_the_key() {
        let places = places();
        let goa = places.create(place("Goa")).unwrap();

        assert_eq!(places.delete(goa.id).unwrap().unwrap().id, goa.id);
        assert!(places.delete(goa.id).unwrap().is_none());
        assert!(places.find_all().unwrap().is_empty());
        places.create(place("Goa")).unwrap();
    }
}
