//! Domain operations of the admin backend on top of the record access layer:
//! place CRUD, merge-on-create for the nested collections, nested-item
//! removal, admin login and profile creation.

use chrono::Utc;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::config::AdminSeed;
use crate::error::StoreError;
use crate::models::{
    required, AdminCredential, NestedInput, NestedItem, NestedRecord, Place, PlaceInput, Profile, ProfileInput,
};
use crate::storage::{Record, Storage};

/// How a nested entry is addressed in a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    /// The entry's own id.
    Id(Uuid),
    /// Zero-based position, as sent by older dashboard builds.
    Index(usize),
}

impl FromStr for ItemRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = Uuid::parse_str(s) {
            return Ok(ItemRef::Id(id));
        }
        s.parse::<usize>()
            .map(ItemRef::Index)
            .map_err(|_| StoreError::Invalid(format!("Invalid item reference '{s}'")))
    }
}

fn conflict_as(message: &str) -> impl Fn(StoreError) -> StoreError + '_ {
    move |err| match err {
        StoreError::Conflict(_) => StoreError::Conflict(message.to_string()),
        other => other,
    }
}

fn validate_items<I: NestedItem>(items: &[I]) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for item in items {
        item.validate()?;
        if !seen.insert(item.id()) {
            return Err(StoreError::Invalid(format!("Duplicate item id {}", item.id())));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct Catalog {
    storage: Storage,
}

impl Catalog {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    // --- Generic reads ---

    pub fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        self.storage.collection::<T>()?.find_all()
    }

    pub fn get<T: Record>(&self, id: Uuid) -> Result<T, StoreError> {
        self.storage.collection::<T>()?.find_by_id(id)?.ok_or(StoreError::NotFound)
    }

    /// Document of kind `R` for `place`, matched case-insensitively.
    pub fn find_by_place<R: NestedRecord>(&self, place: &str) -> Result<Option<R>, StoreError> {
        self.storage.collection::<R>()?.find_by_place(place)
    }

    // --- Places ---

    pub fn create_place(&self, input: PlaceInput) -> Result<Place, StoreError> {
        let place = Place::from_input(input)?;
        let place = self
            .storage
            .collection::<Place>()?
            .create(place)
            .map_err(conflict_as("Place already exists"))?;
        info!(id = %place.id, placename = %place.placename, "place created");
        Ok(place)
    }

    pub fn update_place(&self, id: Uuid, patch: PlaceInput) -> Result<Place, StoreError> {
        self.storage
            .collection::<Place>()?
            .update(id, |place| place.apply(&patch))
            .map_err(conflict_as("Place already exists"))
    }

    /// Succeeds whether or not the place existed.
    pub fn delete_place(&self, id: Uuid) -> Result<(), StoreError> {
        if self.storage.collection::<Place>()?.delete(id)?.is_none() {
            warn!(%id, "delete of unknown place");
        }
        Ok(())
    }

    // --- Nested collections ---

    /// Append the submitted items to the document for the same place, or
    /// create that document. Returns the document and whether it is new.
    pub fn merge_create<R: NestedRecord>(&self, input: R::Input) -> Result<(R, bool), StoreError> {
        let invalid = || StoreError::Invalid(format!("Invalid {} data.", R::KIND.to_lowercase()));
        let (place, items) = input.into_parts();
        let place = required("place", place).map_err(|_| invalid())?;
        let mut items = items.ok_or_else(invalid)?;

        // Appended entries never reuse client-supplied ids.
        for item in &mut items {
            item.set_id(Uuid::new_v4());
        }
        validate_items(&items)?;

        let (record, created) = self.storage.collection::<R>()?.upsert_by_place(
            &place,
            || R::new(place.clone(), items.clone()),
            |existing| {
                existing.items_mut().extend(items.iter().cloned());
                existing.touch();
                Ok(())
            },
        )?;
        info!(
            kind = R::KIND,
            id = %record.id(),
            created,
            added = items.len(),
            total = record.items().len(),
            "nested collection merged"
        );
        Ok((record, created))
    }

    /// Field merge: replaces the place name and/or the whole item list.
    pub fn replace<R: NestedRecord>(&self, id: Uuid, input: R::Input) -> Result<R, StoreError> {
        let (place, items) = input.into_parts();
        let place = match place {
            Some(place) => Some(required("place", Some(place))?),
            None => None,
        };
        if let Some(items) = &items {
            validate_items(items)?;
        }

        self.storage
            .collection::<R>()?
            .update(id, |record| {
                if let Some(place) = &place {
                    record.set_place(place.clone());
                }
                if let Some(items) = &items {
                    *record.items_mut() = items.clone();
                }
                record.touch();
                Ok(())
            })
            .map_err(conflict_as(&format!("{} for this place already exists", R::KIND)))
    }

    /// Remove a whole document; `NotFound` if absent.
    pub fn delete<R: NestedRecord>(&self, id: Uuid) -> Result<R, StoreError> {
        let removed = self.storage.collection::<R>()?.delete(id)?.ok_or(StoreError::NotFound)?;
        info!(kind = R::KIND, %id, "document deleted");
        Ok(removed)
    }

    /// Remove one nested entry and return the updated parent.
    pub fn remove_item<R: NestedRecord>(&self, id: Uuid, item: ItemRef) -> Result<R, StoreError> {
        let updated = self.storage.collection::<R>()?.update(id, |record| {
            let position = match item {
                ItemRef::Index(index) if index < record.items().len() => index,
                ItemRef::Index(_) => {
                    return Err(StoreError::Invalid(format!("Invalid {} index", R::ITEM_KIND)));
                }
                ItemRef::Id(item_id) => record
                    .items()
                    .iter()
                    .position(|entry| entry.id() == item_id)
                    .ok_or_else(|| StoreError::MissingEntry(format!("{} {item_id} not found", R::ITEM_KIND)))?,
            };
            record.items_mut().remove(position);
            record.touch();
            Ok(())
        })?;
        info!(kind = R::KIND, %id, ?item, "nested entry removed");
        Ok(updated)
    }

    // --- Admins ---

    /// Look up the admin by email and verify the password. `None` on any mismatch.
    pub fn authenticate(
        &self,
        auth: &Authenticator,
        email: &str,
        password: &str,
    ) -> Result<Option<AdminCredential>, StoreError> {
        let admin = self.storage.collection::<AdminCredential>()?.find_by_key(email)?;
        let stored = admin.as_ref().map(|a| a.password_hash.as_str());
        if auth.check_password(password, stored) {
            Ok(admin)
        } else {
            Ok(None)
        }
    }

    pub fn admin(&self, id: Uuid) -> Result<Option<AdminCredential>, StoreError> {
        self.storage.collection::<AdminCredential>()?.find_by_id(id)
    }

    /// Create the configured admin unless one with that email exists.
    /// Returns `true` when a credential was written.
    pub fn ensure_admin(&self, auth: &Authenticator, seed: &AdminSeed) -> Result<bool, StoreError> {
        let admins = self.storage.collection::<AdminCredential>()?;
        if admins.find_by_key(&seed.email)?.is_some() {
            return Ok(false);
        }

        let email = required("email", Some(seed.email.clone()))?;
        let password_hash = auth
            .hash_password(&seed.password)
            .map_err(|e| StoreError::Invalid(format!("Cannot hash admin password: {e}")))?;
        let admin = AdminCredential {
            id: Uuid::now_v7(),
            email,
            name: seed.name.clone(),
            password_hash,
            created_at: Utc::now(),
        };
        match admins.create(admin) {
            Ok(admin) => {
                info!(email = %admin.email, "admin credential created");
                Ok(true)
            }
            // Created concurrently by another process.
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // --- Profiles ---

    pub fn create_profile(&self, input: ProfileInput) -> Result<Profile, StoreError> {
        let profile = Profile::from_input(input)?;
        let profile = self
            .storage
            .collection::<Profile>()?
            .create(profile)
            .map_err(conflict_as("Username already taken"))?;
        info!(id = %profile.id, "profile created");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Homestay, HomestayInput, Hotel, HotelInput, Lodging, NearbyPlace, NearbyPlaceInput, Visit};

    fn catalog() -> Catalog {
        Catalog::new(Storage::temporary().unwrap())
    }

    fn stay(name: &str, rating: f64, budget: f64) -> Lodging {
        Lodging { id: Uuid::new_v4(), name: name.to_string(), rating, budget }
    }

    fn place(name: &str) -> PlaceInput {
        PlaceInput { placename: Some(name.to_string()), ..Default::default() }
    }

    fn homestay_input(place: &str, stays: Vec<Lodging>) -> HomestayInput {
        HomestayInput { place: Some(place.to_string()), stays: Some(stays) }
    }

    #[test]
    fn item_ref_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(id.to_string().parse::<ItemRef>().unwrap(), ItemRef::Id(id));
        assert_eq!("2".parse::<ItemRef>().unwrap(), ItemRef::Index(2));
        assert!("-1".parse::<ItemRef>().is_err());
        assert!("abc".parse::<ItemRef>().is_err());
    }

    #[test]
    fn duplicate_place_in_any_case_is_a_conflict() {
        let catalog = catalog();
        catalog.create_place(place("Goa")).unwrap();

        let err = catalog.create_place(place(" goa ")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m == "Place already exists"));
        assert_eq!(catalog.list::<Place>().unwrap().len(), 1);
    }

    #[test]
    fn update_place_merges_fields_and_reports_missing() {
        let catalog = catalog();
        let goa = catalog.create_place(place("Goa")).unwrap();

        let updated = catalog
            .update_place(goa.id, PlaceInput { month: Some("December".into()), ..Default::default() })
            .unwrap();
        assert_eq!(updated.placename, "Goa");
        assert_eq!(updated.month, "December");

        let err = catalog.update_place(Uuid::now_v7(), PlaceInput::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn delete_place_is_idempotent() {
        let catalog = catalog();
        let goa = catalog.create_place(place("Goa")).unwrap();
        catalog.delete_place(goa.id).unwrap();
        catalog.delete_place(goa.id).unwrap();
        assert!(catalog.list::<Place>().unwrap().is_empty());
    }

    #[test]
    fn merge_appends_to_existing_place_case_insensitively() {
        let catalog = catalog();
        let (first, created) = catalog
            .merge_create::<Homestay>(homestay_input("Goa", vec![stay("A", 4.0, 1000.0)]))
            .unwrap();
        assert!(created);

        let (merged, created) = catalog
            .merge_create::<Homestay>(homestay_input(
                "GOA",
                vec![stay("B", 5.0, 2000.0), stay("C", 3.0, 800.0)],
            ))
            .unwrap();
        assert!(!created);
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.place, "Goa");
        let names: Vec<_> = merged.stays.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(catalog.list::<Homestay>().unwrap().len(), 1);
        assert_eq!(catalog.find_by_place::<Homestay>(" goa").unwrap().unwrap().id, first.id);
        assert!(catalog.find_by_place::<Hotel>("Goa").unwrap().is_none());
    }

    #[test]
    fn concurrent_merges_onto_one_place_make_one_document() {
        let catalog = catalog();
        let variants = ["Goa", "goa", "GOA", " Goa "];

        std::thread::scope(|scope| {
            for n in 0..16 {
                let catalog = &catalog;
                let place = variants[n % variants.len()];
                scope.spawn(move || {
                    catalog
                        .merge_create::<Homestay>(homestay_input(place, vec![stay(&format!("stay {n}"), 4.0, 100.0)]))
                        .unwrap();
                });
            }
        });

        let all = catalog.list::<Homestay>().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].stays.len(), 16);
        let ids: HashSet<_> = all[0].stays.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn hotels_and_nearby_places_use_the_same_policy() {
        let catalog = catalog();
        let hotel = |place: &str| HotelInput { place: Some(place.to_string()), hotels: Some(vec![stay("Taj", 5.0, 9000.0)]) };
        catalog.merge_create::<Hotel>(hotel("Jaipur")).unwrap();
        let (merged, created) = catalog.merge_create::<Hotel>(hotel("jaipur ")).unwrap();
        assert!(!created);
        assert_eq!(merged.hotels.len(), 2);

        let visit = Visit {
            id: Uuid::new_v4(),
            name: "Amber Fort".into(),
            budget: 200.0,
            opening: "08:00".into(),
            closing: "17:30".into(),
            rules: "No drones".into(),
        };
        let input = NearbyPlaceInput { place: Some("Jaipur".into()), tovisit: Some(vec![visit]) };
        let (nearby, created) = catalog.merge_create::<NearbyPlace>(input).unwrap();
        assert!(created);
        assert_eq!(nearby.tovisit.len(), 1);
    }

    #[test]
    fn merge_rejects_missing_fields() {
        let catalog = catalog();
        let err = catalog
            .merge_create::<Homestay>(HomestayInput { place: Some("Goa".into()), stays: None })
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(ref m) if m == "Invalid homestay data."));

        let err = catalog
            .merge_create::<Homestay>(homestay_input("  ", vec![]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn merged_items_get_fresh_ids() {
        let catalog = catalog();
        let a = stay("A", 4.0, 1000.0);
        let (first, _) = catalog.merge_create::<Homestay>(homestay_input("Goa", vec![a.clone()])).unwrap();
        let (second, _) = catalog.merge_create::<Homestay>(homestay_input("Goa", vec![a])).unwrap();
        assert_ne!(second.stays[0].id, second.stays[1].id);
        assert_eq!(second.stays[0].id, first.stays[0].id);
    }

    #[test]
    fn remove_item_by_index_shifts_the_rest() {
        let catalog = catalog();
        let (doc, _) = catalog
            .merge_create::<Homestay>(homestay_input(
                "Goa",
                vec![stay("A", 4.0, 1.0), stay("B", 4.0, 1.0), stay("C", 4.0, 1.0)],
            ))
            .unwrap();

        let updated = catalog.remove_item::<Homestay>(doc.id, ItemRef::Index(1)).unwrap();
        let names: Vec<_> = updated.stays.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn remove_item_out_of_range_leaves_document_unchanged() {
        let catalog = catalog();
        let (doc, _) = catalog
            .merge_create::<Homestay>(homestay_input("Goa", vec![stay("A", 4.0, 1.0)]))
            .unwrap();

        let err = catalog.remove_item::<Homestay>(doc.id, ItemRef::Index(1)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(ref m) if m == "Invalid stay index"));
        assert_eq!(catalog.get::<Homestay>(doc.id).unwrap().stays, doc.stays);

        let err = catalog.remove_item::<Homestay>(Uuid::now_v7(), ItemRef::Index(0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn remove_item_by_id() {
        let catalog = catalog();
        let (doc, _) = catalog
            .merge_create::<Hotel>(HotelInput {
                place: Some("Ooty".into()),
                hotels: Some(vec![stay("X", 3.0, 1.0), stay("Y", 4.0, 2.0)]),
            })
            .unwrap();
        let y = doc.hotels[1].id;

        let updated = catalog.remove_item::<Hotel>(doc.id, ItemRef::Id(y)).unwrap();
        assert_eq!(updated.hotels.len(), 1);
        assert_eq!(updated.hotels[0].name, "X");

        let err = catalog.remove_item::<Hotel>(doc.id, ItemRef::Id(y)).unwrap_err();
        assert!(matches!(err, StoreError::MissingEntry(_)));
    }

    #[test]
    fn replace_keeps_supplied_ids_and_rejects_duplicates() {
        let catalog = catalog();
        let (doc, _) = catalog
            .merge_create::<Homestay>(homestay_input("Goa", vec![stay("A", 4.0, 1.0)]))
            .unwrap();
        let mut kept = doc.stays[0].clone();
        kept.budget = 1500.0;

        let updated = catalog
            .replace::<Homestay>(doc.id, HomestayInput { place: Some("North Goa".into()), stays: Some(vec![kept.clone()]) })
            .unwrap();
        assert_eq!(updated.place, "North Goa");
        assert_eq!(updated.stays, vec![kept.clone()]);

        let err = catalog
            .replace::<Homestay>(doc.id, HomestayInput { place: None, stays: Some(vec![kept.clone(), kept]) })
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn delete_missing_document_is_not_found() {
        let err = catalog().delete::<NearbyPlace>(Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn admin_login_checks_hash() {
        let catalog = catalog();
        let auth = Authenticator::new(b"test", 60, 4);
        let seed = AdminSeed { email: "ops@travel.in".into(), password: "s3cret".into(), name: "Ops".into() };
        assert!(catalog.ensure_admin(&auth, &seed).unwrap());
        assert!(!catalog.ensure_admin(&auth, &seed).unwrap());

        let admin = catalog.authenticate(&auth, "OPS@travel.in", "s3cret").unwrap().unwrap();
        assert_eq!(admin.email, "ops@travel.in");
        assert!(catalog.authenticate(&auth, "ops@travel.in", "nope").unwrap().is_none());
        assert!(catalog.authenticate(&auth, "who@travel.in", "s3cret").unwrap().is_none());
    }

    #[test]
    fn profile_usernames_are_unique() {
        let catalog = catalog();
        let input: ProfileInput = serde_json::from_value(serde_json::json!({
            "name": "Asha",
            "trips": ["Goa"],
            "personalInfo": {"username": "asha", "email": "a@x.in", "phone": "9876543210"}
        }))
        .unwrap();
        catalog.create_profile(input.clone()).unwrap();
        let err = catalog.create_profile(input).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m == "Username already taken"));
    }
}
