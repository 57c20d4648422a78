//! Seed script for the travel admin store.
//!
//! Creates the admin account and a handful of sample places with their
//! homestays, hotels and nearby sights. Safe to re-run: existing places are
//! skipped, as are places that already have a document of a kind.
//!
//! Run: ADMIN_EMAIL=... ADMIN_PASSWORD=... cargo run --bin load_data

use serde_json::json;
use tracing::{info, warn};

use travel_admin::auth::Authenticator;
use travel_admin::catalog::Catalog;
use travel_admin::config::{AdminSeed, Config};
use travel_admin::error::StoreError;
use travel_admin::logging::{self, LogSettings};
use travel_admin::models::{Homestay, Hotel, NearbyPlace, NestedRecord, PlaceInput};
use travel_admin::storage::Storage;

/// Create the document unless the place already has one, so re-runs do not duplicate entries.
fn seed_collection<R: NestedRecord>(catalog: &Catalog, body: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    let place = body["place"].as_str().unwrap_or_default();
    if catalog.find_by_place::<R>(place)?.is_some() {
        info!(kind = R::KIND, place, "document exists, skipped");
        return Ok(());
    }

    let input: R::Input = serde_json::from_value(body)?;
    let (doc, created) = catalog.merge_create::<R>(input)?;
    info!(kind = R::KIND, place = doc.place(), created, entries = doc.items().len(), "loaded");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let _log_guard = logging::init(&LogSettings::from_env());

    let config = Config::load();
    let catalog = Catalog::new(Storage::open(&config.data_dir)?);
    let auth = Authenticator::new(config.jwt_secret.as_bytes(), config.token_ttl_secs, config.bcrypt_cost);

    let admin_seed = config.admin.clone().unwrap_or_else(|| {
        warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, seeding admin@travel.local / admin");
        AdminSeed {
            email: "admin@travel.local".to_string(),
            password: "admin".to_string(),
            name: "Admin".to_string(),
        }
    });
    if catalog.ensure_admin(&auth, &admin_seed)? {
        info!(email = %admin_seed.email, "admin created");
    }

    let places = [
        ("Goa", "December", "Beaches, forts and seafood", 5000.0, "https://goa.gov.in"),
        ("Jaipur", "November", "Forts and palaces of the Pink City", 4000.0, "https://tourism.rajasthan.gov.in"),
        ("Leh", "July", "High-altitude desert and monasteries", 8000.0, "https://leh.nic.in"),
    ];
    for (name, month, about, minbudget, official) in places {
        let input = PlaceInput {
            placename: Some(name.to_string()),
            month: Some(month.to_string()),
            about: Some(about.to_string()),
            minbudget: Some(minbudget),
            official: Some(official.to_string()),
        };
        match catalog.create_place(input) {
            Ok(place) => info!(id = %place.id, placename = %place.placename, "place loaded"),
            Err(StoreError::Conflict(_)) => info!(placename = name, "place exists, skipped"),
            Err(e) => return Err(e.into()),
        }
    }

    seed_collection::<Homestay>(&catalog, json!({
        "place": "Goa",
        "stays": [
            {"name": "Casa Anjuna", "rating": 4.5, "budget": 2500},
            {"name": "Palolem Huts", "rating": 4, "budget": 1200}
        ]
    }))?;
    seed_collection::<Hotel>(&catalog, json!({
        "place": "Jaipur",
        "hotels": [
            {"name": "Rambagh Palace", "rating": 5, "budget": 30000},
            {"name": "Zostel Jaipur", "rating": 4, "budget": 900}
        ]
    }))?;
    seed_collection::<NearbyPlace>(&catalog, json!({
        "place": "Jaipur",
        "tovisit": [
            {"name": "Amber Fort", "budget": 200, "opening": "08:00", "closing": "17:30", "rules": "No drones"},
            {"name": "Hawa Mahal", "budget": 50, "opening": "09:00", "closing": "17:00", "rules": ""}
        ]
    }))?;
    seed_collection::<NearbyPlace>(&catalog, json!({
        "place": "Leh",
        "tovisit": [{"name": "Pangong Lake", "budget": 0, "opening": "", "closing": "", "rules": "Permit required"}]
    }))?;

    catalog.storage().flush()?;
    println!("Loaded sample data into {}", config.data_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_a_collection_twice_keeps_one_copy() {
        let catalog = Catalog::new(Storage::temporary().unwrap());
        let body = json!({"place": "Goa", "stays": [{"name": "Casa Anjuna", "rating": 4.5, "budget": 2500}]});

        seed_collection::<Homestay>(&catalog, body.clone()).unwrap();
        seed_collection::<Homestay>(&catalog, body).unwrap();

        let all = catalog.list::<Homestay>().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].stays.len(), 1);
    }
}
