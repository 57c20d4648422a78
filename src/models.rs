use chrono::{DateTime, Utc};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::Record;

/// Normalised form of a unique name: trimmed and lowercased.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn required(field: &str, value: Option<String>) -> Result<String, StoreError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(StoreError::Invalid(format!("{field} is required"))),
    }
}

fn check_amount(field: &str, value: f64) -> Result<(), StoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!("{field} must be a non-negative number")))
    }
}

fn check_rating(value: f64) -> Result<(), StoreError> {
    if (0.0..=5.0).contains(&value) {
        Ok(())
    } else {
        Err(StoreError::Invalid("rating must be between 0 and 5".to_string()))
    }
}

/// Numeric form fields arrive either as JSON numbers or as the text of an input box.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_number<E: de::Error>(self) -> Result<Option<f64>, E> {
        match self {
            NumberOrText::Number(n) => Ok(Some(n)),
            NumberOrText::Text(s) if s.trim().is_empty() => Ok(None),
            NumberOrText::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("'{s}' is not a number"))),
        }
    }
}

/// A number or numeric string; an empty string reads as 0.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(NumberOrText::deserialize(deserializer)?.into_number::<D::Error>()?.unwrap_or_default())
}

/// Like `lenient_number`, but null and an empty string leave the field unset.
fn lenient_opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_number(),
        None => Ok(None),
    }
}

// --- Places ---

/// Top-level travel destination.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Place {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub placename: String,
    pub month: String,
    pub about: String,
    pub minbudget: f64,
    pub official: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /create/mainplace` and `PUT /update/mainplace/:id`.
/// On update only the fields present are changed.
#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct PlaceInput {
    pub placename: Option<String>,
    pub month: Option<String>,
    pub about: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_number")]
    pub minbudget: Option<f64>,
    pub official: Option<String>,
}

impl Place {
    pub fn from_input(input: PlaceInput) -> Result<Self, StoreError> {
        let placename = required("placename", input.placename)?;
        let minbudget = input.minbudget.unwrap_or(0.0);
        check_amount("minbudget", minbudget)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            placename,
            month: input.month.unwrap_or_default(),
            about: input.about.unwrap_or_default(),
            minbudget,
            official: input.official.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: &PlaceInput) -> Result<(), StoreError> {
        if let Some(name) = &patch.placename {
            self.placename = required("placename", Some(name.clone()))?;
        }
        if let Some(month) = &patch.month {
            self.month = month.clone();
        }
        if let Some(about) = &patch.about {
            self.about = about.clone();
        }
        if let Some(minbudget) = patch.minbudget {
            check_amount("minbudget", minbudget)?;
            self.minbudget = minbudget;
        }
        if let Some(official) = &patch.official {
            self.official = official.clone();
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Record for Place {
    const TREE: &'static str = "places";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.placename))
    }
}

// --- Nested collections (homestays, hotels, nearby places) ---

/// Entry stored inside a parent document's list. Each entry carries its own id.
pub trait NestedItem: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
    fn validate(&self) -> Result<(), StoreError>;
}

/// A document holding a place name and an ordered list of nested items.
pub trait NestedRecord: Record {
    type Item: NestedItem;
    type Input: NestedInput<Item = Self::Item> + DeserializeOwned + Send + 'static;

    /// Display name used in messages, e.g. "Homestay".
    const KIND: &'static str;
    /// Name of one nested entry, e.g. "stay".
    const ITEM_KIND: &'static str;

    fn new(place: String, items: Vec<Self::Item>) -> Self;
    fn place(&self) -> &str;
    fn set_place(&mut self, place: String);
    fn items(&self) -> &[Self::Item];
    fn items_mut(&mut self) -> &mut Vec<Self::Item>;
    fn touch(&mut self);
}

/// Request body for creating or updating a nested collection document.
pub trait NestedInput {
    type Item: NestedItem;

    fn into_parts(self) -> (Option<String>, Option<Vec<Self::Item>>);
}

/// A stay (homestay) or a hotel entry: both are rated lodgings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Lodging {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub budget: f64,
}

impl NestedItem for Lodging {
    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Invalid("name is required".to_string()));
        }
        check_rating(self.rating)?;
        check_amount("budget", self.budget)
    }
}

/// Sight to visit near a place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Visit {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub budget: f64,
    #[serde(default)]
    pub opening: String,
    #[serde(default)]
    pub closing: String,
    #[serde(default)]
    pub rules: String,
}

impl NestedItem for Visit {
    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Invalid("name is required".to_string()));
        }
        check_amount("budget", self.budget)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Homestay {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub place: String,
    pub stays: Vec<Lodging>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct HomestayInput {
    pub place: Option<String>,
    pub stays: Option<Vec<Lodging>>,
}

impl NestedInput for HomestayInput {
    type Item = Lodging;

    fn into_parts(self) -> (Option<String>, Option<Vec<Lodging>>) {
        (self.place, self.stays)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Hotel {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub place: String,
    pub hotels: Vec<Lodging>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct HotelInput {
    pub place: Option<String>,
    pub hotels: Option<Vec<Lodging>>,
}

impl NestedInput for HotelInput {
    type Item = Lodging;

    fn into_parts(self) -> (Option<String>, Option<Vec<Lodging>>) {
        (self.place, self.hotels)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct NearbyPlace {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub place: String,
    pub tovisit: Vec<Visit>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct NearbyPlaceInput {
    pub place: Option<String>,
    pub tovisit: Option<Vec<Visit>>,
}

impl NestedInput for NearbyPlaceInput {
    type Item = Visit;

    fn into_parts(self) -> (Option<String>, Option<Vec<Visit>>) {
        (self.place, self.tovisit)
    }
}

// The three collection kinds differ only in tree, item type and field names.
impl Record for Homestay {
    const TREE: &'static str = "homestays";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.place))
    }
}

impl NestedRecord for Homestay {
    type Item = Lodging;
    type Input = HomestayInput;
    const KIND: &'static str = "Homestay";
    const ITEM_KIND: &'static str = "stay";

    fn new(place: String, stays: Vec<Lodging>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), place, stays, created_at: now, updated_at: now }
    }

    fn place(&self) -> &str {
        &self.place
    }

    fn set_place(&mut self, place: String) {
        self.place = place;
    }

    fn items(&self) -> &[Lodging] {
        &self.stays
    }

    fn items_mut(&mut self) -> &mut Vec<Lodging> {
        &mut self.stays
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Record for Hotel {
    const TREE: &'static str = "hotels";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.place))
    }
}

impl NestedRecord for Hotel {
    type Item = Lodging;
    type Input = HotelInput;
    const KIND: &'static str = "Hotel";
    const ITEM_KIND: &'static str = "hotel";

    fn new(place: String, hotels: Vec<Lodging>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), place, hotels, created_at: now, updated_at: now }
    }

    fn place(&self) -> &str {
        &self.place
    }

    fn set_place(&mut self, place: String) {
        self.place = place;
    }

    fn items(&self) -> &[Lodging] {
        &self.hotels
    }

    fn items_mut(&mut self) -> &mut Vec<Lodging> {
        &mut self.hotels
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Record for NearbyPlace {
    const TREE: &'static str = "nearby_places";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.place))
    }
}

impl NestedRecord for NearbyPlace {
    type Item = Visit;
    type Input = NearbyPlaceInput;
    const KIND: &'static str = "Nearby place";
    const ITEM_KIND: &'static str = "place";

    fn new(place: String, tovisit: Vec<Visit>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), place, tovisit, created_at: now, updated_at: now }
    }

    fn place(&self) -> &str {
        &self.place
    }

    fn set_place(&mut self, place: String) {
        self.place = place;
    }

    fn items(&self) -> &[Visit] {
        &self.tovisit
    }

    fn items_mut(&mut self) -> &mut Vec<Visit> {
        &mut self.tovisit
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// --- Admins and sessions ---

/// Stored admin credential. `password_hash` is a bcrypt hash and never leaves the server.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminCredential {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Record for AdminCredential {
    const TREE: &'static str = "admins";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.email))
    }
}

/// Identity returned to the dashboard after login.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct AdminIdentity {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&AdminCredential> for AdminIdentity {
    fn from(admin: &AdminCredential) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
        }
    }
}

/// JWT claims of an admin session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionClaims {
    pub sub: Uuid, // admin id
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

// --- Profiles ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PersonalInfo {
    pub username: String,
    pub email: String,
    pub payment: Option<String>,
    pub phone: Option<String>,
}

/// Traveller profile. Write-only from the admin API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub trips: Vec<String>,
    #[serde(rename = "personalInfo")]
    pub personal_info: PersonalInfo,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct PersonalInfoInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub payment: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct ProfileInput {
    pub name: Option<String>,
    #[serde(default)]
    pub trips: Vec<String>,
    #[serde(rename = "personalInfo")]
    pub personal_info: Option<PersonalInfoInput>,
}

fn valid_phone(phone: &str) -> bool {
    (10..=15).contains(&phone.len()) && phone.bytes().all(|b| b.is_ascii_digit())
}

impl Profile {
    pub fn from_input(input: ProfileInput) -> Result<Self, StoreError> {
        let name = required("name", input.name)?;
        let info = input
            .personal_info
            .ok_or_else(|| StoreError::Invalid("personalInfo is required".to_string()))?;
        let username = required("personalInfo.username", info.username)?;
        let email = required("personalInfo.email", info.email)?;

        if let Some(phone) = &info.phone {
            if !valid_phone(phone) {
                return Err(StoreError::Invalid(format!("{phone} is not a valid phone number!")));
            }
        }

        Ok(Self {
            id: Uuid::now_v7(),
            name,
            trips: input.trips,
            personal_info: PersonalInfo {
                username,
                email,
                payment: info.payment,
                phone: info.phone,
            },
            created_at: Utc::now(),
        })
    }
}

impl Record for Profile {
    const TREE: &'static str = "profiles";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(normalize_key(&self.personal_info.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn place_input_requires_a_name() {
        let err = Place::from_input(PlaceInput::default()).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        let place = Place::from_input(PlaceInput {
            placename: Some("  Goa ".into()),
            minbudget: Some(5000.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(place.placename, "Goa");
        assert_eq!(place.unique_key().as_deref(), Some("goa"));
    }

    #[test]
    fn place_patch_only_touches_given_fields() {
        let mut place = Place::from_input(PlaceInput {
            placename: Some("Manali".into()),
            month: Some("May".into()),
            ..Default::default()
        })
        .unwrap();

        place
            .apply(&PlaceInput { about: Some("Hills".into()), ..Default::default() })
            .unwrap();
        assert_eq!(place.month, "May");
        assert_eq!(place.about, "Hills");

        let err = place.apply(&PlaceInput { minbudget: Some(-1.0), ..Default::default() });
        assert!(err.is_err());
    }

    #[test]
    fn lodging_without_id_gets_one() {
        let a: Lodging = serde_json::from_value(json!({"name": "A", "rating": 4, "budget": 1000})).unwrap();
        let b: Lodging = serde_json::from_value(json!({"name": "A", "rating": 4, "budget": 1000})).unwrap();
        assert_ne!(a.id, b.id);

        let id = Uuid::new_v4();
        let c: Lodging = serde_json::from_value(json!({"_id": id, "name": "C"})).unwrap();
        assert_eq!(c.id, id);
    }

    #[test]
    fn numeric_fields_accept_form_strings() {
        let stay: Lodging = serde_json::from_value(json!({"name": "A", "rating": "4", "budget": " 1000 "})).unwrap();
        assert_eq!((stay.rating, stay.budget), (4.0, 1000.0));

        let visit: Visit = serde_json::from_value(json!({"name": "Fort", "budget": ""})).unwrap();
        assert_eq!(visit.budget, 0.0);

        let input: PlaceInput = serde_json::from_value(json!({"placename": "Goa", "minbudget": "5000"})).unwrap();
        assert_eq!(input.minbudget, Some(5000.0));
        let input: PlaceInput = serde_json::from_value(json!({"minbudget": ""})).unwrap();
        assert_eq!(input.minbudget, None);
        let input: PlaceInput = serde_json::from_value(json!({"minbudget": null})).unwrap();
        assert_eq!(input.minbudget, None);

        assert!(serde_json::from_value::<Lodging>(json!({"name": "A", "budget": "cheap"})).is_err());
    }

    #[test]
    fn lodging_rating_out_of_range_is_rejected() {
        let stay: Lodging = serde_json::from_value(json!({"name": "A", "rating": 7})).unwrap();
        assert!(stay.validate().is_err());
    }

    #[test]
    fn profile_phone_pattern() {
        assert!(valid_phone("9876543210"));
        assert!(!valid_phone("+919876543210"));
        assert!(!valid_phone("12345"));

        let input: ProfileInput = serde_json::from_value(json!({
            "name": "Asha",
            "trips": ["Goa"],
            "personalInfo": {"username": "asha", "email": "a@x.in", "phone": "12ab"}
        }))
        .unwrap();
        assert!(matches!(Profile::from_input(input), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn profile_serializes_personal_info_in_camel_case() {
        let input: ProfileInput = serde_json::from_value(json!({
            "name": "Asha",
            "personalInfo": {"username": "asha", "email": "a@x.in"}
        }))
        .unwrap();
        let profile = Profile::from_input(input).unwrap();
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["personalInfo"]["username"], "asha");
    }
}
