//! ============================================================================
//! Core Types for the Spartan Inventory Fetcher
//! ============================================================================
//! Data structures decoded from the `/spartan` endpoint plus the error type.
//! Field names follow the backend's JSON so the types round-trip to the UI.
//! ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Caller-supplied identity payload (gamertag, XUID, tokens...).
/// Sent verbatim as the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerIdentity(Value);

impl PlayerIdentity {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Parse an identity from a JSON string
    pub fn from_json(raw: &str) -> Result<Self, InventoryError> {
        serde_json::from_str(raw)
            .map(Self)
            .map_err(|e| InventoryError::Decode(format!("invalid identity JSON: {}", e)))
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }
}

/// First element of the response's `PlayerInventory` sequence.
/// Opaque to this crate; handed to the UI as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryRecord(pub Value);

/// Catalog item identifier; the backend sends either strings or numbers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Text(String),
    Number(Number),
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::Text(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId::Number(n.into())
    }
}

/// `null` and a missing flag both read as false
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// One catalog entry in an armory row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmoryEntry {
    pub id: ItemId,
    #[serde(rename = "isHighlighted", default, deserialize_with = "null_as_false")]
    pub is_highlighted: bool,
    /// Everything else the backend sends (name, image path, rarity...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The item currently equipped in each armory slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentlyEquipped {
    #[serde(rename = "CurrentlyEquippedCore", default)]
    pub core: Option<ItemId>,
    #[serde(rename = "CurrentlyEquippedHelmet", default)]
    pub helmet: Option<ItemId>,
    #[serde(rename = "CurrentlyEquippedVisor", default)]
    pub visor: Option<ItemId>,
    #[serde(rename = "CurrentlyEquippedGlove", default)]
    pub glove: Option<ItemId>,
    #[serde(rename = "CurrentlyEquippedCoating", default)]
    pub coating: Option<ItemId>,
}

impl CurrentlyEquipped {
    /// Equipped item for a category
    pub fn slot(&self, category: ArmoryCategory) -> Option<&ItemId> {
        match category {
            ArmoryCategory::Core => self.core.as_ref(),
            ArmoryCategory::Helmet => self.helmet.as_ref(),
            ArmoryCategory::Visor => self.visor.as_ref(),
            ArmoryCategory::Glove => self.glove.as_ref(),
            ArmoryCategory::Coating => self.coating.as_ref(),
        }
    }
}

/// Extended armory data returned when `includeArmory=true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorySnapshot {
    #[serde(rename = "ArmoryRow")]
    pub cores: Vec<ArmoryEntry>,
    #[serde(rename = "ArmoryRowHelmets")]
    pub helmets: Vec<ArmoryEntry>,
    #[serde(rename = "ArmoryRowVisors")]
    pub visors: Vec<ArmoryEntry>,
    #[serde(rename = "ArmoryRowGloves")]
    pub gloves: Vec<ArmoryEntry>,
    #[serde(rename = "ArmoryRowCoatings")]
    pub coatings: Vec<ArmoryEntry>,
    #[serde(rename = "CurrentlyEquipped")]
    pub currently_equipped: CurrentlyEquipped,
    /// Remaining top-level fields, `PlayerInventory` included
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArmorySnapshot {
    /// Catalog row for a category
    pub fn row(&self, category: ArmoryCategory) -> &[ArmoryEntry] {
        match category {
            ArmoryCategory::Core => &self.cores,
            ArmoryCategory::Helmet => &self.helmets,
            ArmoryCategory::Visor => &self.visors,
            ArmoryCategory::Glove => &self.gloves,
            ArmoryCategory::Coating => &self.coatings,
        }
    }

    /// First highlighted entry in a category's row
    pub fn highlighted(&self, category: ArmoryCategory) -> Option<&ArmoryEntry> {
        self.row(category).iter().find(|entry| entry.is_highlighted)
    }
}

/// Armory customization categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmoryCategory {
    Core,
    Helmet,
    Visor,
    Glove,
    Coating,
}

impl ArmoryCategory {
    pub const ALL: [ArmoryCategory; 5] = [
        ArmoryCategory::Core,
        ArmoryCategory::Helmet,
        ArmoryCategory::Visor,
        ArmoryCategory::Glove,
        ArmoryCategory::Coating,
    ];

    /// Response field holding this category's catalog
    pub fn row_field(&self) -> &'static str {
        match self {
            ArmoryCategory::Core => "ArmoryRow",
            ArmoryCategory::Helmet => "ArmoryRowHelmets",
            ArmoryCategory::Visor => "ArmoryRowVisors",
            ArmoryCategory::Glove => "ArmoryRowGloves",
            ArmoryCategory::Coating => "ArmoryRowCoatings",
        }
    }

    /// Key used in the highlight selection map
    pub fn highlight_key(&self) -> &'static str {
        match self {
            ArmoryCategory::Core => "armorcoreId",
            ArmoryCategory::Helmet => "armorhelmetId",
            ArmoryCategory::Visor => "armorvisorId",
            ArmoryCategory::Glove => "armorgloveId",
            ArmoryCategory::Coating => "armorcoatingId",
        }
    }
}

/// Per-category id of the highlighted catalog item.
/// Updated one key at a time, never replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightSelection {
    #[serde(rename = "armorcoreId", default, skip_serializing_if = "Option::is_none")]
    pub core: Option<ItemId>,
    #[serde(rename = "armorhelmetId", default, skip_serializing_if = "Option::is_none")]
    pub helmet: Option<ItemId>,
    #[serde(rename = "armorvisorId", default, skip_serializing_if = "Option::is_none")]
    pub visor: Option<ItemId>,
    #[serde(rename = "armorgloveId", default, skip_serializing_if = "Option::is_none")]
    pub glove: Option<ItemId>,
    #[serde(rename = "armorcoatingId", default, skip_serializing_if = "Option::is_none")]
    pub coating: Option<ItemId>,
}

impl HighlightSelection {
    fn slot_mut(&mut self, category: ArmoryCategory) -> &mut Option<ItemId> {
        match category {
            ArmoryCategory::Core => &mut self.core,
            ArmoryCategory::Helmet => &mut self.helmet,
            ArmoryCategory::Visor => &mut self.visor,
            ArmoryCategory::Glove => &mut self.glove,
            ArmoryCategory::Coating => &mut self.coating,
        }
    }

    pub fn get(&self, category: ArmoryCategory) -> Option<&ItemId> {
        match category {
            ArmoryCategory::Core => self.core.as_ref(),
            ArmoryCategory::Helmet => self.helmet.as_ref(),
            ArmoryCategory::Visor => self.visor.as_ref(),
            ArmoryCategory::Glove => self.glove.as_ref(),
            ArmoryCategory::Coating => self.coating.as_ref(),
        }
    }

    pub fn set(&mut self, category: ArmoryCategory, id: impl Into<ItemId>) {
        *self.slot_mut(category) = Some(id.into());
    }

    pub fn clear(&mut self, category: ArmoryCategory) {
        *self.slot_mut(category) = None;
    }

    /// Merge in another selection; keys absent from `other` are kept
    pub fn merge(&mut self, other: &HighlightSelection) {
        for category in ArmoryCategory::ALL {
            if let Some(id) = other.get(category) {
                self.set(category, id.clone());
            }
        }
    }

    /// Initial selection seeded from the `isHighlighted` flags of a snapshot
    pub fn from_snapshot(snapshot: &ArmorySnapshot) -> Self {
        let mut selection = Self::default();
        for category in ArmoryCategory::ALL {
            if let Some(entry) = snapshot.highlighted(category) {
                selection.set(category, entry.id.clone());
            }
        }
        selection
    }
}

/// Options fixed at fetcher construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Request armory catalogs and equipment (`?includeArmory=true`)
    pub include_armory: bool,
    /// Seed a highlight selection from the catalogs (needs `include_armory`)
    pub track_highlights: bool,
}

impl FetchOptions {
    pub fn inventory_only() -> Self {
        Self::default()
    }

    pub fn with_armory() -> Self {
        Self {
            include_armory: true,
            track_highlights: false,
        }
    }

    pub fn with_highlights() -> Self {
        Self {
            include_armory: true,
            track_highlights: true,
        }
    }

    /// Highlights only apply when armory data is fetched
    pub fn tracks_highlights(&self) -> bool {
        self.include_armory && self.track_highlights
    }
}

/// Request lifecycle as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Loading,
    Loaded,
    Failed,
}

/// Single-slot cache; only `force` invalidates a filled slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Filled,
}

/// What a `try_fetch` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Earlier success reused, no request made
    Cached,
    /// Request made and state replaced
    Fetched,
}

/// Error types for the fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum InventoryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Inventory API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode inventory response: {0}")]
    Decode(String),

    #[error("Response contained no PlayerInventory records")]
    EmptyInventory,

    #[error("Response is missing field {0}")]
    MissingField(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
