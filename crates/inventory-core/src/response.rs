//! ============================================================================
//! Response Decoding - `/spartan` body to typed pieces
//! ============================================================================
//! Everything is validated here before the fetcher touches its state, so a
//! bad response never leaves the fetcher half-updated.
//! ============================================================================

use serde_json::Value;

use crate::types::{
    ArmoryCategory, ArmorySnapshot, CurrentlyEquipped, FetchOptions, HighlightSelection,
    InventoryError, InventoryRecord,
};

const PLAYER_INVENTORY: &str = "PlayerInventory";
const CURRENTLY_EQUIPPED: &str = "CurrentlyEquipped";

/// Longest slice of a response body carried in an error
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 200;

/// Decoded `/spartan` response
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    pub inventory: InventoryRecord,
    pub armory: Option<DecodedArmory>,
}

/// Armory pieces, present only when armory data was requested
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArmory {
    pub snapshot: ArmorySnapshot,
    pub currently_equipped: CurrentlyEquipped,
    /// Seeded selection, present only when highlights are tracked
    pub highlights: Option<HighlightSelection>,
}

/// Decode a raw response body
pub fn decode_response(body: &str, options: &FetchOptions) -> Result<DecodedResponse, InventoryError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| InventoryError::Decode(format!("{} - body: {}", e, truncate(body, MAX_ERROR_BODY_CHARS))))?;
    decode_value(value, options)
}

/// Decode an already-parsed response
pub fn decode_value(value: Value, options: &FetchOptions) -> Result<DecodedResponse, InventoryError> {
    let object = value
        .as_object()
        .ok_or_else(|| InventoryError::Decode("response is not a JSON object".to_string()))?;

    let inventory = match object.get(PLAYER_INVENTORY) {
        None | Some(Value::Null) => return Err(InventoryError::EmptyInventory),
        Some(Value::Array(records)) => records
            .first()
            .cloned()
            .map(InventoryRecord)
            .ok_or(InventoryError::EmptyInventory)?,
        Some(_) => {
            return Err(InventoryError::Decode(format!(
                "{} is not an array",
                PLAYER_INVENTORY
            )))
        }
    };

    if !options.include_armory {
        return Ok(DecodedResponse {
            inventory,
            armory: None,
        });
    }

    let required = ArmoryCategory::ALL
        .iter()
        .map(|c| c.row_field())
        .chain(std::iter::once(CURRENTLY_EQUIPPED));
    for field in required {
        if matches!(object.get(field), None | Some(Value::Null)) {
            return Err(InventoryError::MissingField(field.to_string()));
        }
    }

    let snapshot: ArmorySnapshot = serde_json::from_value(value)
        .map_err(|e| InventoryError::Decode(format!("armory snapshot: {}", e)))?;
    let currently_equipped = snapshot.currently_equipped.clone();
    let highlights = options
        .tracks_highlights()
        .then(|| HighlightSelection::from_snapshot(&snapshot));

    Ok(DecodedResponse {
        inventory,
        armory: Some(DecodedArmory {
            snapshot,
            currently_equipped,
            highlights,
        }),
    })
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
