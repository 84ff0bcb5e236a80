//! Keyword heuristics deciding when a message is about disposal logistics.
//!
//! Plain case-insensitive substring matching: no stemming, tokenization or
//! negation handling.

use crate::geo::UserLocation;

/// Disposal and collection-point vocabulary, lowercase.
pub(crate) const LOGISTICS_KEYWORDS: &[&str] = &[
    "logística",
    "coletor",
    "descartar",
    "onde",
    "encontrar",
    "reciclar",
    "ponto de coleta",
];

/// Proximity vocabulary ("near", "where is", "find"), lowercase.
pub(crate) const PROXIMITY_KEYWORDS: &[&str] = &["perto", "onde fica", "encontrar"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// True when any logistics keyword occurs anywhere in `text`.
#[must_use]
pub fn is_logistics_intent(text: &str) -> bool {
    contains_any(text, LOGISTICS_KEYWORDS)
}

/// True only with a known location and a proximity keyword in `text`.
///
/// Selects the location-aware retrieval tool over generic web search.
#[must_use]
pub fn should_use_location_tool(text: &str, location: Option<UserLocation>) -> bool {
    location.is_some() && contains_any(text, PROXIMITY_KEYWORDS)
}
