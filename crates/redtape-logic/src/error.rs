//! Errors raised at the catalog boundary.
//!
//! The engine itself has no error paths: empty selections are `None` and
//! invalid inputs are ignored. Only malformed catalog data is an error, and
//! it is rejected before any definition reaches the engine.

/// Why a catalog was rejected.
#[derive(Debug)]
pub enum CatalogError {
    /// JSON did not decode: bad syntax, unknown field name, unknown operator,
    /// or a non-numeric value.
    Json(serde_json::Error),
    /// The provider could not produce a catalog at all.
    Unavailable(String),
    /// Catalog decoded but contains no events.
    Empty,
    /// An event has an empty id.
    MissingEventId { index: usize },
    /// Two events share an id.
    DuplicateEventId(String),
    /// Two actions within one event share an id.
    DuplicateActionId { event: String, action: String },
    /// Base weight is zero, negative, or not finite.
    InvalidWeight { event: String, weight: f64 },
    /// A threshold, delta, or score impact is NaN or infinite.
    NonFiniteValue { event: String, detail: String },
    /// Terminal event without a win/lose tag.
    MissingTerminalOutcome(String),
    /// An event offers the player nothing to choose.
    NoActions(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e)
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Json(e) => write!(f, "Catalog JSON error: {}", e),
            CatalogError::Unavailable(reason) => write!(f, "Catalog unavailable: {}", reason),
            CatalogError::Empty => write!(f, "Catalog contains no events"),
            CatalogError::MissingEventId { index } => {
                write!(f, "Event at position {} has an empty id", index)
            }
            CatalogError::DuplicateEventId(id) => write!(f, "Duplicate event id '{}'", id),
            CatalogError::DuplicateActionId { event, action } => {
                write!(f, "Event '{}' has duplicate action id '{}'", event, action)
            }
            CatalogError::InvalidWeight { event, weight } => write!(
                f,
                "Event '{}' has invalid base weight {} (must be positive and finite)",
                event, weight
            ),
            CatalogError::NonFiniteValue { event, detail } => {
                write!(f, "Event '{}' has a non-finite value: {}", event, detail)
            }
            CatalogError::MissingTerminalOutcome(id) => {
                write!(f, "Terminal event '{}' has no outcome tag", id)
            }
            CatalogError::NoActions(id) => write!(f, "Event '{}' has no actions", id),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Json(e) => Some(e),
            _ => None,
        }
    }
}
