//! Domain models for BOAMP market notices
//!
//! Records coming back from the open-data backend carry an open-ended set of
//! fields. They are kept as an ordered JSON object and passed through
//! untouched; only the identifier and a handful of display fields are ever
//! read.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::MarketError;

/// A single market notice, exactly as the backend returned it
pub type MarketRecord = Map<String, Value>;

// ============================================================================
// Backend field names
// ============================================================================

pub const FIELD_IDWEB: &str = "idweb";
pub const FIELD_OBJET: &str = "objet";
pub const FIELD_DESCRIPTEUR: &str = "descripteur_libelle";
pub const FIELD_DATE_LIMITE: &str = "datelimitereponse";
pub const FIELD_DATE_PARUTION: &str = "dateparution";
pub const FIELD_DEPARTEMENT: &str = "code_departement";
pub const FIELD_ACHETEUR: &str = "nomacheteur";
pub const FIELD_TYPE_MARCHE: &str = "type_marche";

// ============================================================================
// Enumerations
// ============================================================================

/// Market type facet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketType {
    Services,
    Works,
    Supplies,
}

impl MarketType {
    pub const ALL: [MarketType; 3] = [Self::Services, Self::Works, Self::Supplies];

    /// Facet value understood by the backend
    pub fn facet_value(self) -> &'static str {
        match self {
            Self::Services => "SERVICES",
            Self::Works => "TRAVAUX",
            Self::Supplies => "FOURNITURES",
        }
    }

    /// Parse a market type, accepting both the English and French names
    pub fn parse(input: &str) -> Result<Self, MarketError> {
        match input.trim().to_ascii_uppercase().as_str() {
            "SERVICES" => Ok(Self::Services),
            "WORKS" | "TRAVAUX" => Ok(Self::Works),
            "SUPPLIES" | "FOURNITURES" => Ok(Self::Supplies),
            other => Err(MarketError::InvalidArgument(format!(
                "unknown market type '{other}', expected one of SERVICES, TRAVAUX, FOURNITURES"
            ))),
        }
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.facet_value())
    }
}

impl std::str::FromStr for MarketType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Sort order accepted by the search operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    PublicationAsc,
    PublicationDesc,
    #[default]
    DeadlineAsc,
    DeadlineDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        Self::PublicationAsc,
        Self::PublicationDesc,
        Self::DeadlineAsc,
        Self::DeadlineDesc,
    ];

    /// The literal sent as `order_by`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicationAsc => "dateparution ASC",
            Self::PublicationDesc => "dateparution DESC",
            Self::DeadlineAsc => "datelimitereponse ASC",
            Self::DeadlineDesc => "datelimitereponse DESC",
        }
    }

    /// Match one of the four literals, ignoring case and extra whitespace
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");

        Self::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(&normalized))
    }

    /// Resolve an optional caller value, falling back to deadline ascending
    pub fn resolve(input: Option<&str>) -> Self {
        input.and_then(Self::parse).unwrap_or_default()
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Backend payloads
// ============================================================================

/// Envelope of the `records` endpoint
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RecordsResponse {
    #[serde(default)]
    pub results: Option<Vec<MarketRecord>>,
}

impl RecordsResponse {
    /// Rows of the response; a missing or null `results` counts as no match
    pub fn into_records(self) -> Vec<MarketRecord> {
        self.results.unwrap_or_default()
    }
}

/// Error body returned by the backend on 4xx/5xx
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract the backend's own error message from a response body, if any
pub fn backend_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|err| err.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

// ============================================================================
// Pure Transformation Functions
// ============================================================================

/// Take the first row returned for an identifier lookup
///
/// An empty result set is a `NotFound`, never an empty record.
pub fn select_market(
    records: Vec<MarketRecord>,
    idweb: &str,
) -> Result<MarketRecord, MarketError> {
    records
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound(idweb.to_string()))
}

/// Compact projection of a record used for tabular display
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSummary {
    pub idweb: String,
    pub objet: String,
    pub buyer: String,
    pub department: String,
    pub deadline: String,
    pub published: String,
}

fn field_text(record: &MarketRecord, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

/// Project a raw record onto its display fields
pub fn summarize_market(record: &MarketRecord) -> MarketSummary {
    MarketSummary {
        idweb: field_text(record, FIELD_IDWEB),
        objet: field_text(record, FIELD_OBJET),
        buyer: field_text(record, FIELD_ACHETEUR),
        department: field_text(record, FIELD_DEPARTEMENT),
        deadline: field_text(record, FIELD_DATE_LIMITE),
        published: field_text(record, FIELD_DATE_PARUTION),
    }
}

// ============================================================================
// Tests
// ============================================================================
