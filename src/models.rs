use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============ Engine Models ============

/// The closed set of transaction categories used for reward-rate lookups.
///
/// Upstream data sources (place lookups, free-text transaction entry) use
/// inconsistent vocabularies; every raw label is normalized onto one of
/// these seven values before any rate lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalCategory {
    Dining,
    Travel,
    Groceries,
    Gas,
    Entertainment,
    Shopping,
    Other,
}

impl CanonicalCategory {
    /// All categories, in display order.
    pub const ALL: [CanonicalCategory; 7] = [
        CanonicalCategory::Dining,
        CanonicalCategory::Travel,
        CanonicalCategory::Groceries,
        CanonicalCategory::Gas,
        CanonicalCategory::Entertainment,
        CanonicalCategory::Shopping,
        CanonicalCategory::Other,
    ];

    /// The lowercase key used in card rate maps and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalCategory::Dining => "dining",
            CanonicalCategory::Travel => "travel",
            CanonicalCategory::Groceries => "groceries",
            CanonicalCategory::Gas => "gas",
            CanonicalCategory::Entertainment => "entertainment",
            CanonicalCategory::Shopping => "shopping",
            CanonicalCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for CanonicalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payment instrument in a user's wallet.
///
/// Rate maps are keyed by canonical category name or by one of the sentinel
/// keys `default`/`all`/`other`. A missing key is distinct from an explicit
/// 0: both contribute no reward, but a missing key allows the sentinel
/// fallback chain to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Opaque unique identifier.
    pub card_id: String,
    /// Display name (e.g. "American Express Gold").
    pub card_name: String,
    /// Card issuer display string.
    pub issuer: String,
    /// Category → decimal cash-back rate (0.04 = 4%).
    #[serde(default)]
    pub cash_back_rate: HashMap<String, f64>,
    /// Category → points earned per dollar spent.
    #[serde(default)]
    pub points_multiplier: HashMap<String, f64>,
    /// Annual fee in dollars.
    #[serde(default)]
    pub annual_fee: f64,
    /// Cardholder benefits, surfaced alongside recommendations.
    #[serde(default)]
    pub benefits: Vec<String>,
    /// Inactive cards are excluded from scoring.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Expected reward for a single (card, transaction) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEstimate {
    pub card_id: String,
    pub card_name: String,
    /// amount × matched cash-back rate.
    pub cash_back_value: f64,
    /// Raw points earned (amount × matched multiplier).
    pub points_earned: f64,
    /// Points converted to dollars (points × point-dollar value).
    pub points_value: f64,
    /// max(cash_back_value, points_value) — assumes the user redeems
    /// whichever reward type is worth more.
    pub expected_value: f64,
}

/// Total order over a wallet for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRecommendation {
    /// The entry with the greatest expected value. Ties are broken by input
    /// order: the first card in the wallet wins.
    pub optimal: RewardEstimate,
    /// Remaining entries, descending by expected value.
    pub alternatives: Vec<RewardEstimate>,
}

/// A nearby merchant returned by the location collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    /// Source-provided category label, not yet normalized.
    pub raw_category: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
    pub distance_meters: f64,
}

/// A nearby place paired with its card ranking.
///
/// Created fresh per location query; never persisted by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecommendation {
    pub place: Place,
    /// The place's normalized category used for scoring.
    pub category: CanonicalCategory,
    pub recommendation: RankedRecommendation,
}

/// Ordering of a batch recommendation result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceSort {
    /// Preserve the input order (distance-ascending as established by the
    /// location lookup). Proximity is the primary axis for this view.
    #[default]
    Distance,
    /// Re-sort descending by the optimal card's expected value.
    Value,
}

// ============ API Request/Response Models ============

/// Request payload for a single-transaction recommendation.
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub user_id: String,
    /// Merchant name, informational only (not used in scoring).
    pub merchant: String,
    pub amount: Option<f64>,
    /// Already-canonical category, if the caller has one.
    pub category: Option<CanonicalCategory>,
    /// Free-text source category label, normalized server-side.
    pub raw_category: Option<String>,
}

/// One card in a recommendation response.
#[derive(Debug, Clone, Serialize)]
pub struct CardRecommendation {
    pub card_id: String,
    pub card_name: String,
    pub expected_value: f64,
    pub cash_back_earned: f64,
    pub points_earned: f64,
    pub applicable_benefits: Vec<String>,
    pub explanation: String,
}

/// Response payload for POST /api/v1/recommend.
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendation_id: Uuid,
    pub recommended_card: CardRecommendation,
    pub alternative_cards: Vec<CardRecommendation>,
    pub optimization_summary: String,
    /// The optimal expected value; consumers record this next to the user's
    /// actual card choice for optimal-vs-actual analytics.
    pub total_savings: f64,
}

/// Query parameters for GET /api/v1/recommend/nearby.
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
    /// Search radius in meters (default 2000, capped at 5000).
    pub radius: Option<u32>,
    /// Assumed transaction size for the hypothetical purchase.
    pub amount: Option<f64>,
    #[serde(default)]
    pub sort: PlaceSort,
}

/// Response payload for GET /api/v1/recommend/nearby.
#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub assumed_amount: f64,
    pub places: Vec<PlaceRecommendation>,
}
