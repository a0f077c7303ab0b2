/// Reward scoring and recommendation engine.
///
/// Pure, synchronous computation over in-memory data: no I/O, no shared
/// mutable state. Safe to call from any number of concurrent request tasks
/// without coordination.
///
/// Layering, leaves first: category normalization → per-card scoring →
/// wallet ranking → batch aggregation over nearby places. Each layer calls
/// only the one below it.
use crate::category::CategoryTable;
use crate::config::DEFAULT_POINT_DOLLAR_VALUE;
use crate::errors::AppError;
use crate::models::{
    CanonicalCategory, Card, Place, PlaceRecommendation, PlaceSort, RankedRecommendation,
    RewardEstimate,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Fallback keys consulted when a rate map has no exact category entry.
/// Single source of truth for the resolution order: exact → default → all
/// → other → 0.
const SENTINEL_KEYS: [&str; 3] = ["default", "all", "other"];

/// Resolves a per-category rate from a card rate map.
///
/// Shared by both the cash-back and the points-multiplier lookup so the
/// fallback chain cannot drift between the two.
fn resolve_rate(rates: &HashMap<String, f64>, category: CanonicalCategory) -> f64 {
    if let Some(rate) = rates.get(category.as_str()) {
        return *rate;
    }
    for key in SENTINEL_KEYS {
        if let Some(rate) = rates.get(key) {
            return *rate;
        }
    }
    0.0
}

/// Rejects negative or non-finite amounts at the engine boundary.
///
/// A negative amount would produce a misleading negative reward, so it is
/// an explicit `InvalidAmount` error rather than a silent clamp to 0.
fn validate_amount(amount: f64) -> Result<(), AppError> {
    if !amount.is_finite() {
        return Err(AppError::InvalidAmount(format!(
            "Amount must be finite, got {}",
            amount
        )));
    }
    if amount < 0.0 {
        return Err(AppError::InvalidAmount(format!(
            "Amount must be non-negative, got {}",
            amount
        )));
    }
    Ok(())
}

/// The scoring engine: category table plus the point-dollar conversion.
#[derive(Debug, Clone)]
pub struct RewardEngine {
    categories: CategoryTable,
    point_dollar_value: f64,
}

impl Default for RewardEngine {
    fn default() -> Self {
        Self::new(CategoryTable::new(), DEFAULT_POINT_DOLLAR_VALUE)
    }
}

impl RewardEngine {
    pub fn new(categories: CategoryTable, point_dollar_value: f64) -> Self {
        Self {
            categories,
            point_dollar_value,
        }
    }

    /// Normalizes a raw category label. Total; unknown labels map to `Other`.
    pub fn normalize(&self, raw: &str) -> CanonicalCategory {
        self.categories.normalize(raw)
    }

    /// Computes the expected monetary reward for one (card, category,
    /// amount) triple.
    ///
    /// Never fails for amount = 0 or for a card with empty rate maps; both
    /// branches resolve to 0 and the expected value is 0.
    pub fn score(
        &self,
        card: &Card,
        category: CanonicalCategory,
        amount: f64,
    ) -> Result<RewardEstimate, AppError> {
        validate_amount(amount)?;

        let cash_back_rate = resolve_rate(&card.cash_back_rate, category);
        let points_multiplier = resolve_rate(&card.points_multiplier, category);

        let cash_back_value = amount * cash_back_rate;
        let points_earned = amount * points_multiplier;
        let points_value = points_earned * self.point_dollar_value;

        Ok(RewardEstimate {
            card_id: card.card_id.clone(),
            card_name: card.card_name.clone(),
            cash_back_value,
            points_earned,
            points_value,
            expected_value: cash_back_value.max(points_value),
        })
    }

    /// Scores every card in the wallet and produces a total order.
    ///
    /// The stable descending sort keeps equal-valued cards in their input
    /// order, so ties deterministically favor the first card in the wallet.
    pub fn rank(
        &self,
        cards: &[Card],
        category: CanonicalCategory,
        amount: f64,
    ) -> Result<RankedRecommendation, AppError> {
        if cards.is_empty() {
            return Err(AppError::EmptyWallet);
        }

        let mut estimates = Vec::with_capacity(cards.len());
        for card in cards {
            estimates.push(self.score(card, category, amount)?);
        }

        estimates.sort_by(|a, b| {
            b.expected_value
                .partial_cmp(&a.expected_value)
                .unwrap_or(Ordering::Equal)
        });

        let mut iter = estimates.into_iter();
        let optimal = iter
            .next()
            .ok_or_else(|| AppError::InternalError("Empty estimate list after scoring".into()))?;

        Ok(RankedRecommendation {
            optimal,
            alternatives: iter.collect(),
        })
    }

    /// Ranks the wallet against every nearby place.
    ///
    /// Each place's raw category is normalized and scored with the
    /// caller-supplied assumed amount (no real amount exists for a
    /// hypothetical purchase). An empty wallet fails the whole batch; an
    /// empty place list is a legitimate, non-exceptional empty result.
    ///
    /// Default output preserves the input (distance) order; `PlaceSort::Value`
    /// re-sorts descending by the optimal expected value.
    pub fn recommend_for_places(
        &self,
        places: &[Place],
        cards: &[Card],
        assumed_amount: f64,
        sort: PlaceSort,
    ) -> Result<Vec<PlaceRecommendation>, AppError> {
        if places.is_empty() {
            return Ok(Vec::new());
        }

        let mut recommendations = Vec::with_capacity(places.len());
        for place in places {
            let category = self.normalize(&place.raw_category);
            let recommendation = self.rank(cards, category, assumed_amount)?;
            recommendations.push(PlaceRecommendation {
                place: place.clone(),
                category,
                recommendation,
            });
        }

        if sort == PlaceSort::Value {
            recommendations.sort_by(|a, b| {
                b.recommendation
                    .optimal
                    .expected_value
                    .partial_cmp(&a.recommendation.optimal.expected_value)
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, cash_back: &[(&str, f64)], points: &[(&str, f64)]) -> Card {
        Card {
            card_id: id.to_string(),
            card_name: format!("Card {}", id),
            issuer: "Test Bank".to_string(),
            cash_back_rate: cash_back
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            points_multiplier: points.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            annual_fee: 0.0,
            benefits: vec![],
            is_active: true,
        }
    }

    #[test]
    fn test_cash_back_scenario() {
        // 4% dining on $25.50 → $1.02 cash back, no points
        let engine = RewardEngine::default();
        let c = card("a", &[("dining", 0.04)], &[]);

        let estimate = engine
            .score(&c, CanonicalCategory::Dining, 25.50)
            .expect("score");
        assert!((estimate.cash_back_value - 1.02).abs() < 1e-9);
        assert_eq!(estimate.points_value, 0.0);
        assert!((estimate.expected_value - 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_points_scenario() {
        // 3x travel points on $100 at 1.5¢/point → $4.50
        let engine = RewardEngine::default();
        let c = card("b", &[], &[("travel", 3.0)]);

        let estimate = engine
            .score(&c, CanonicalCategory::Travel, 100.0)
            .expect("score");
        assert_eq!(estimate.cash_back_value, 0.0);
        assert_eq!(estimate.points_earned, 300.0);
        assert!((estimate.points_value - 4.50).abs() < 1e-9);
        assert!((estimate.expected_value - 4.50).abs() < 1e-9);
    }

    #[test]
    fn test_sentinel_fallback_order() {
        let engine = RewardEngine::default();

        // exact beats default
        let c = card("a", &[("dining", 0.04), ("default", 0.01)], &[]);
        let e = engine.score(&c, CanonicalCategory::Dining, 100.0).unwrap();
        assert!((e.cash_back_value - 4.0).abs() < 1e-9);

        // default beats all beats other
        let c = card("b", &[("default", 0.02), ("all", 0.05), ("other", 0.09)], &[]);
        let e = engine.score(&c, CanonicalCategory::Gas, 100.0).unwrap();
        assert!((e.cash_back_value - 2.0).abs() < 1e-9);

        let c = card("c", &[("all", 0.05), ("other", 0.09)], &[]);
        let e = engine.score(&c, CanonicalCategory::Gas, 100.0).unwrap();
        assert!((e.cash_back_value - 5.0).abs() < 1e-9);

        // no key at all resolves to 0
        let c = card("d", &[("travel", 0.03)], &[]);
        let e = engine.score(&c, CanonicalCategory::Gas, 100.0).unwrap();
        assert_eq!(e.expected_value, 0.0);
    }

    #[test]
    fn test_zero_amount_and_empty_maps() {
        let engine = RewardEngine::default();
        let c = card("a", &[], &[]);
        let e = engine.score(&c, CanonicalCategory::Other, 0.0).unwrap();
        assert_eq!(e.expected_value, 0.0);

        let c = card("b", &[("dining", 0.04)], &[("dining", 2.0)]);
        let e = engine.score(&c, CanonicalCategory::Dining, 0.0).unwrap();
        assert_eq!(e.cash_back_value, 0.0);
        assert_eq!(e.points_value, 0.0);
        assert_eq!(e.expected_value, 0.0);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let engine = RewardEngine::default();
        let c = card("a", &[("dining", 0.04)], &[]);
        let result = engine.score(&c, CanonicalCategory::Dining, -10.0);
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));

        let result = engine.score(&c, CanonicalCategory::Dining, f64::NAN);
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    }

    #[test]
    fn test_rank_empty_wallet() {
        let engine = RewardEngine::default();
        let result = engine.rank(&[], CanonicalCategory::Dining, 10.0);
        assert!(matches!(result, Err(AppError::EmptyWallet)));
    }

    #[test]
    fn test_rank_orders_descending() {
        let engine = RewardEngine::default();
        let cards = vec![
            card("low", &[("dining", 0.01)], &[]),
            card("high", &[("dining", 0.04)], &[]),
            card("mid", &[("dining", 0.02)], &[]),
        ];

        let ranked = engine.rank(&cards, CanonicalCategory::Dining, 100.0).unwrap();
        assert_eq!(ranked.optimal.card_id, "high");
        assert_eq!(ranked.alternatives.len(), 2);
        assert_eq!(ranked.alternatives[0].card_id, "mid");
        assert_eq!(ranked.alternatives[1].card_id, "low");
        assert!(ranked.optimal.expected_value >= ranked.alternatives[0].expected_value);
    }

    #[test]
    fn test_rank_tie_keeps_input_order() {
        let engine = RewardEngine::default();
        let cards = vec![
            card("first", &[("dining", 0.02)], &[]),
            card("second", &[("dining", 0.02)], &[]),
        ];

        let ranked = engine.rank(&cards, CanonicalCategory::Dining, 100.0).unwrap();
        assert_eq!(ranked.optimal.card_id, "first");
        assert_eq!(ranked.alternatives[0].card_id, "second");
    }

    fn place(id: &str, raw_category: &str, distance: f64) -> Place {
        Place {
            place_id: id.to_string(),
            name: format!("Place {}", id),
            raw_category: raw_category.to_string(),
            address: "123 Main St".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            rating: None,
            distance_meters: distance,
        }
    }

    #[test]
    fn test_batch_preserves_place_order_by_default() {
        let engine = RewardEngine::default();
        let cards = vec![card("a", &[("dining", 0.04), ("gas", 0.01)], &[])];
        let places = vec![place("near", "fuel", 100.0), place("far", "restaurant", 900.0)];

        let result = engine
            .recommend_for_places(&places, &cards, 50.0, PlaceSort::Distance)
            .unwrap();
        assert_eq!(result[0].place.place_id, "near");
        assert_eq!(result[1].place.place_id, "far");
        assert_eq!(result[0].category, CanonicalCategory::Gas);
        assert_eq!(result[1].category, CanonicalCategory::Dining);
    }

    #[test]
    fn test_batch_value_sort_option() {
        let engine = RewardEngine::default();
        let cards = vec![card("a", &[("dining", 0.04), ("gas", 0.01)], &[])];
        let places = vec![place("near", "fuel", 100.0), place("far", "restaurant", 900.0)];

        let result = engine
            .recommend_for_places(&places, &cards, 50.0, PlaceSort::Value)
            .unwrap();
        // dining pays 4x the gas rate, so the restaurant ranks first
        assert_eq!(result[0].place.place_id, "far");
    }

    #[test]
    fn test_batch_empty_places_is_not_an_error() {
        let engine = RewardEngine::default();
        let cards = vec![card("a", &[("dining", 0.04)], &[])];
        let result = engine
            .recommend_for_places(&[], &cards, 50.0, PlaceSort::Distance)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_batch_empty_wallet_fails_whole_batch() {
        let engine = RewardEngine::default();
        let places = vec![place("p", "restaurant", 100.0)];
        let result = engine.recommend_for_places(&places, &[], 50.0, PlaceSort::Distance);
        assert!(matches!(result, Err(AppError::EmptyWallet)));
    }
}
