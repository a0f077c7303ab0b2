use crate::cache::SealedEntry;
use crate::config::Config;
use crate::engine::RewardEngine;
use crate::errors::{AppError, ResultExt};
use crate::explain::{template_explanation, ExplanationService};
use crate::models::*;
use crate::services::{LocationService, WalletService};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The pure scoring engine.
    pub engine: RewardEngine,
    /// Client for the wallet collaborator.
    pub wallet_service: WalletService,
    /// Client for the nearby-place collaborator.
    pub location_service: LocationService,
    /// Best-effort explanation generator.
    pub explainer: ExplanationService,
    /// Wallet response cache. Key: user_id, value: sealed `Vec<Card>`.
    pub wallet_cache: Cache<String, String>,
    /// Nearby-place cache. Key: rounded coordinate cell + radius, value:
    /// sealed `Vec<Place>`.
    pub places_cache: Cache<String, String>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-wallet-api",
            "version": "0.1.0",
            "timestamp": Utc::now(),
        })),
    )
}

/// GET /api/v1/categories
///
/// The closed canonical category list, for card-entry UIs.
pub async fn get_categories() -> Json<Vec<&'static str>> {
    Json(
        CanonicalCategory::ALL
            .iter()
            .map(|c| c.as_str())
            .collect(),
    )
}

/// Fetches the user's wallet, consulting the checksum-validated cache first.
async fn fetch_wallet(state: &Arc<AppState>, user_id: &str) -> Result<Vec<Card>, AppError> {
    if let Some(sealed) = state.wallet_cache.get(user_id).await {
        if let Some(cards) = SealedEntry::open::<Vec<Card>>(&sealed) {
            tracing::debug!("Wallet cache HIT for user {}", user_id);
            return Ok(cards);
        }
        tracing::warn!(
            "Wallet cache validation failed for user {}, refetching",
            user_id
        );
    }

    let cards = state
        .wallet_service
        .fetch_cards(user_id)
        .await
        .with_context(|| format!("Fetching wallet for user {}", user_id))?;

    if let Some(sealed) = SealedEntry::seal(&cards) {
        state
            .wallet_cache
            .insert(user_id.to_string(), sealed)
            .await;
    }

    Ok(cards)
}

fn benefits_for<'a>(cards: &'a [Card], card_id: &str) -> Vec<String> {
    cards
        .iter()
        .find(|c| c.card_id == card_id)
        .map(|c| c.benefits.iter().take(2).cloned().collect())
        .unwrap_or_default()
}

fn to_card_recommendation(
    estimate: &RewardEstimate,
    cards: &[Card],
    explanation: String,
) -> CardRecommendation {
    CardRecommendation {
        card_id: estimate.card_id.clone(),
        card_name: estimate.card_name.clone(),
        expected_value: estimate.expected_value,
        cash_back_earned: estimate.cash_back_value,
        points_earned: estimate.points_earned,
        applicable_benefits: benefits_for(cards, &estimate.card_id),
        explanation,
    }
}

/// POST /api/v1/recommend
///
/// Scores the user's wallet against one transaction and returns the optimal
/// card plus ranked alternatives. The explanation on the optimal card is
/// best-effort; the numeric result never waits on more than the bounded
/// explanation timeout and never fails because of it.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    tracing::info!(
        "POST /recommend - user: {}, merchant: {}",
        request.user_id,
        request.merchant
    );

    if request.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }

    let amount = request.amount.unwrap_or(0.0);
    let category = match (request.category, request.raw_category.as_deref()) {
        (Some(category), _) => category,
        (None, Some(raw)) => state.engine.normalize(raw),
        (None, None) => CanonicalCategory::Other,
    };

    let cards = fetch_wallet(&state, &request.user_id).await?;
    let ranked = state.engine.rank(&cards, category, amount)?;

    let explanation = state
        .explainer
        .explain(&ranked.optimal, category, &request.merchant, amount)
        .await;

    let recommended_card = to_card_recommendation(&ranked.optimal, &cards, explanation);
    let alternative_cards = ranked
        .alternatives
        .iter()
        .map(|e| {
            let text = template_explanation(e, category, amount);
            to_card_recommendation(e, &cards, text)
        })
        .collect();

    let response = RecommendationResponse {
        recommendation_id: Uuid::new_v4(),
        optimization_summary: format!(
            "{} maximizes rewards for {} purchases at {}",
            ranked.optimal.card_name, category, request.merchant
        ),
        total_savings: ranked.optimal.expected_value,
        recommended_card,
        alternative_cards,
    };

    tracing::info!(
        "Recommended {} (expected value ${:.2}) for user {}",
        response.recommended_card.card_name,
        response.total_savings,
        request.user_id
    );

    Ok(Json(response))
}

/// Search radius bounds for nearby lookups, in meters.
const DEFAULT_RADIUS_M: u32 = 2000;
const MAX_RADIUS_M: u32 = 5000;

/// Cache key for a nearby lookup: coordinates rounded to ~100m cells so
/// small GPS jitter still hits the cache.
fn places_cache_key(lat: f64, lng: f64, radius: u32) -> String {
    format!("places:{:.3}:{:.3}:{}", lat, lng, radius)
}

async fn fetch_places(
    state: &Arc<AppState>,
    lat: f64,
    lng: f64,
    radius: u32,
) -> Result<Vec<Place>, AppError> {
    let cache_key = places_cache_key(lat, lng, radius);

    if let Some(sealed) = state.places_cache.get(&cache_key).await {
        if let Some(places) = SealedEntry::open::<Vec<Place>>(&sealed) {
            tracing::debug!("Places cache HIT for {}", cache_key);
            return Ok(places);
        }
        tracing::warn!("Places cache validation failed for {}, refetching", cache_key);
    }

    let places = state
        .location_service
        .nearby_places(lat, lng, radius)
        .await
        .with_context(|| format!("Looking up places around ({}, {})", lat, lng))?;

    if let Some(sealed) = SealedEntry::seal(&places) {
        state.places_cache.insert(cache_key, sealed).await;
    }

    Ok(places)
}

/// GET /api/v1/recommend/nearby
///
/// Looks up merchants around a coordinate and returns the wallet's top card
/// for each. Output preserves distance order unless the caller asks for the
/// value sort. "No nearby merchants" yields an empty list, not an error; an
/// empty wallet fails the whole batch.
pub async fn recommend_nearby(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, AppError> {
    tracing::info!(
        "GET /recommend/nearby - user: {}, at ({}, {})",
        query.user_id,
        query.lat,
        query.lng
    );

    if query.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lng) {
        return Err(AppError::BadRequest(
            "lat must be in [-90, 90] and lng in [-180, 180]".to_string(),
        ));
    }

    let radius = query.radius.unwrap_or(DEFAULT_RADIUS_M).min(MAX_RADIUS_M);
    let assumed_amount = query.amount.unwrap_or(state.config.default_nearby_amount);

    let cards = fetch_wallet(&state, &query.user_id).await?;
    let places = fetch_places(&state, query.lat, query.lng, radius).await?;

    let recommendations =
        state
            .engine
            .recommend_for_places(&places, &cards, assumed_amount, query.sort)?;

    Ok(Json(NearbyResponse {
        user_id: query.user_id,
        generated_at: Utc::now(),
        assumed_amount,
        places: recommendations,
    }))
}
