/// Integration tests with mocked external collaborators
/// Tests the wallet, location, and explanation clients without hitting real services
use rust_wallet_api::config::Config;
use rust_wallet_api::engine::RewardEngine;
use rust_wallet_api::errors::AppError;
use rust_wallet_api::explain::ExplanationService;
use rust_wallet_api::models::{CanonicalCategory, PlaceSort};
use rust_wallet_api::services::{LocationService, WalletService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config
fn create_test_config(base_url: String) -> Config {
    Config {
        port: 8000,
        wallet_base_url: base_url.clone(),
        wallet_api_token: Some("test_token".to_string()),
        overpass_url: format!("{}/api/interpreter", base_url),
        point_dollar_value: 0.015,
        default_nearby_amount: 50.0,
        groq_api_key: None,
        groq_base_url: format!("{}/openai/v1", base_url),
        groq_model: "llama3-70b-8192".to_string(),
    }
}

#[tokio::test]
async fn test_wallet_fetch_filters_inactive_cards() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!([
        {
            "card_id": "c1",
            "card_name": "Active Card",
            "issuer": "Chase",
            "cash_back_rate": {"dining": 0.03},
            "points_multiplier": {},
            "annual_fee": 95.0,
            "benefits": ["Lounge access"],
            "is_active": true
        },
        {
            "card_id": "c2",
            "card_name": "Cancelled Card",
            "issuer": "Citi",
            "cash_back_rate": {"all": 0.02},
            "points_multiplier": {},
            "annual_fee": 0.0,
            "benefits": [],
            "is_active": false
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/v1/users/user-123/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = WalletService::new(&config).expect("client");

    let cards = service.fetch_cards("user-123").await.expect("fetch");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].card_id, "c1");
    assert_eq!(cards[0].cash_back_rate.get("dining"), Some(&0.03));
}

#[tokio::test]
async fn test_wallet_fetch_defaults_missing_fields() {
    let mock_server = MockServer::start().await;

    // Minimal card payload: rate maps and flags come from serde defaults
    let mock_response = serde_json::json!([
        { "card_id": "c1", "card_name": "Bare Card", "issuer": "Amex" }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/v1/users/user-9/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = WalletService::new(&config).expect("client");

    let cards = service.fetch_cards("user-9").await.expect("fetch");
    assert_eq!(cards.len(), 1);
    assert!(cards[0].cash_back_rate.is_empty());
    assert!(cards[0].is_active);

    // An empty rate map still scores, at zero
    let engine = RewardEngine::default();
    let ranked = engine
        .rank(&cards, CanonicalCategory::Dining, 100.0)
        .expect("rank");
    assert_eq!(ranked.optimal.expected_value, 0.0);
}

#[tokio::test]
async fn test_wallet_fetch_unknown_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/ghost/cards"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = WalletService::new(&config).expect("client");

    let result = service.fetch_cards("ghost").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_wallet_fetch_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/user-123/cards"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = WalletService::new(&config).expect("client");

    let result = service.fetch_cards("user-123").await;
    assert!(matches!(result, Err(AppError::ExternalApiError(_))));
}

#[tokio::test]
async fn test_nearby_places_parsed_and_sorted() {
    let mock_server = MockServer::start().await;

    // Two OSM nodes: the cafe is closer than the fuel station
    let mock_response = serde_json::json!({
        "elements": [
            {
                "type": "node",
                "id": 42,
                "lat": 40.020,
                "lon": -74.0,
                "tags": { "name": "Shell", "amenity": "fuel" }
            },
            {
                "type": "node",
                "id": 7,
                "lat": 40.001,
                "lon": -74.0,
                "tags": {
                    "name": "Blue Bottle",
                    "amenity": "cafe",
                    "addr:housenumber": "55",
                    "addr:street": "Main St"
                }
            },
            { "type": "way", "id": 99 }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = LocationService::new(&config).expect("client");

    let places = service.nearby_places(40.0, -74.0, 2000).await.expect("lookup");
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].name, "Blue Bottle");
    assert_eq!(places[0].raw_category, "cafe");
    assert_eq!(places[0].address, "55, Main St");
    assert_eq!(places[1].place_id, "osm_42");
    assert!(places[0].distance_meters < places[1].distance_meters);
}

#[tokio::test]
async fn test_nearby_places_error_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = LocationService::new(&config).expect("client");

    let result = service.nearby_places(40.0, -74.0, 2000).await;
    assert!(matches!(result, Err(AppError::ExternalApiError(_))));
}

#[tokio::test]
async fn test_places_feed_directly_into_the_batch_aggregator() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!({
        "elements": [
            {
                "type": "node",
                "id": 1,
                "lat": 40.001,
                "lon": -74.0,
                "tags": { "name": "Whole Foods", "shop": "supermarket" }
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());
    let service = LocationService::new(&config).expect("client");
    let places = service.nearby_places(40.0, -74.0, 2000).await.expect("lookup");

    let wallet = vec![rust_wallet_api::models::Card {
        card_id: "g".to_string(),
        card_name: "Grocery Card".to_string(),
        issuer: "Amex".to_string(),
        cash_back_rate: [("groceries".to_string(), 0.06)].into_iter().collect(),
        points_multiplier: Default::default(),
        annual_fee: 0.0,
        benefits: vec![],
        is_active: true,
    }];

    let engine = RewardEngine::default();
    let result = engine
        .recommend_for_places(&places, &wallet, 100.0, PlaceSort::Distance)
        .expect("batch");

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].category, CanonicalCategory::Groceries);
    assert!((result[0].recommendation.optimal.expected_value - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_explanation_uses_model_when_available() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": "Use your Gold card here." } }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(mock_server.uri());
    config.groq_api_key = Some("test_key".to_string());
    let service = ExplanationService::new(&config).expect("client");

    let estimate = rust_wallet_api::models::RewardEstimate {
        card_id: "g".to_string(),
        card_name: "Gold".to_string(),
        cash_back_value: 4.0,
        points_earned: 0.0,
        points_value: 0.0,
        expected_value: 4.0,
    };

    let text = service
        .explain(&estimate, CanonicalCategory::Dining, "Chipotle", 100.0)
        .await;
    assert_eq!(text, "Use your Gold card here.");
}

#[tokio::test]
async fn test_explanation_falls_back_when_model_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(mock_server.uri());
    config.groq_api_key = Some("test_key".to_string());
    let service = ExplanationService::new(&config).expect("client");

    let estimate = rust_wallet_api::models::RewardEstimate {
        card_id: "g".to_string(),
        card_name: "Gold".to_string(),
        cash_back_value: 4.0,
        points_earned: 0.0,
        points_value: 0.0,
        expected_value: 4.0,
    };

    // Numeric recommendation must survive an explanation outage
    let text = service
        .explain(&estimate, CanonicalCategory::Dining, "Chipotle", 100.0)
        .await;
    assert_eq!(text, "Earn 4.0% cash back on dining purchases");
}

#[tokio::test]
async fn test_explanation_skips_model_when_unconfigured() {
    // No mock server mounted: with no API key the client must not call out
    let config = create_test_config("http://127.0.0.1:9".to_string());
    let service = ExplanationService::new(&config).expect("client");

    let estimate = rust_wallet_api::models::RewardEstimate {
        card_id: "t".to_string(),
        card_name: "Travel".to_string(),
        cash_back_value: 0.0,
        points_earned: 300.0,
        points_value: 4.5,
        expected_value: 4.5,
    };

    let text = service
        .explain(&estimate, CanonicalCategory::Travel, "Delta", 100.0)
        .await;
    assert_eq!(text, "Earn 3.0 points per $1 on travel purchases");
}

#[tokio::test]
async fn test_concurrent_wallet_requests() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!([
        {
            "card_id": "c1",
            "card_name": "Card",
            "issuer": "Chase",
            "cash_back_rate": {"all": 0.02},
            "points_multiplier": {},
            "is_active": true
        }
    ]);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .expect(10)
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri());

    // Fire 10 concurrent requests
    let mut handles = vec![];
    for i in 0..10 {
        let config_clone = config.clone();
        let handle = tokio::spawn(async move {
            let service = WalletService::new(&config_clone).expect("client");
            service.fetch_cards(&format!("user-{}", i)).await
        });
        handles.push(handle);
    }

    // Wait for all to complete
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }
}
