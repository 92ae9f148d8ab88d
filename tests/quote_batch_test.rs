use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::json;

use givelift_api::services::quote_service::{
    DropoffCandidate, ItemCounts, LiveProvider, PickupPoint, QuoteService, QuoteStrategy,
};

// Destinations with this latitude get a 500 from the fake provider
const FAILING_LAT: f64 = 31.9999;

fn pickup() -> PickupPoint {
    PickupPoint {
        street: "600 Congress Ave".to_string(),
        city: "Austin".to_string(),
        state: "TX".to_string(),
        zip: "78701".to_string(),
        lat: 30.2672,
        lng: -97.7431,
    }
}

fn dropoff(id: &str, lat: f64) -> DropoffCandidate {
    DropoffCandidate {
        id: id.to_string(),
        name: format!("Charity {}", id),
        street: "1 Donation Way".to_string(),
        city: "Austin".to_string(),
        state: "TX".to_string(),
        zip: "78702".to_string(),
        lat,
        lng: -97.75,
    }
}

fn items() -> ItemCounts {
    ItemCounts { bags: 2, boxes: 1 }
}

async fn fake_uber_quote(body: web::Json<serde_json::Value>) -> HttpResponse {
    let lat = body["dropoff_latitude"].as_f64().unwrap_or(0.0);
    if (lat - FAILING_LAT).abs() < 1e-9 {
        return HttpResponse::InternalServerError().json(json!({"error": "no couriers"}));
    }
    HttpResponse::Ok().json(json!({ "id": "dqt_test", "fee": 1234 }))
}

/// Local stand-in for a live quote API; returns the bound base URL.
async fn spawn_fake_provider() -> String {
    let server = HttpServer::new(|| {
        App::new().route("/v1/delivery_quotes", web::post().to(fake_uber_quote))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .expect("failed to bind fake provider");

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

#[actix_rt::test]
async fn test_one_failed_destination_never_sinks_the_batch() {
    let base_url = spawn_fake_provider().await;
    let service = QuoteService::live_with(LiveProvider::UberDirect, base_url, None).unwrap();

    let destinations = vec![
        dropoff("d1", 30.30),
        dropoff("d2", 30.35),
        dropoff("d3", FAILING_LAT),
        dropoff("d4", 30.40),
        dropoff("d5", 30.45),
    ];

    let quotes = service
        .quote_destinations(&pickup(), &destinations, &items())
        .await;

    // Every destination priced: four real, one mock-substituted
    assert_eq!(quotes.len(), 5);
    for id in ["d1", "d2", "d4", "d5"] {
        let quote = &quotes[id];
        assert_eq!(quote.price, 12.34);
        assert_eq!(quote.provider_quote_id.as_deref(), Some("dqt_test"));
    }

    let substituted = &quotes["d3"];
    assert!(substituted.provider_quote_id.is_none());
    let mock = QuoteService::new(QuoteStrategy::Mock).unwrap();
    let expected = mock.mock_quote(&pickup(), &dropoff("d3", FAILING_LAT));
    assert_eq!(substituted.price, expected.price);
}

#[actix_rt::test]
async fn test_unreachable_provider_degrades_to_mock_prices() {
    // Nothing listens here; every request fails with connection refused
    let service =
        QuoteService::live_with(LiveProvider::UberDirect, "http://127.0.0.1:9", None).unwrap();

    let destinations = vec![dropoff("d1", 30.30), dropoff("d2", 30.35)];
    let quotes = service
        .quote_destinations(&pickup(), &destinations, &items())
        .await;

    assert_eq!(quotes.len(), 2);
    let mock = QuoteService::new(QuoteStrategy::Mock).unwrap();
    for destination in &destinations {
        let quote = &quotes[&destination.id];
        assert!(quote.provider_quote_id.is_none());
        assert_eq!(
            quote.price,
            mock.mock_quote(&pickup(), destination).price
        );
    }
}

#[actix_rt::test]
async fn test_batches_larger_than_chunk_size_price_everything() {
    let service = QuoteService::new(QuoteStrategy::Mock).unwrap();

    // Seven destinations forces a second batch and the inter-batch delay
    let destinations: Vec<DropoffCandidate> = (0..7)
        .map(|i| dropoff(&format!("d{}", i), 30.30 + i as f64 * 0.01))
        .collect();

    let quotes = service
        .quote_destinations(&pickup(), &destinations, &items())
        .await;

    assert_eq!(quotes.len(), 7);
    for destination in &destinations {
        assert!(quotes.contains_key(&destination.id));
    }
}
