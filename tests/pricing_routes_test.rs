use actix_web::{test, web, App};
use serde_json::json;

use givelift_api::routes;
use givelift_api::services::pricing_service::{PricingConfig, PricingEngine};

fn engine_data() -> web::Data<PricingEngine> {
    web::Data::new(PricingEngine::new(PricingConfig::default()))
}

fn close(value: f64, expected: f64) -> bool {
    (value - expected).abs() < 1e-9
}

#[actix_web::test]
async fn test_pricing_preview_returns_full_breakdown() {
    let app = test::init_service(
        App::new()
            .app_data(engine_data())
            .route("/pricing/preview", web::post().to(routes::pricing::preview)),
    )
    .await;

    // Reference order: base 20, 2 bags, 1 box, TX surcharge, 3 days out
    let req = test::TestRequest::post()
        .uri("/pricing/preview")
        .set_json(&json!({
            "base_cost": 20.0,
            "bags": 2,
            "boxes": 1,
            "state": "TX",
            "days_in_advance": 3
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(close(body["delivery_fee"].as_f64().unwrap(), 35.12), "{}", body);
    assert!(close(body["service_fee"].as_f64().unwrap(), 4.05), "{}", body);
    assert!(close(body["total_price"].as_f64().unwrap(), 40.65), "{}", body);
    assert!(close(body["driver_tip"].as_f64().unwrap(), 0.0), "{}", body);
}

#[actix_web::test]
async fn test_pricing_preview_defaults_missing_fields() {
    let app = test::init_service(
        App::new()
            .app_data(engine_data())
            .route("/pricing/preview", web::post().to(routes::pricing::preview)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/pricing/preview")
        .set_json(&json!({ "base_cost": 10.0 }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    // 10 + 7.50 markup, no surcharge, no bags/boxes
    assert!(close(body["delivery_fee"].as_f64().unwrap(), 17.5), "{}", body);
    assert!(close(body["rush_fee"].as_f64().unwrap(), 0.0), "{}", body);
}

#[actix_web::test]
async fn test_subsidized_pricing_covers_full_price() {
    let app = test::init_service(App::new().app_data(engine_data()).route(
        "/pricing/subsidized",
        web::post().to(routes::pricing::subsidized),
    ))
    .await;

    // 50% charity + 100% employer covers everything but the tip
    let req = test::TestRequest::post()
        .uri("/pricing/subsidized")
        .set_json(&json!({
            "base_cost": 20.0,
            "tip": 10.0,
            "charity_subsidy_pct": 50.0,
            "company_subsidy_pct": 100.0
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["subsidized"], json!(true));

    let original = body["original_price"].as_f64().unwrap();
    let subsidy_total = body["subsidy_total"].as_f64().unwrap();
    assert!(close(subsidy_total, original), "{}", body);

    // Tip grossed up on its own: (10 + 0.30) / 0.971, rounded
    let total = body["total_price"].as_f64().unwrap();
    assert!(close(total, 10.61), "{}", body);
    assert_eq!(body["driver_tip"].as_f64().unwrap(), 10.0);
}

#[actix_web::test]
async fn test_subsidized_pricing_without_subsidies_matches_plain_total() {
    let app = test::init_service(
        App::new()
            .app_data(engine_data())
            .route("/pricing/preview", web::post().to(routes::pricing::preview))
            .route(
                "/pricing/subsidized",
                web::post().to(routes::pricing::subsidized),
            ),
    )
    .await;

    let order = json!({ "base_cost": 35.0, "bags": 1, "days_in_advance": 7 });

    let req = test::TestRequest::post()
        .uri("/pricing/subsidized")
        .set_json(&order)
        .to_request();
    let subsidized: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;

    let req = test::TestRequest::post()
        .uri("/pricing/preview")
        .set_json(&order)
        .to_request();
    let plain: serde_json::Value = test::read_body_json(test::call_service(&app, req).await).await;

    assert_eq!(subsidized["subsidized"], json!(false));
    assert!(close(
        subsidized["delivery_fee"].as_f64().unwrap(),
        plain["delivery_fee"].as_f64().unwrap()
    ));
    assert!(close(
        subsidized["service_fee"].as_f64().unwrap(),
        plain["service_fee"].as_f64().unwrap()
    ));
}
