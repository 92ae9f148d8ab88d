use std::{env, sync::Arc};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use givelift_api::db;
use givelift_api::routes;
use givelift_api::services::pricing_service::{PricingConfig, PricingEngine};
use givelift_api::services::quote_service::QuoteService;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    let host = env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);

    let mongo_uri = env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;

    let stripe_key = env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
    let stripe_client = Arc::new(stripe::Client::new(stripe_key));

    // Rate table and quote strategy are fixed at startup and injected; no
    // call site ever branches on environment flags
    let pricing_engine = web::Data::new(PricingEngine::new(PricingConfig::default()));
    let quote_service =
        web::Data::new(QuoteService::from_env().expect("Failed to configure quote provider"));

    println!("Attempting to bind to {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(stripe_client.clone()))
            .app_data(pricing_engine.clone())
            .app_data(quote_service.clone())
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api")
                    .route("/quotes", web::post().to(routes::quote::get_quotes))
                    .service(
                        web::scope("/pricing")
                            .route("/preview", web::post().to(routes::pricing::preview))
                            .route("/subsidized", web::post().to(routes::pricing::subsidized)),
                    )
                    .service(
                        web::scope("/bookings/{user_id}")
                            .route("", web::post().to(routes::booking::create_booking))
                            .route("", web::get().to(routes::booking::get_all_bookings))
                            .route(
                                "/{booking_id}",
                                web::get().to(routes::booking::get_booking_by_id),
                            )
                            .route(
                                "/{booking_id}/tip",
                                web::put().to(routes::booking::update_tip),
                            )
                            .route(
                                "/{booking_id}/checkout",
                                web::post().to(routes::payment::checkout),
                            )
                            .route(
                                "/{booking_id}/confirm",
                                web::post().to(routes::payment::confirm_booking),
                            ),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
