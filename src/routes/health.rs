use actix_web::{web, HttpResponse, Responder};
use mongodb::{bson::doc, Client};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::db::mongo::DB_NAME;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(client: web::Data<Arc<Client>>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let mongo_result = check_mongodb(&client).await;
    health
        .services
        .insert("mongodb".to_string(), mongo_result.clone());

    let stripe_result = check_stripe_api();
    health
        .services
        .insert("stripe".to_string(), stripe_result.clone());

    let quote_result = check_quote_provider();
    health
        .services
        .insert("quote_provider".to_string(), quote_result.clone());

    if mongo_result.status != "ok"
        || stripe_result.status != "ok"
        || quote_result.status != "ok"
    {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(client: &web::Data<Arc<Client>>) -> ServiceStatus {
    match client.database(DB_NAME).run_command(doc! {"ping": 1}).await {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: Some("Connected successfully to MongoDB".to_string()),
        },
        Err(e) => {
            eprintln!("MongoDB health check failed: {}", e);

            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to connect: {}", e)),
            }
        }
    }
}

fn check_stripe_api() -> ServiceStatus {
    // Just validate key existence for basic check
    match env::var("STRIPE_SECRET_KEY") {
        Ok(key) => {
            let masked_key = if key.len() > 8 {
                format!("{}***{}", &key[0..4], &key[key.len() - 4..])
            } else {
                "***".to_string()
            };

            ServiceStatus {
                status: "ok".to_string(),
                details: Some(format!("Stripe API key configured ({})", masked_key)),
            }
        }
        Err(_) => ServiceStatus {
            status: "error".to_string(),
            details: Some("STRIPE_SECRET_KEY not configured".to_string()),
        },
    }
}

fn check_quote_provider() -> ServiceStatus {
    // Mock and manual modes have no external dependency to check; a live
    // mode needs its API URL configured
    let mode = env::var("QUOTE_MODE").unwrap_or_else(|_| "mock".to_string());

    let required_url = match mode.as_str() {
        "uber" => Some("UBER_DIRECT_API_URL"),
        "doordash" => Some("DOORDASH_DRIVE_API_URL"),
        "roadie" => Some("ROADIE_API_URL"),
        _ => None,
    };

    match required_url {
        None => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Quote mode '{}' needs no external provider", mode)),
        },
        Some(var) => match env::var(var) {
            Ok(url) => ServiceStatus {
                status: "ok".to_string(),
                details: Some(format!("Quote mode '{}' via {}", mode, url)),
            },
            Err(_) => ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("{} not configured for quote mode '{}'", var, mode)),
            },
        },
    }
}
