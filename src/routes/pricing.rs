use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::services::pricing_service::{OrderModifiers, PricingEngine};

#[derive(Debug, Deserialize)]
pub struct SubsidizedPricingInput {
    #[serde(flatten)]
    pub order: OrderModifiers,
    #[serde(default)]
    pub charity_subsidy_pct: f64,
    #[serde(default)]
    pub company_subsidy_pct: f64,
}

/// Price preview for the current wizard step. Pure computation, no storage.
pub async fn preview(
    engine: web::Data<PricingEngine>,
    input: web::Json<OrderModifiers>,
) -> impl Responder {
    HttpResponse::Ok().json(engine.price(&input))
}

/// Preview with charity/employer subsidies stacked in.
pub async fn subsidized(
    engine: web::Data<PricingEngine>,
    input: web::Json<SubsidizedPricingInput>,
) -> impl Responder {
    let input = input.into_inner();
    HttpResponse::Ok().json(engine.price_with_subsidies(
        &input.order,
        input.charity_subsidy_pct,
        input.company_subsidy_pct,
    ))
}
