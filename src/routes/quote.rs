use actix_web::{web, HttpResponse, Responder};
use bson::doc;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::Client;
use std::sync::Arc;

use crate::db::mongo::{CHARITIES_COLLECTION, DB_NAME};
use crate::models::charity::Charity;
use crate::models::quote::{CharityQuote, QuoteRequest};
use crate::services::pricing_service::{days_in_advance, OrderModifiers, PricingEngine};
use crate::services::quote_service::{ItemCounts, QuoteService};

/// Quote every candidate charity in the pickup state and attach a preview
/// price breakdown to each, so the charity-selection step shows real totals.
pub async fn get_quotes(
    data: web::Data<Arc<Client>>,
    engine: web::Data<PricingEngine>,
    quote_service: web::Data<QuoteService>,
    input: web::Json<QuoteRequest>,
) -> impl Responder {
    let input = input.into_inner();
    let client = data.into_inner();

    let collection: mongodb::Collection<Charity> =
        client.database(DB_NAME).collection(CHARITIES_COLLECTION);

    let charities: Vec<Charity> = match collection
        .find(doc! { "state": &input.pickup.state })
        .await
    {
        Ok(cursor) => match cursor.try_collect().await {
            Ok(charities) => charities,
            Err(e) => {
                eprintln!("Error collecting charities: {:?}", e);
                return HttpResponse::InternalServerError().body("Failed to load charities");
            }
        },
        Err(e) => {
            eprintln!("Error querying charities: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to load charities");
        }
    };

    if charities.is_empty() {
        return HttpResponse::Ok().json(Vec::<CharityQuote>::new());
    }

    let destinations: Vec<_> = charities.iter().map(|c| c.dropoff_candidate()).collect();
    let items = ItemCounts {
        bags: input.bags,
        boxes: input.boxes,
    };

    let quotes = quote_service
        .quote_destinations(&input.pickup, &destinations, &items)
        .await;

    let days = input
        .pickup_date
        .map(|date| days_in_advance(date, Utc::now().date_naive()))
        .unwrap_or(0);

    let results: Vec<CharityQuote> = charities
        .iter()
        .filter_map(|charity| {
            let charity_id = charity.id.map(|id| id.to_hex())?;
            let quote = quotes.get(&charity_id)?.clone();
            let breakdown = engine.price(&OrderModifiers {
                base_cost: quote.price,
                rush: input.rush,
                tip: input.tip,
                service_fee_pct: charity.service_fee_pct(),
                state: Some(input.pickup.state.clone()),
                bags: input.bags,
                boxes: input.boxes,
                days_in_advance: days,
            });

            Some(CharityQuote {
                charity_id,
                name: charity.name.clone(),
                verified: charity.verified,
                quote,
                breakdown,
            })
        })
        .collect();

    HttpResponse::Ok().json(results)
}
