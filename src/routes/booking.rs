use actix_web::{web, HttpResponse, Responder};
use bson::{doc, oid::ObjectId, DateTime};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::Client;
use std::sync::Arc;

use crate::db::mongo::{BOOKINGS_COLLECTION, CHARITIES_COLLECTION, DB_NAME};
use crate::models::booking::{BookingInput, PickupBooking, TipUpdateInput};
use crate::models::charity::Charity;
use crate::services::pricing_service::{days_in_advance, OrderModifiers, PricingEngine};

/// Create a booking. The price breakdown is recomputed server-side from the
/// submitted base cost and order parameters - client-side totals are never
/// trusted - and persisted as discrete columns on the booking record.
pub async fn create_booking(
    data: web::Data<Arc<Client>>,
    engine: web::Data<PricingEngine>,
    input: web::Json<BookingInput>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let (user_id,) = path.into_inner();
    let user_oid = match ObjectId::parse_str(&user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID format"),
    };

    let input = input.into_inner();
    let charity_oid = match ObjectId::parse_str(&input.charity_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid charity ID format"),
    };

    let client = data.into_inner();

    // Verify the charity exists and pick up its service-fee rate
    let charities: mongodb::Collection<Charity> =
        client.database(DB_NAME).collection(CHARITIES_COLLECTION);

    let charity = match charities.find_one(doc! { "_id": charity_oid }).await {
        Ok(Some(charity)) => charity,
        Ok(None) => return HttpResponse::NotFound().body("Charity not found"),
        Err(e) => {
            eprintln!("Error fetching charity: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to fetch charity");
        }
    };

    let days = days_in_advance(input.pickup_date, Utc::now().date_naive());
    let order = OrderModifiers {
        base_cost: input.base_cost,
        rush: input.rush,
        tip: input.tip,
        service_fee_pct: charity.service_fee_pct(),
        state: Some(input.state.clone()),
        bags: input.bags,
        boxes: input.boxes,
        days_in_advance: days,
    };

    let booking = if input.charity_subsidy_pct > 0.0 || input.company_subsidy_pct > 0.0 {
        let breakdown = engine.price_with_subsidies(
            &order,
            input.charity_subsidy_pct,
            input.company_subsidy_pct,
        );
        PickupBooking::from_subsidized_breakdown(
            user_oid,
            charity_oid,
            charity.service_fee_pct(),
            days,
            &input,
            &breakdown,
        )
    } else {
        let breakdown = engine.price(&order);
        PickupBooking::from_breakdown(
            user_oid,
            charity_oid,
            charity.service_fee_pct(),
            days,
            &input,
            &breakdown,
        )
    };

    let collection: mongodb::Collection<PickupBooking> =
        client.database(DB_NAME).collection(BOOKINGS_COLLECTION);

    match collection.insert_one(&booking).await {
        Ok(result) => {
            let booking_id = result
                .inserted_id
                .as_object_id()
                .map(|id| id.to_hex())
                .unwrap_or_default();
            HttpResponse::Ok().json(serde_json::json!({
                "booking_id": booking_id,
                "total_price": booking.total_price,
                "status": booking.status,
            }))
        }
        Err(e) => {
            eprintln!("Error creating booking: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to create booking")
        }
    }
}

pub async fn get_all_bookings(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let (user_id,) = path.into_inner();
    let user_oid = match ObjectId::parse_str(&user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID format"),
    };

    let client = data.into_inner();
    let collection: mongodb::Collection<PickupBooking> =
        client.database(DB_NAME).collection(BOOKINGS_COLLECTION);

    match collection.find(doc! { "user_id": user_oid }).await {
        Ok(cursor) => match cursor.try_collect::<Vec<PickupBooking>>().await {
            Ok(bookings) => HttpResponse::Ok().json(bookings),
            Err(e) => {
                eprintln!("Error retrieving bookings: {:?}", e);
                HttpResponse::InternalServerError().body("Failed to retrieve bookings")
            }
        },
        Err(e) => {
            eprintln!("Error fetching bookings: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch bookings")
        }
    }
}

pub async fn get_booking_by_id(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (user_id, booking_id) = path.into_inner();
    let filter = match booking_filter(&user_id, &booking_id) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    let client = data.into_inner();
    let collection: mongodb::Collection<PickupBooking> =
        client.database(DB_NAME).collection(BOOKINGS_COLLECTION);

    match collection.find_one(filter).await {
        Ok(Some(booking)) => HttpResponse::Ok().json(booking),
        Ok(None) => HttpResponse::NotFound().body("Booking not found"),
        Err(e) => {
            eprintln!("Error fetching booking: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to fetch booking")
        }
    }
}

/// Tip-only adjustment. The non-tip breakdown is regenerated from the stored
/// base cost and order columns, then the new tip is attached with its own
/// processor fee; every money column is rewritten from the result.
pub async fn update_tip(
    data: web::Data<Arc<Client>>,
    engine: web::Data<PricingEngine>,
    input: web::Json<TipUpdateInput>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (user_id, booking_id) = path.into_inner();
    let filter = match booking_filter(&user_id, &booking_id) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    let client = data.into_inner();
    let collection: mongodb::Collection<PickupBooking> =
        client.database(DB_NAME).collection(BOOKINGS_COLLECTION);

    let booking = match collection.find_one(filter.clone()).await {
        Ok(Some(booking)) => booking,
        Ok(None) => return HttpResponse::NotFound().body("Booking not found"),
        Err(e) => {
            eprintln!("Error fetching booking: {:?}", e);
            return HttpResponse::InternalServerError().body("Failed to fetch booking");
        }
    };

    if let Some(reason) = booking.tip_locked_reason() {
        return HttpResponse::Conflict().body(reason);
    }

    let order = OrderModifiers {
        base_cost: booking.base_cost,
        rush: booking.rush,
        tip: 0.0,
        service_fee_pct: booking.service_fee_pct,
        state: Some(booking.state.clone()),
        bags: booking.bags,
        boxes: booking.boxes,
        days_in_advance: booking.days_in_advance,
    };

    let update = if booking.subsidized {
        let mut order = order;
        order.tip = input.tip;
        let breakdown = engine.price_with_subsidies(
            &order,
            booking.charity_subsidy_pct,
            booking.company_subsidy_pct,
        );
        doc! {
            "$set": {
                "driver_tip": breakdown.driver_tip,
                "stripe_fee": breakdown.stripe_fee,
                "subtotal": breakdown.subtotal,
                "total_price": breakdown.total_price,
                "updated_at": DateTime::now(),
            }
        }
    } else {
        let breakdown = engine.apply_tip(&engine.price(&order), input.tip);
        doc! {
            "$set": {
                "driver_tip": breakdown.driver_tip,
                "stripe_fee": breakdown.stripe_fee,
                "subtotal": breakdown.subtotal,
                "total_price": breakdown.total_price,
                "updated_at": DateTime::now(),
            }
        }
    };

    match collection.update_one(filter, update).await {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("Booking not found");
            }
            HttpResponse::Ok().body("Booking tip updated")
        }
        Err(e) => {
            eprintln!("Error updating booking tip: {:?}", e);
            HttpResponse::InternalServerError().body("Failed to update booking")
        }
    }
}

pub(crate) fn booking_filter(
    user_id: &str,
    booking_id: &str,
) -> Result<bson::Document, HttpResponse> {
    let user_oid = ObjectId::parse_str(user_id)
        .map_err(|_| HttpResponse::BadRequest().body("Invalid user ID format"))?;
    let booking_oid = ObjectId::parse_str(booking_id)
        .map_err(|_| HttpResponse::BadRequest().body("Invalid booking ID format"))?;

    Ok(doc! { "_id": booking_oid, "user_id": user_oid })
}
