use actix_web::{web, HttpResponse, Responder};
use bson::DateTime;
use mongodb::Client;
use std::{str::FromStr, sync::Arc};
use stripe::CapturePaymentIntent;

use crate::db::mongo::{BOOKINGS_COLLECTION, DB_NAME};
use crate::models::booking::PickupBooking;
use crate::routes::booking::booking_filter;

/// Create a manual-capture payment intent for a booking. The payment step
/// only ever sees the persisted total in minor currency units.
pub async fn checkout(
    mongodb_data: web::Data<Arc<Client>>,
    stripe_data: web::Data<Arc<stripe::Client>>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (user_id, booking_id) = path.into_inner();
    let filter = match booking_filter(&user_id, &booking_id) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    let client = mongodb_data.into_inner();
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

    if booking.status == "confirmed" {
        return HttpResponse::Conflict().body("Booking is already paid");
    }

    let amount = booking.total_price_cents();
    println!("Creating payment intent for booking {} ({} cents)", booking_id, amount);

    let mut create_intent = stripe::CreatePaymentIntent::new(amount, stripe::Currency::USD);
    // Manual, as we capture once the pickup is confirmed
    create_intent.capture_method = Some(stripe::PaymentIntentCaptureMethod::Manual);

    if let Some(customer_id) = &booking.customer_id {
        match stripe::CustomerId::from_str(customer_id) {
            Ok(id) => create_intent.customer = Some(id),
            Err(_) => return HttpResponse::BadRequest().body("Invalid customer ID on booking"),
        }
    }

    match stripe::PaymentIntent::create(stripe_data.as_ref(), create_intent).await {
        Ok(intent) => {
            let update = doc_set_intent(&intent.id.to_string());
            if let Err(e) = collection.update_one(filter, update).await {
                eprintln!("Failed to store payment intent on booking: {:?}", e);
            }
            HttpResponse::Ok().json(intent)
        }
        Err(e) => {
            eprintln!("Error creating payment intent: {:?}", e);
            HttpResponse::InternalServerError()
                .body(format!("Failed to create payment intent: {}", e))
        }
    }
}

/// Capture the booking's payment intent and flip the booking status based on
/// the capture result.
pub async fn confirm_booking(
    mongodb_data: web::Data<Arc<Client>>,
    stripe_data: web::Data<Arc<stripe::Client>>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (user_id, booking_id) = path.into_inner();
    let filter = match booking_filter(&user_id, &booking_id) {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    let client = mongodb_data.into_inner();
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

    let payment_intent_id = match &booking.payment_intent_id {
        Some(id) => id.clone(),
        None => return HttpResponse::BadRequest().body("Booking has no payment intent"),
    };

    // First retrieve the payment intent to check its status
    let intent_id = match stripe::PaymentIntentId::from_str(&payment_intent_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid payment intent ID on booking"),
    };

    match stripe::PaymentIntent::retrieve(stripe_data.as_ref(), &intent_id, &[]).await {
        Ok(intent) => {
            if intent.status != stripe::PaymentIntentStatus::RequiresCapture {
                return HttpResponse::BadRequest().body(format!(
                    "Payment intent is not in a capturable state. Current status: {:?}",
                    intent.status
                ));
            }
        }
        Err(e) => {
            eprintln!("Error retrieving payment intent: {:?}", e);
            return HttpResponse::InternalServerError()
                .body(format!("Failed to retrieve payment intent: {}", e));
        }
    }

    println!("Capturing payment intent: {}", payment_intent_id);
    match stripe::PaymentIntent::capture(
        stripe_data.as_ref(),
        &payment_intent_id,
        CapturePaymentIntent::default(),
    )
    .await
    {
        Ok(captured_intent) => {
            let status = if captured_intent.status.to_string() == "succeeded" {
                "confirmed"
            } else {
                "pending_payment"
            };

            let update = bson::doc! {
                "$set": { "status": status, "updated_at": DateTime::now() }
            };

            match collection.update_one(filter, update).await {
                Ok(_) => HttpResponse::Ok().json(serde_json::json!({
                    "success": true,
                    "booking_id": booking_id,
                    "status": status,
                })),
                Err(e) => {
                    eprintln!("Error updating booking status: {:?}", e);
                    // Payment was captured but the status write failed
                    HttpResponse::Ok().json(serde_json::json!({
                        "success": true,
                        "warning": "Payment captured, but failed to update booking status",
                        "booking_id": booking_id,
                    }))
                }
            }
        }
        Err(e) => {
            eprintln!("Error capturing payment: {:?}", e);
            let update = bson::doc! {
                "$set": { "status": "payment_failed", "updated_at": DateTime::now() }
            };
            let _ = collection.update_one(filter, update).await;

            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "booking_id": booking_id,
                "error": format!("Payment capture failed: {}", e),
            }))
        }
    }
}

fn doc_set_intent(payment_intent_id: &str) -> bson::Document {
    bson::doc! {
        "$set": {
            "payment_intent_id": payment_intent_id,
            "updated_at": DateTime::now(),
        }
    }
}
